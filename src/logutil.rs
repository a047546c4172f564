//! Single-line rendering of menu text for log records and console output.
//!
//! Menu files are user content: names, lore and action arguments can carry
//! newlines or control bytes that would split a log record. [`escape_log`]
//! wraps such text in a `Display` adapter that escapes while formatting.

use std::fmt::{self, Write};

use crate::format::strip_format_codes;

/// Characters written before the text is cut with `…`.
const MAX_LOGGED_CHARS: usize = 160;

/// Borrowed text that formats escaped and truncated.
#[derive(Debug, Clone, Copy)]
pub struct LogText<'a>(&'a str);

impl fmt::Display for LogText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (written, ch) in self.0.chars().enumerate() {
            if written == MAX_LOGGED_CHARS {
                return f.write_char('…');
            }
            match ch {
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                c if c.is_control() => write!(f, "\\u{{{:x}}}", c as u32)?,
                c => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

/// Escape `s` for a single log line, e.g. `debug!("item '{}'", escape_log(key))`.
pub fn escape_log(s: &str) -> LogText<'_> {
    LogText(s)
}

/// Drop `§x` formatting codes and escape what remains.
pub fn strip_formatting(s: &str) -> String {
    escape_log(&strip_format_codes(s)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_line_breaks_and_control_bytes() {
        assert_eq!(escape_log("Line1\nLine2\r\tEnd").to_string(), "Line1\\nLine2\\r\\tEnd");
        assert_eq!(escape_log("a\\b\u{7}").to_string(), "a\\\\b\\u{7}");
    }

    #[test]
    fn long_text_is_cut() {
        let long = "x".repeat(500);
        let esc = escape_log(&long).to_string();
        assert!(esc.ends_with('…'));
        assert_eq!(esc.chars().count(), MAX_LOGGED_CHARS + 1);
        assert_eq!(escape_log(&"y".repeat(MAX_LOGGED_CHARS)).to_string().chars().count(), MAX_LOGGED_CHARS);
    }

    #[test]
    fn strips_color_codes() {
        assert_eq!(strip_formatting("§cGUI §lShop\n"), "GUI Shop\\n");
    }
}
