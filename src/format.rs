//! Lore wrapping with formatting-code carry-over.
//!
//! Lengths are counted in Unicode scalar values, never bytes, so `§` codes
//! and non-ASCII text wrap the same way the client renders them.

/// The formatting-code prefix character.
pub const FORMAT_CHAR: char = '§';

fn is_format_code(c: char) -> bool {
    matches!(c.to_ascii_lowercase(), '0'..='9' | 'a'..='f' | 'k'..='o' | 'r')
}

/// Return the last `§x` code in `s`, if any.
pub fn last_format_code(s: &str) -> Option<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut last = None;
    for i in 0..chars.len().saturating_sub(1) {
        if chars[i] == FORMAT_CHAR && is_format_code(chars[i + 1]) {
            last = Some(format!("{}{}", FORMAT_CHAR, chars[i + 1]));
        }
    }
    last
}

/// Remove every `§x` code from `s`.
pub fn strip_format_codes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == FORMAT_CHAR {
            if let Some(&next) = chars.peek() {
                if is_format_code(next) {
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Wrap `text` to at most `max_len` characters per line, breaking on spaces.
///
/// The last formatting code seen is re-applied at the start of every wrapped
/// line. A word longer than `max_len` is hard-split with a trailing `-` when
/// `force_break` is set, otherwise it starts its own (overlong) line.
pub fn wrap_text(text: &str, max_len: usize, force_break: bool) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let max_len = max_len.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut color = String::new();

    for word in text.split(' ') {
        if let Some(code) = last_format_code(word) {
            color = code;
        }
        let word_len = char_len(word);
        let candidate = if current.is_empty() {
            word_len
        } else {
            char_len(&current) + 1 + word_len
        };

        if candidate <= max_len {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        if word_len > max_len && force_break {
            let chunk_len = max_len.saturating_sub(1 + char_len(&color)).max(1);
            let chars: Vec<char> = word.chars().collect();
            let chunks: Vec<String> = chars
                .chunks(chunk_len)
                .map(|c| c.iter().collect())
                .collect();
            let (last, head) = match chunks.split_last() {
                Some(split) => split,
                None => continue,
            };
            for chunk in head {
                lines.push(format!("{}{}-", color, chunk));
            }
            current = format!("{}{}", color, last);
        } else {
            current = format!("{}{}", color, word);
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wraps menu lore lines using the configured width and default colour.
#[derive(Debug, Clone)]
pub struct TextFormatter {
    pub max_line_length: usize,
    pub force_word_break: bool,
    pub default_color: String,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            max_line_length: 30,
            force_word_break: true,
            default_color: "§7".to_string(),
        }
    }
}

impl TextFormatter {
    pub fn new(max_line_length: usize, force_word_break: bool, default_color: impl Into<String>) -> Self {
        Self {
            max_line_length,
            force_word_break,
            default_color: default_color.into(),
        }
    }

    pub fn wrap(&self, text: &str) -> Vec<String> {
        wrap_text(text, self.max_line_length, self.force_word_break)
    }

    /// Format a list of lore lines.
    ///
    /// Blank lines are preserved as empty strings. Each other line is stripped
    /// of its codes, wrapped, and every resulting segment is prefixed with the
    /// line's last code (or the default colour).
    pub fn format_lines(&self, lines: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                out.push(String::new());
                continue;
            }
            let color = last_format_code(line).unwrap_or_else(|| self.default_color.clone());
            let clean = strip_format_codes(line);
            for segment in self.wrap(&clean) {
                out.push(format!("{}{}", color, segment));
            }
        }
        out
    }
}
