//! Parsing of `[tag] argument <delay=N> <chance=P>` action lines.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::requirement::parse_numeric;

fn line_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[(?P<tag>[^\]]+)\]\s*(?P<arg>.*)$").expect("action line regex must compile")
    })
}

fn modifier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"<([a-zA-Z_]+)\s*=\s*([^>]+)>").expect("modifier regex must compile")
    })
}

/// The closed verb vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionTag {
    Close,
    OpenGui,
    Message,
    Broadcast,
    Chat,
    Console,
    Player,
    GivePermission,
    TakePermission,
    GiveMoney,
    TakeMoney,
    GiveExp,
    TakeExp,
    Sound,
    BroadcastSound,
    BroadcastSoundWorld,
    Refresh,
    /// Anything else, lowercased.
    Unknown(String),
}

impl ActionTag {
    pub fn parse(raw: &str) -> Self {
        let tag = raw.trim().to_lowercase();
        match tag.as_str() {
            "close" => ActionTag::Close,
            "opengui" => ActionTag::OpenGui,
            "message" => ActionTag::Message,
            "broadcast" => ActionTag::Broadcast,
            "chat" => ActionTag::Chat,
            "console" => ActionTag::Console,
            "player" => ActionTag::Player,
            "givepermission" => ActionTag::GivePermission,
            "takepermission" => ActionTag::TakePermission,
            "givemoney" => ActionTag::GiveMoney,
            "takemoney" => ActionTag::TakeMoney,
            "giveexp" => ActionTag::GiveExp,
            "takeexp" => ActionTag::TakeExp,
            "sound" => ActionTag::Sound,
            "broadcastsound" => ActionTag::BroadcastSound,
            "broadcastsoundworld" => ActionTag::BroadcastSoundWorld,
            "refresh" => ActionTag::Refresh,
            _ => ActionTag::Unknown(tag),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionTag::Close => "close",
            ActionTag::OpenGui => "opengui",
            ActionTag::Message => "message",
            ActionTag::Broadcast => "broadcast",
            ActionTag::Chat => "chat",
            ActionTag::Console => "console",
            ActionTag::Player => "player",
            ActionTag::GivePermission => "givepermission",
            ActionTag::TakePermission => "takepermission",
            ActionTag::GiveMoney => "givemoney",
            ActionTag::TakeMoney => "takemoney",
            ActionTag::GiveExp => "giveexp",
            ActionTag::TakeExp => "takeexp",
            ActionTag::Sound => "sound",
            ActionTag::BroadcastSound => "broadcastsound",
            ActionTag::BroadcastSoundWorld => "broadcastsoundworld",
            ActionTag::Refresh => "refresh",
            ActionTag::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.as_str())
    }
}

/// One parsed action line, before placeholder resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionLine {
    pub tag: ActionTag,
    /// Argument with modifier tokens removed.
    pub argument: String,
    pub delay_ticks: u64,
    /// Execution probability in percent, clamped to 0..=100.
    pub chance: f64,
}

impl ActionLine {
    /// Parse a line. Returns `None` for blank lines and lines without a `[tag]`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let caps = line_pattern().captures(line)?;
        let tag = ActionTag::parse(caps.name("tag").map_or("", |m| m.as_str()));
        let raw_arg = caps.name("arg").map_or("", |m| m.as_str()).trim();

        let mut delay_ticks = 0u64;
        let mut chance = 100.0f64;
        let mut argument = String::with_capacity(raw_arg.len());
        let mut last = 0;
        for caps in modifier_pattern().captures_iter(raw_arg) {
            let Some(whole) = caps.get(0) else { continue };
            let key = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
            let value = caps.get(2).map_or("", |m| m.as_str()).trim();
            match key.as_str() {
                "delay" => {
                    if let Some(v) = parse_numeric(value) {
                        delay_ticks = v.trunc().max(0.0) as u64;
                    }
                }
                "chance" => {
                    if let Some(v) = parse_numeric(value) {
                        chance = v.clamp(0.0, 100.0);
                    }
                }
                _ => {}
            }
            // Drop the token; a token between two spaces leaves a single space.
            let before = &raw_arg[last..whole.start()];
            argument.push_str(before);
            last = whole.end();
            let after = &raw_arg[last..];
            let left_ws = argument.is_empty() || argument.ends_with(char::is_whitespace);
            if left_ws && after.starts_with(char::is_whitespace) {
                last += after.len() - after.trim_start().len();
            }
        }
        argument.push_str(&raw_arg[last..]);

        Some(ActionLine {
            tag,
            argument: argument.trim().to_string(),
            delay_ticks,
            chance,
        })
    }
}

/// Experience amount for `giveexp` / `takeexp`: a trailing `l` means levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpAmount {
    Levels(i64),
    Points(i64),
}

impl ExpAmount {
    pub fn parse(arg: &str) -> Option<Self> {
        let arg = arg.trim();
        let (raw, levels) = match arg.strip_suffix(|c: char| c == 'l' || c == 'L') {
            Some(rest) => (rest, true),
            None => (arg, false),
        };
        let amount = parse_numeric(raw)?.trunc() as i64;
        Some(if levels {
            ExpAmount::Levels(amount)
        } else {
            ExpAmount::Points(amount)
        })
    }
}

/// `<id> [volume] [pitch]`; non-numeric volume/pitch fall back to 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct SoundArgs {
    pub id: String,
    pub volume: f32,
    pub pitch: f32,
}

impl SoundArgs {
    pub fn parse(arg: &str) -> Option<Self> {
        let mut parts = arg.split_whitespace();
        let id = parts.next()?.to_string();
        let mut number = || {
            parts
                .next()
                .and_then(parse_numeric)
                .map(|v| v as f32)
                .unwrap_or(1.0)
        };
        let volume = number();
        let pitch = number();
        Some(SoundArgs { id, volume, pitch })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modifiers_anywhere() {
        let line = ActionLine::parse("[message]<delay=20> Hello <chance=50>world").unwrap();
        assert_eq!(line.tag, ActionTag::Message);
        assert_eq!(line.delay_ticks, 20);
        assert_eq!(line.chance, 50.0);
        assert_eq!(line.argument, "Hello world");
    }

    #[test]
    fn token_between_words_collapses_spaces() {
        let line = ActionLine::parse("[message] Hello <chance=50> world").unwrap();
        assert_eq!(line.argument, "Hello world");
        let line = ActionLine::parse("[Console] say hi <DELAY = 5>").unwrap();
        assert_eq!(line.tag, ActionTag::Console);
        assert_eq!(line.delay_ticks, 5);
        assert_eq!(line.argument, "say hi");
    }

    #[test]
    fn clamps_and_ignores_bad_modifiers() {
        let line = ActionLine::parse("[close] <chance=250><delay=-4>").unwrap();
        assert_eq!(line.chance, 100.0);
        assert_eq!(line.delay_ticks, 0);
        assert_eq!(line.argument, "");
        let line = ActionLine::parse("[message] x <chance=often> <color=red>").unwrap();
        assert_eq!(line.chance, 100.0);
        assert_eq!(line.argument, "x");
    }

    #[test]
    fn rejects_untagged_and_blank_lines() {
        assert!(ActionLine::parse("   ").is_none());
        assert!(ActionLine::parse("message hello").is_none());
        assert_eq!(
            ActionLine::parse("[dance] now").map(|l| l.tag),
            Some(ActionTag::Unknown("dance".to_string()))
        );
    }

    #[test]
    fn exp_amounts() {
        assert_eq!(ExpAmount::parse("5l"), Some(ExpAmount::Levels(5)));
        assert_eq!(ExpAmount::parse("5L"), Some(ExpAmount::Levels(5)));
        assert_eq!(ExpAmount::parse("100"), Some(ExpAmount::Points(100)));
        assert_eq!(ExpAmount::parse("lots"), None);
    }

    #[test]
    fn sound_defaults() {
        let s = SoundArgs::parse("random.pop").unwrap();
        assert_eq!((s.volume, s.pitch), (1.0, 1.0));
        let s = SoundArgs::parse("note.harp 0.5 x").unwrap();
        assert_eq!((s.id.as_str(), s.volume, s.pitch), ("note.harp", 0.5, 1.0));
        assert!(SoundArgs::parse("  ").is_none());
    }
}
