use std::fmt;

/// Modifier state selected by holding the MODE button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Neutral,
    Mode,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Neutral => "neutral",
            Mode::Mode => "mode",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A physical control event as delivered by the signal feed, e.g. `rotary left`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    tokens: Vec<String>,
}

impl Event {
    /// Tokenize a feed message. Empty input yields an event with no tokens.
    pub fn parse(message: &str) -> Self {
        let tokens = message
            .trim()
            .to_lowercase()
            .split_whitespace()
            .map(str::to_owned)
            .collect();
        Self { tokens }
    }

    pub fn first(&self) -> Option<&str> {
        self.tokens.first().map(String::as_str)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

/// Lookup key into the binding table: `<mode>_<token>_<token>...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey(String);

impl ActionKey {
    pub fn new(mode: Mode, event: &Event) -> Self {
        Self(format!("{}_{}", mode.as_str(), event.tokens.join("_")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ActionKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_whitespace_and_lowercases() {
        let event = Event::parse("  Rotary\tLEFT \n");
        assert_eq!(event.to_string(), "rotary left");
        assert_eq!(event.first(), Some("rotary"));
    }

    #[test]
    fn parse_empty_message_yields_no_tokens() {
        assert_eq!(Event::parse("").first(), None);
        assert_eq!(Event::parse("   ").first(), None);
        assert_eq!(Event::parse(" \t\n").to_string(), "");
    }

    #[test]
    fn key_prefixes_mode_and_joins_with_underscores() {
        let event = Event::parse("rotary left");
        assert_eq!(ActionKey::new(Mode::Neutral, &event).as_str(), "neutral_rotary_left");
        assert_eq!(ActionKey::new(Mode::Mode, &event).as_str(), "mode_rotary_left");
    }

    #[test]
    fn underscored_and_spaced_tokens_share_a_key() {
        let spaced = ActionKey::new(Mode::Neutral, &Event::parse("volume down press"));
        let underscored = ActionKey::new(Mode::Neutral, &Event::parse("volume_down press"));
        assert_eq!(spaced, underscored);
    }

    #[test]
    fn empty_event_key_is_just_the_mode() {
        let key = ActionKey::new(Mode::Neutral, &Event::parse(""));
        assert_eq!(key.as_str(), "neutral_");
    }

    #[test]
    fn default_mode_is_neutral() {
        assert_eq!(Mode::default(), Mode::Neutral);
    }
}
