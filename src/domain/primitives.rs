//! Domain primitives: ChatId, SignalId.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Telegram chat id, the stable key of an investor record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl ChatId {
    pub fn new(id: i64) -> Self {
        ChatId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChatId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(ChatId)
    }
}

/// Identifier the trading system assigns to one position (open..close).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SignalId(pub String);

impl SignalId {
    pub fn new(id: impl Into<String>) -> Self {
        SignalId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SignalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_id_parse() {
        assert_eq!(" -100123 ".parse::<ChatId>().unwrap(), ChatId::new(-100123));
        assert!("abc".parse::<ChatId>().is_err());
    }

    #[test]
    fn test_chat_id_display() {
        assert_eq!(ChatId::new(42).to_string(), "42");
    }

    #[test]
    fn test_signal_id_display() {
        let sid = SignalId::new("S1");
        assert_eq!(sid.to_string(), "S1");
        assert_eq!(sid.as_str(), "S1");
    }
}
