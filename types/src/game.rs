use crate::constants::NUMBER_MAX;
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Game variant. Each variant has a fixed bet amount and payout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Silver,
    Gold,
    Diamond,
    Platinum,
    Roulette,
}

impl GameType {
    pub const ALL: [GameType; 5] = [
        GameType::Silver,
        GameType::Gold,
        GameType::Diamond,
        GameType::Platinum,
        GameType::Roulette,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Silver => "silver",
            GameType::Gold => "gold",
            GameType::Diamond => "diamond",
            GameType::Platinum => "platinum",
            GameType::Roulette => "roulette",
        }
    }

    /// Fixed wager for a single bet.
    pub fn bet_amount(&self) -> i64 {
        match self {
            GameType::Silver => 200,
            GameType::Gold => 250,
            GameType::Diamond => 100,
            GameType::Platinum => 1_000,
            GameType::Roulette => 200,
        }
    }

    /// Amount credited by the server for a winning bet.
    pub fn payout(&self) -> i64 {
        match self {
            GameType::Silver => 1_000,
            GameType::Gold => 1_250,
            GameType::Diamond => 500,
            GameType::Platinum => 5_000,
            GameType::Roulette => 2_000,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            GameType::Silver => "Frog Leap",
            GameType::Gold => "Football Goal",
            GameType::Diamond => "Archer Hit",
            GameType::Platinum => "Parachute Drop",
            GameType::Roulette => "Roulette Spin",
        }
    }

    /// Whether a `game_type` tag carried by a broadcast addresses this variant.
    ///
    /// Untagged messages are addressed to everyone.
    pub fn accepts(&self, tag: Option<&str>) -> bool {
        tag.map_or(true, |tag| tag == self.as_str())
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown game type: {0}")]
pub struct UnknownGameType(pub String);

impl FromStr for GameType {
    type Err = UnknownGameType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        GameType::ALL
            .into_iter()
            .find(|game| game.as_str() == normalized)
            .ok_or_else(|| UnknownGameType(s.to_string()))
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("number {0} is out of range (0..={max})", max = NUMBER_MAX)]
pub struct NumberOutOfRange(pub i64);

/// A number on the board, always within `0..=NUMBER_MAX`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Number(u8);

impl Number {
    pub const MIN: Number = Number(0);
    pub const MAX: Number = Number(NUMBER_MAX);

    pub fn new(value: i64) -> Result<Self, NumberOutOfRange> {
        if (0..=NUMBER_MAX as i64).contains(&value) {
            Ok(Number(value as u8))
        } else {
            Err(NumberOutOfRange(value))
        }
    }

    /// Saturate an arbitrary input into the valid range.
    pub fn clamped(value: i64) -> Self {
        Number(value.clamp(0, NUMBER_MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Number {
    type Error = NumberOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Number::new(value)
    }
}

impl From<Number> for u8 {
    fn from(number: Number) -> Self {
        number.0
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Server-issued round identifier.
///
/// Some pushes carry a textual round code, others an integer round number; both
/// normalize to the same textual form.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RoundCode(String);

impl RoundCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoundCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for RoundCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(code) => RoundCode(code),
            Raw::Number(number) => RoundCode(number.to_string()),
        })
    }
}

/// A bet as reported by the server. Immutable once placed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bet {
    pub user_id: String,
    pub number: Number,
    #[serde(default)]
    pub username: String,
}

impl Bet {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, number: Number) -> Self {
        Self {
            user_id: user_id.into(),
            number,
            username: username.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_type_from_str() {
        for game in GameType::ALL {
            assert_eq!(game.as_str().parse::<GameType>().unwrap(), game);
        }
        assert_eq!(" Platinum ".parse::<GameType>().unwrap(), GameType::Platinum);
        let err = "bronze".parse::<GameType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown game type: bronze");
    }

    #[test]
    fn test_game_type_accepts_tag() {
        let game = GameType::Platinum;
        assert!(game.accepts(None));
        assert!(game.accepts(Some("platinum")));
        assert!(!game.accepts(Some("gold")));
    }

    #[test]
    fn test_bet_amounts() {
        assert_eq!(GameType::Platinum.bet_amount(), 1_000);
        assert_eq!(GameType::Platinum.payout(), 5_000);
        assert_eq!(GameType::Diamond.bet_amount(), 100);
    }

    #[test]
    fn test_number_bounds() {
        assert_eq!(Number::new(0).unwrap(), Number::MIN);
        assert_eq!(Number::new(36).unwrap(), Number::MAX);
        assert_eq!(Number::new(37), Err(NumberOutOfRange(37)));
        assert_eq!(Number::new(-1), Err(NumberOutOfRange(-1)));
        assert_eq!(Number::clamped(99), Number::MAX);
        assert_eq!(Number::clamped(-4), Number::MIN);
        assert_eq!(Number::clamped(17).get(), 17);
    }

    #[test]
    fn test_number_serde_rejects_out_of_range() {
        let number: Number = serde_json::from_str("12").unwrap();
        assert_eq!(number.get(), 12);
        assert_eq!(serde_json::to_string(&number).unwrap(), "12");
        assert!(serde_json::from_str::<Number>("37").is_err());
        assert!(serde_json::from_str::<Number>("-3").is_err());
    }

    #[test]
    fn test_round_code_accepts_text_and_integer() {
        let code: RoundCode = serde_json::from_str("\"P17300000001\"").unwrap();
        assert_eq!(code.as_str(), "P17300000001");
        let code: RoundCode = serde_json::from_str("42").unwrap();
        assert_eq!(code, RoundCode::new("42"));
    }

    #[test]
    fn test_bet_username_defaults() {
        let bet: Bet = serde_json::from_str(r#"{"user_id":"A","number":5}"#).unwrap();
        assert_eq!(bet, Bet::new("A", "", Number::new(5).unwrap()));
    }
}
