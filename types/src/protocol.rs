//! Realtime message protocol.
//!
//! Every frame is a JSON object of the form `{"event": "<kind>", "data": {...}}`.
//! [Inbound] is the closed set of pushes a client handles and [Outbound] the
//! requests it may send.

use crate::game::{Bet, GameType, Number, RoundCode};
use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Round-scoped payload carried by `round_data`, `new_round` and `bet_placed`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    #[serde(default, alias = "round_number", skip_serializing_if = "Option::is_none")]
    pub round_code: Option<RoundCode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub players: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bets: Vec<Bet>,
}

/// Messages pushed by the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Inbound {
    RoundData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_type: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        round_data: RoundData,
    },
    NewRound {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_type: Option<String>,
        round_code: RoundCode,
        #[serde(default, deserialize_with = "null_as_default")]
        round_data: RoundData,
    },
    BetPlaced {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round_data: Option<RoundData>,
    },
    BetSuccess {
        new_balance: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    BetError {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    RoundResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_type: Option<String>,
        result: Number,
    },
    TimerUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_type: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        time_remaining: u32,
        #[serde(default, deserialize_with = "null_as_default")]
        players: u32,
    },
    BettingClosed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_type: Option<String>,
    },
}

impl Inbound {
    /// Wire name of the message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::RoundData { .. } => "round_data",
            Inbound::NewRound { .. } => "new_round",
            Inbound::BetPlaced { .. } => "bet_placed",
            Inbound::BetSuccess { .. } => "bet_success",
            Inbound::BetError { .. } => "bet_error",
            Inbound::RoundResult { .. } => "round_result",
            Inbound::TimerUpdate { .. } => "timer_update",
            Inbound::BettingClosed { .. } => "betting_closed",
        }
    }

    /// The `game_type` tag of a broadcast. Direct replies carry none.
    pub fn game_type(&self) -> Option<&str> {
        match self {
            Inbound::RoundData { game_type, .. }
            | Inbound::NewRound { game_type, .. }
            | Inbound::BetPlaced { game_type, .. }
            | Inbound::RoundResult { game_type, .. }
            | Inbound::TimerUpdate { game_type, .. }
            | Inbound::BettingClosed { game_type } => game_type.as_deref(),
            Inbound::BetSuccess { .. } | Inbound::BetError { .. } => None,
        }
    }
}

/// Requests sent by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Outbound {
    JoinGame {
        game_type: GameType,
        user_id: String,
    },
    PlaceBet {
        game_type: GameType,
        user_id: String,
        username: String,
        number: Number,
    },
}

impl Outbound {
    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::JoinGame { .. } => "join_game",
            Outbound::PlaceBet { .. } => "place_bet",
        }
    }
}
