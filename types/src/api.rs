//! HTTP request and response bodies.

use crate::game::{Bet, Number, RoundCode};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub user_id: String,
    pub username: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub balance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    #[serde(default)]
    pub balance: Option<i64>,
}

/// One table as listed by `GET /api/tables/{game}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    #[serde(default)]
    pub table_number: u32,
    pub round_code: RoundCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    #[serde(default)]
    pub players: u32,
    #[serde(default)]
    pub max_players: u32,
    #[serde(default)]
    pub slots_available: u32,
    #[serde(default)]
    pub time_remaining: u32,
    #[serde(default)]
    pub is_betting_closed: bool,
    #[serde(default)]
    pub is_finished: bool,
    #[serde(default)]
    pub is_started: bool,
    #[serde(default)]
    pub bets: Vec<Bet>,
    #[serde(default)]
    pub result: Option<Number>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablesResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_type: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,
}

impl TablesResponse {
    pub fn find(&self, round_code: &RoundCode) -> Option<&TableSnapshot> {
        self.tables.iter().find(|table| &table.round_code == round_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_tables_response() {
        let body = json!({
            "game_type": "platinum",
            "tables": [
                {
                    "table_number": 1,
                    "round_code": "P1001",
                    "game_type": "platinum",
                    "players": 2,
                    "max_players": 6,
                    "slots_available": 4,
                    "time_remaining": 125,
                    "is_betting_closed": false,
                    "is_finished": false,
                    "is_started": true,
                    "bets": [
                        {"user_id": "A", "username": "alice", "number": 3, "bet_amount": 1000}
                    ],
                    "result": null
                },
                {"round_code": "P1002", "is_finished": true, "result": 4}
            ]
        });
        let response: TablesResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.tables.len(), 2);

        let first = response.find(&RoundCode::new("P1001")).unwrap();
        assert_eq!(first.time_remaining, 125);
        assert_eq!(first.bets[0].username, "alice");
        assert!(first.result.is_none());

        let second = response.find(&RoundCode::new("P1002")).unwrap();
        assert_eq!(second.result, Some(Number::new(4).unwrap()));
        assert!(second.bets.is_empty());

        assert!(response.find(&RoundCode::new("P9999")).is_none());
    }

    #[test]
    fn test_decode_register_response() {
        let response: RegisterResponse =
            serde_json::from_value(json!({"success": true, "balance": 10000})).unwrap();
        assert!(response.success);
        assert_eq!(response.balance, Some(10_000));

        let response: RegisterResponse =
            serde_json::from_value(json!({"success": false, "message": "nope"})).unwrap();
        assert!(!response.success);
        assert!(response.balance.is_none());
    }
}
