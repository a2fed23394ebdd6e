use paradrop_types::GameType;
use std::{path::PathBuf, time::Duration};
use tracing::warn;

/// Durations of the resolution sequence and wallet highlight, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationConfig {
    /// Delay between the result arriving and the descent starting.
    pub result_lead_ms: u64,
    /// Time from the start of the descent to touchdown on the winning slot.
    pub fall_ms: u64,
    /// Time the touchdown splash stays up.
    pub settle_ms: u64,
    pub wallet_bounce_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            result_lead_ms: 150,
            fall_ms: 2_100,
            settle_ms: 100,
            wallet_bounce_ms: 500,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// HTTP base URL of the game server. The realtime channel lives at `{base}/ws`.
    pub base_url: String,
    pub game: GameType,
    /// Round code of the table to follow. Without one, every round of `game` is shown.
    pub table_code: Option<String>,
    /// Overrides the variant's fixed bet amount.
    pub bet_amount: Option<i64>,
    pub poll_interval: Duration,
    pub dial_timeout: Duration,
    pub reconnect_initial: Duration,
    pub reconnect_max: Duration,
    pub identity_path: Option<PathBuf>,
    pub animation: AnimationConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:10000".to_string(),
            game: GameType::Platinum,
            table_code: None,
            bet_amount: None,
            poll_interval: Duration::from_millis(2_000),
            dial_timeout: Duration::from_millis(5_000),
            reconnect_initial: Duration::from_millis(500),
            reconnect_max: Duration::from_millis(10_000),
            identity_path: None,
            animation: AnimationConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let game = match std::env::var("PARADROP_GAME") {
            Ok(raw) => raw.parse().unwrap_or_else(|err| {
                warn!(%err, "ignoring PARADROP_GAME");
                defaults.game
            }),
            Err(_) => defaults.game,
        };
        Self {
            base_url: std::env::var("PARADROP_URL").unwrap_or(defaults.base_url),
            game,
            table_code: read_string("PARADROP_TABLE"),
            bet_amount: std::env::var("PARADROP_BET_AMOUNT")
                .ok()
                .and_then(|raw| raw.parse::<i64>().ok())
                .filter(|amount| *amount > 0),
            poll_interval: read_ms("PARADROP_POLL_MS", defaults.poll_interval),
            dial_timeout: read_ms("PARADROP_DIAL_TIMEOUT_MS", defaults.dial_timeout),
            reconnect_initial: read_ms("PARADROP_RECONNECT_MS", defaults.reconnect_initial),
            reconnect_max: read_ms("PARADROP_RECONNECT_MAX_MS", defaults.reconnect_max),
            identity_path: read_string("PARADROP_IDENTITY_FILE").map(PathBuf::from),
            animation: defaults.animation,
        }
    }

    /// Wager checked against the wallet before a bet is sent.
    pub fn bet_amount(&self) -> i64 {
        self.bet_amount.unwrap_or_else(|| self.game.bet_amount())
    }
}

fn read_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn read_ms(key: &str, fallback: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .map(Duration::from_millis)
        .unwrap_or(fallback)
}
