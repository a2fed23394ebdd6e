//! Rendering surface view model.
//!
//! [Screen] is everything a front end needs to draw the table. It is owned and
//! mutated by the sync client only; a [Surface] receives it after each handled
//! event and must treat it as read-only.

use crate::board::BoardSlot;
use paradrop_types::{constants::BOARD_SLOTS, Number};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusKind {
    #[default]
    Neutral,
    Ok,
    Error,
}

/// Inline status line; the only place failures are shown.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub kind: StatusKind,
}

impl Status {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Ok,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
        }
    }
}

/// Resolution animation: the parachutist dropping onto the winning slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Descent {
    #[default]
    Idle,
    Falling {
        slot: usize,
    },
    Landed {
        slot: usize,
        splash: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screen {
    pub title: &'static str,
    pub username: String,
    /// Credit for a winning bet in this game variant.
    pub payout: i64,
    pub round_code: String,
    pub players: u32,
    pub timer: String,
    pub timer_urgent: bool,
    pub slots: Vec<BoardSlot>,
    pub my_bets: Vec<Number>,
    pub selection: Option<Number>,
    pub wallet: i64,
    pub wallet_bounce: bool,
    pub bet_enabled: bool,
    pub status: Status,
    pub descent: Descent,
}

impl Screen {
    pub fn new(title: &'static str, username: impl Into<String>) -> Self {
        Self {
            title,
            username: username.into(),
            payout: 0,
            round_code: String::new(),
            players: 0,
            timer: String::new(),
            timer_urgent: false,
            slots: vec![BoardSlot::default(); BOARD_SLOTS],
            my_bets: Vec::new(),
            selection: Some(Number::MIN),
            wallet: 0,
            wallet_bounce: false,
            bet_enabled: true,
            status: Status::default(),
            descent: Descent::Idle,
        }
    }

    /// Indices of slots currently highlighted as winning.
    pub fn winning_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.winning)
            .map(|(index, _)| index)
            .collect()
    }
}

/// Sink for rendered state.
pub trait Surface {
    fn render(&mut self, screen: &Screen);
}

impl<F: FnMut(&Screen)> Surface for F {
    fn render(&mut self, screen: &Screen) {
        self(screen)
    }
}

/// Seconds rendered as pushed by the timer stream (`"07"`).
pub fn format_seconds(seconds: u32) -> String {
    format!("{seconds:02}")
}

/// Seconds rendered as a clock (`"4:05"`).
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_formats() {
        assert_eq!(format_seconds(7), "07");
        assert_eq!(format_seconds(125), "125");
        assert_eq!(format_clock(245), "4:05");
        assert_eq!(format_clock(0), "0:00");
    }

    #[test]
    fn test_new_screen_has_empty_board() {
        let screen = Screen::new("Parachute Drop", "Player1");
        assert_eq!(screen.slots.len(), BOARD_SLOTS);
        assert!(screen.winning_slots().is_empty());
        assert_eq!(screen.selection, Some(Number::MIN));
        assert!(screen.bet_enabled);
    }
}
