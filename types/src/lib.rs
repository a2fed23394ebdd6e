//! Types shared by paradrop components.
//!
//! The wire protocol is JSON: realtime frames are `{"event": <name>, "data": {..}}`
//! envelopes (see [protocol]) and the HTTP endpoints use the bodies in [api].

pub mod api;
pub mod constants;
pub mod game;
pub mod protocol;

pub use game::{Bet, GameType, Number, NumberOutOfRange, RoundCode, UnknownGameType};
pub use protocol::{Inbound, Outbound, RoundData};
