/// Highest number a bet may be placed on (the range starts at zero).
pub const NUMBER_MAX: u8 = 36;

/// Physical slots on the board. Distinct numbers beyond this are not displayed.
pub const BOARD_SLOTS: usize = 6;

/// Remaining seconds at or below which the round timer is rendered as urgent.
pub const URGENT_SECONDS: u32 = 10;

