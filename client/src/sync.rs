//! Round sync state machine.
//!
//! [RoundSyncClient] mirrors server round, bet and wallet state into a [Screen]
//! and turns user actions into [Outbound] requests. It performs no I/O: every
//! handler takes the current time in milliseconds and returns the [Effect]s the
//! caller must carry out. Handlers run to completion, one event at a time.
//!
//! Per round the client moves through
//! `AwaitingJoin -> Open -> Closed -> Resolved -> (next round) Open`.
//! A `new_round` push always replaces the round wholesale and cancels every
//! pending round continuation, so a resolution sequence still in flight can
//! never highlight a slot of the next round.

use crate::{
    board::{assign_slots, my_bets, overflow, slot_of},
    config::AnimationConfig,
    identity::Identity,
    scheduler::{Scheduler, TaskGroup},
    screen::{format_clock, format_seconds, Descent, Screen, Status},
    session::Session,
    Result,
};
use paradrop_types::{
    api::{BalanceResponse, RegisterResponse, TableSnapshot, TablesResponse},
    constants::{BOARD_SLOTS, URGENT_SECONDS},
    Bet, GameType, Inbound, Number, Outbound, RoundCode, RoundData,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundPhase {
    /// Join sent, no round state received yet.
    AwaitingJoin,
    Open,
    Closed,
    Resolved,
}

impl RoundPhase {
    pub fn accepts_bets(&self) -> bool {
        matches!(self, RoundPhase::AwaitingJoin | RoundPhase::Open)
    }
}

/// The current round, as last reported by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub code: Option<RoundCode>,
    pub phase: RoundPhase,
    pub players: u32,
    pub time_remaining: Option<u32>,
    pub bets: Vec<Bet>,
    pub result: Option<Number>,
    /// The server closed betting on this round. Only a new round clears it;
    /// reconnecting does not.
    pub betting_closed: bool,
}

impl Round {
    fn awaiting_join() -> Self {
        Self {
            code: None,
            phase: RoundPhase::AwaitingJoin,
            players: 0,
            time_remaining: None,
            bets: Vec::new(),
            result: None,
            betting_closed: false,
        }
    }
}

/// Work the caller must perform on behalf of the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Send(Outbound),
    RefreshBalance,
    RefreshTable,
}

/// Delayed steps of the resolution sequence and wallet highlight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Continuation {
    BeginDescent { winning: Number },
    Land { winning: Number },
    Settle,
    SettleWallet,
}

/// Local precondition failures of [RoundSyncClient::place_bet]. The message is
/// what the status line shows.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BetRejected {
    #[error("Select a number first")]
    NoSelection,
    #[error("Insufficient balance")]
    InsufficientBalance { balance: i64, required: i64 },
    #[error("Betting closed")]
    BettingClosed,
}

pub struct RoundSyncClient {
    game: GameType,
    bet_amount: i64,
    animation: AnimationConfig,
    /// Round code being followed, if restricted to one table.
    tracked: Option<RoundCode>,
    session: Session,
    round: Round,
    screen: Screen,
    scheduler: Scheduler<Continuation>,
}

impl RoundSyncClient {
    pub fn new(game: GameType, identity: Identity) -> Self {
        let mut screen = Screen::new(game.title(), identity.username.clone());
        screen.payout = game.payout();
        Self {
            game,
            bet_amount: game.bet_amount(),
            animation: AnimationConfig::default(),
            tracked: None,
            session: Session::new(identity),
            round: Round::awaiting_join(),
            screen,
            scheduler: Scheduler::new(),
        }
    }

    pub fn with_bet_amount(mut self, bet_amount: i64) -> Self {
        self.bet_amount = bet_amount;
        self
    }

    /// Follow a single table, identified by its current round code.
    pub fn with_table(mut self, round_code: Option<RoundCode>) -> Self {
        self.tracked = round_code;
        self
    }

    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    pub fn game(&self) -> GameType {
        self.game
    }

    pub fn bet_amount(&self) -> i64 {
        self.bet_amount
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn phase(&self) -> RoundPhase {
        self.round.phase
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn tracked_table(&self) -> Option<&RoundCode> {
        self.tracked.as_ref()
    }

    pub fn scheduler(&self) -> &Scheduler<Continuation> {
        &self.scheduler
    }

    /// Transport (re)connected: join the game and refresh everything.
    pub fn on_connected(&mut self) -> Vec<Effect> {
        self.set_phase(RoundPhase::AwaitingJoin);
        info!(game = %self.game, user_id = self.session.user_id(), "joining game");
        let mut effects = vec![
            Effect::Send(Outbound::JoinGame {
                game_type: self.game,
                user_id: self.session.user_id().to_string(),
            }),
            Effect::RefreshBalance,
        ];
        if self.tracked.is_some() {
            effects.push(Effect::RefreshTable);
        }
        effects
    }

    pub fn on_disconnected(&mut self) {
        self.set_phase(RoundPhase::AwaitingJoin);
        self.screen.status = Status::error("Connection lost, reconnecting");
    }

    /// Show a status error raised outside the state machine.
    pub fn show_error(&mut self, text: impl Into<String>) {
        self.screen.status = Status::error(text);
    }

    pub fn select_number(&mut self, number: Number) {
        self.session.select(number);
        self.screen.selection = Some(number);
    }

    pub fn clear_selection(&mut self) {
        self.session.clear_selection();
        self.screen.selection = None;
    }

    /// Validate locally and build the bet request. The wallet is left alone
    /// until the server confirms with a new balance.
    pub fn place_bet(&mut self) -> std::result::Result<Outbound, BetRejected> {
        match self.check_bet() {
            Ok(number) => {
                debug!(%number, round = ?self.round.code, "placing bet");
                Ok(Outbound::PlaceBet {
                    game_type: self.game,
                    user_id: self.session.user_id().to_string(),
                    username: self.session.username().to_string(),
                    number,
                })
            }
            Err(rejected) => {
                debug!(%rejected, "bet rejected locally");
                self.screen.status = Status::error(rejected.to_string());
                Err(rejected)
            }
        }
    }

    fn check_bet(&self) -> std::result::Result<Number, BetRejected> {
        let number = self.session.selection().ok_or(BetRejected::NoSelection)?;
        if self.session.balance() < self.bet_amount {
            return Err(BetRejected::InsufficientBalance {
                balance: self.session.balance(),
                required: self.bet_amount,
            });
        }
        if !self.betting_open() {
            return Err(BetRejected::BettingClosed);
        }
        Ok(number)
    }

    /// Handle one pushed message.
    pub fn handle(&mut self, inbound: Inbound, now_ms: u64) -> Vec<Effect> {
        if !self.game.accepts(inbound.game_type()) {
            debug!(kind = inbound.kind(), game_type = ?inbound.game_type(), "ignoring message for other game");
            return Vec::new();
        }

        match inbound {
            Inbound::RoundData { round_data, .. } => {
                if self.is_other_table(&round_data) {
                    return Vec::new();
                }
                if self.round.phase == RoundPhase::AwaitingJoin {
                    let same_round = round_data.round_code.is_none()
                        || round_data.round_code == self.round.code;
                    self.rejoin(same_round);
                }
                self.apply_round_data(round_data, now_ms);
                Vec::new()
            }
            Inbound::NewRound {
                round_code,
                round_data,
                ..
            } => {
                self.start_round(round_code, round_data, now_ms);
                Vec::new()
            }
            Inbound::BetPlaced { round_data, .. } => {
                if let Some(round_data) = round_data {
                    if self.is_other_table(&round_data) {
                        return Vec::new();
                    }
                    self.apply_round_data(round_data, now_ms);
                }
                self.refresh_table()
            }
            Inbound::BetSuccess { new_balance, .. } => {
                self.update_wallet(new_balance, now_ms);
                self.screen.status = Status::ok("Bet placed successfully!");
                self.refresh_table()
            }
            Inbound::BetError { message } => {
                let message = message.unwrap_or_else(|| "Bet error".to_string());
                warn!(%message, "bet rejected by server");
                self.screen.status = Status::error(message);
                Vec::new()
            }
            Inbound::RoundResult { result, .. } => {
                info!(%result, round = ?self.round.code, "round resolved");
                self.resolve(result, now_ms);
                self.screen.status = Status::ok(format!("Winning: {result}!"));
                Vec::new()
            }
            Inbound::TimerUpdate {
                time_remaining,
                players,
                ..
            } => {
                self.round.time_remaining = Some(time_remaining);
                self.round.players = players;
                self.screen.timer = format_seconds(time_remaining);
                self.screen.players = players;
                self.screen.timer_urgent = time_remaining <= URGENT_SECONDS;
                Vec::new()
            }
            Inbound::BettingClosed { .. } => {
                if self.round.phase != RoundPhase::Resolved {
                    self.set_phase(RoundPhase::Closed);
                }
                self.screen.status = Status::error("Betting closed");
                Vec::new()
            }
        }
    }

    /// Run every continuation due at `now_ms`. Follow-up steps are timed from
    /// the deadline of the step that scheduled them, so a late wake-up catches
    /// up on the whole chain.
    pub fn fire_due(&mut self, now_ms: u64) {
        loop {
            let due = self.scheduler.take_due(now_ms);
            if due.is_empty() {
                break;
            }
            for (due_ms, continuation) in due {
                self.run(continuation, due_ms);
            }
        }
    }

    pub fn next_deadline(&self) -> Option<u64> {
        self.scheduler.next_deadline()
    }

    /// Completion of the one-shot registration call. Failures are not retried:
    /// the next balance push corrects the wallet.
    pub fn on_registered(&mut self, response: Result<RegisterResponse>, now_ms: u64) {
        match response {
            Ok(RegisterResponse {
                success: true,
                balance,
                ..
            }) => {
                self.update_wallet(balance.unwrap_or(0), now_ms);
            }
            Ok(response) => {
                warn!(message = ?response.message, "registration refused");
            }
            Err(err) => {
                error!(?err, "registration failed");
            }
        }
    }

    pub fn on_balance(&mut self, response: Result<BalanceResponse>, now_ms: u64) {
        match response {
            Ok(BalanceResponse {
                balance: Some(balance),
            }) => self.update_wallet(balance, now_ms),
            Ok(_) => debug!("balance response without balance"),
            Err(err) => warn!(?err, "balance fetch failed"),
        }
    }

    pub fn on_tables(&mut self, response: Result<TablesResponse>, now_ms: u64) {
        let tables = match response {
            Ok(tables) => tables,
            Err(err) => {
                warn!(?err, "table fetch failed");
                return;
            }
        };
        let Some(tracked) = self.tracked.clone() else {
            return;
        };
        match tables.find(&tracked) {
            Some(table) => self.apply_snapshot(table.clone(), now_ms),
            None => {
                debug!(%tracked, "table not listed");
                self.screen.status = Status::error("Table not found");
            }
        }
    }

    fn refresh_table(&self) -> Vec<Effect> {
        if self.tracked.is_some() {
            vec![Effect::RefreshTable]
        } else {
            Vec::new()
        }
    }

    fn set_phase(&mut self, phase: RoundPhase) {
        if self.round.phase != phase {
            debug!(from = ?self.round.phase, to = ?phase, "round phase");
        }
        self.round.phase = phase;
        if matches!(phase, RoundPhase::Closed | RoundPhase::Resolved) {
            self.round.betting_closed = true;
        }
        self.screen.bet_enabled = self.betting_open();
    }

    fn betting_open(&self) -> bool {
        self.round.phase.accepts_bets() && !self.round.betting_closed
    }

    /// First round state after a (re)join. A round the server already closed
    /// stays closed; anything else opens.
    fn rejoin(&mut self, same_round: bool) {
        if self.round.betting_closed && same_round {
            let phase = if self.round.result.is_some() {
                RoundPhase::Resolved
            } else {
                RoundPhase::Closed
            };
            self.set_phase(phase);
        } else {
            self.round.betting_closed = false;
            self.round.result = None;
            self.set_phase(RoundPhase::Open);
        }
    }

    /// Round data for a table other than the one being followed.
    fn is_other_table(&self, round_data: &RoundData) -> bool {
        match (&self.tracked, &round_data.round_code) {
            (Some(tracked), Some(code)) if tracked != code => {
                debug!(%code, %tracked, "ignoring round data for other table");
                true
            }
            _ => false,
        }
    }

    fn apply_round_data(&mut self, round_data: RoundData, now_ms: u64) {
        if let Some(code) = round_data.round_code {
            self.screen.round_code = code.to_string();
            self.round.code = Some(code);
        }
        self.round.players = round_data.players;
        self.screen.players = round_data.players;
        if let Some(balance) = round_data.balance {
            self.update_wallet(balance, now_ms);
        }
        self.apply_bets(round_data.bets);
    }

    /// Replace the bet list and rebuild the board and "my bets" panel.
    fn apply_bets(&mut self, bets: Vec<Bet>) {
        let hidden = overflow(&bets, BOARD_SLOTS);
        if hidden > 0 {
            debug!(hidden, "bets beyond board capacity are not displayed");
        }
        self.screen.slots = assign_slots(&bets, BOARD_SLOTS);
        self.screen.my_bets = my_bets(&bets, self.session.user_id());
        self.round.bets = bets;

        // Keep the landing highlight on whichever slot now shows the result.
        if let Descent::Landed { splash, .. } = self.screen.descent {
            match self.round.result.and_then(|winning| slot_of(&self.screen.slots, winning)) {
                Some(slot) => {
                    self.screen.slots[slot].winning = true;
                    self.screen.descent = Descent::Landed { slot, splash };
                }
                None => self.screen.descent = Descent::Idle,
            }
        }
    }

    fn start_round(&mut self, round_code: RoundCode, round_data: RoundData, now_ms: u64) {
        let cancelled = self.scheduler.cancel_group(TaskGroup::Round);
        info!(%round_code, cancelled, "new round");
        if self.tracked.is_some() {
            self.tracked = Some(round_code.clone());
        }

        self.round = Round {
            code: Some(round_code.clone()),
            phase: RoundPhase::Open,
            players: round_data.players,
            time_remaining: None,
            bets: Vec::new(),
            result: None,
            betting_closed: false,
        };
        self.set_phase(RoundPhase::Open);
        self.screen.round_code = round_code.to_string();
        self.screen.players = round_data.players;
        self.screen.timer = String::new();
        self.screen.timer_urgent = false;
        self.screen.descent = Descent::Idle;
        if let Some(balance) = round_data.balance {
            self.update_wallet(balance, now_ms);
        }
        self.apply_bets(round_data.bets);
        self.screen.status = Status::ok("New round started");
    }

    /// Enter `Resolved` and (re)start the resolution sequence for `winning`.
    fn resolve(&mut self, winning: Number, now_ms: u64) {
        self.scheduler.cancel_group(TaskGroup::Round);
        self.set_phase(RoundPhase::Resolved);
        self.round.result = Some(winning);
        self.clear_highlight();
        self.scheduler.schedule(
            TaskGroup::Round,
            now_ms,
            self.animation.result_lead_ms,
            Continuation::BeginDescent { winning },
        );
    }

    fn clear_highlight(&mut self) {
        for slot in &mut self.screen.slots {
            slot.winning = false;
        }
        self.screen.descent = Descent::Idle;
    }

    fn run(&mut self, continuation: Continuation, now_ms: u64) {
        match continuation {
            Continuation::BeginDescent { winning } => {
                let Some(slot) = slot_of(&self.screen.slots, winning) else {
                    debug!(%winning, "winning number not on the board");
                    return;
                };
                self.screen.descent = Descent::Falling { slot };
                self.scheduler.schedule(
                    TaskGroup::Round,
                    now_ms,
                    self.animation.fall_ms,
                    Continuation::Land { winning },
                );
            }
            Continuation::Land { winning } => {
                self.clear_highlight();
                let Some(slot) = slot_of(&self.screen.slots, winning) else {
                    debug!(%winning, "winning number left the board before touchdown");
                    return;
                };
                self.screen.slots[slot].winning = true;
                self.screen.descent = Descent::Landed { slot, splash: true };
                self.scheduler.schedule(
                    TaskGroup::Round,
                    now_ms,
                    self.animation.settle_ms,
                    Continuation::Settle,
                );
            }
            Continuation::Settle => {
                if let Descent::Landed { slot, .. } = self.screen.descent {
                    self.screen.descent = Descent::Landed { slot, splash: false };
                }
            }
            Continuation::SettleWallet => self.screen.wallet_bounce = false,
        }
    }

    /// Wallet values only ever come from the server.
    fn update_wallet(&mut self, balance: i64, now_ms: u64) {
        self.session.set_balance(balance);
        self.screen.wallet = balance;
        self.screen.wallet_bounce = true;
        self.scheduler.cancel_group(TaskGroup::Wallet);
        self.scheduler.schedule(
            TaskGroup::Wallet,
            now_ms,
            self.animation.wallet_bounce_ms,
            Continuation::SettleWallet,
        );
    }

    fn apply_snapshot(&mut self, table: TableSnapshot, now_ms: u64) {
        let same_round = self.round.code.as_ref() == Some(&table.round_code);
        self.screen.round_code = table.round_code.to_string();
        self.round.code = Some(table.round_code);
        self.round.players = table.players;
        self.round.time_remaining = Some(table.time_remaining);
        self.screen.players = table.players;
        self.screen.timer = format_clock(table.time_remaining);
        self.apply_bets(table.bets);

        match (table.is_finished, table.result) {
            (true, Some(result)) => {
                let already = self.round.phase == RoundPhase::Resolved
                    && self.round.result == Some(result);
                if !already {
                    self.resolve(result, now_ms);
                    self.screen.status = Status::ok(format!("Winning number: {result}"));
                }
            }
            _ if table.is_betting_closed || table.is_finished => {
                if self.betting_open() {
                    self.set_phase(RoundPhase::Closed);
                    self.screen.status = Status::error("Betting closed for this round");
                }
            }
            // A poll can be older than the last push; it never reopens a round.
            _ => {
                if self.round.phase == RoundPhase::AwaitingJoin {
                    self.rejoin(same_round);
                }
            }
        }
    }
}
