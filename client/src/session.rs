use crate::identity::Identity;
use paradrop_types::Number;

/// Client-side session: who we are, what the server last said our balance
/// is, and which number is selected.
#[derive(Clone, Debug)]
pub struct Session {
    identity: Identity,
    balance: i64,
    selection: Option<Number>,
}

impl Session {
    /// Balance starts at zero and the selection at the lowest number.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            balance: 0,
            selection: Some(Number::MIN),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    pub fn username(&self) -> &str {
        &self.identity.username
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn selection(&self) -> Option<Number> {
        self.selection
    }

    /// Only ever called with a server-sourced value.
    pub(crate) fn set_balance(&mut self, balance: i64) {
        self.balance = balance;
    }

    pub(crate) fn select(&mut self, number: Number) {
        self.selection = Some(number);
    }

    pub(crate) fn clear_selection(&mut self) {
        self.selection = None;
    }
}
