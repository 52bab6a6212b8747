use serde::{Deserialize, Serialize};

use expenseshare_core::{Currency, UserId};

use crate::user::UserAccount;

/// The signed-in user, passed explicitly to every service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub username: String,
    /// Currency amounts are displayed in.
    pub currency: Currency,
}

impl Session {
    pub fn for_account(account: &UserAccount) -> Self {
        Self {
            user_id: account.id(),
            username: account.username().to_string(),
            currency: account.currency(),
        }
    }
}
