//! Session result types
//!
//! Defines result structures for the multi-command session operations.

use crate::protocol::{Reply, responses};

/// Replies to `USER` and, when the server asked for one, `PASS`.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: Reply,
    pub pass: Option<Reply>,
}

impl LoginResult {
    pub fn is_logged_in(&self) -> bool {
        self.pass.as_ref().unwrap_or(&self.user).code() == responses::LOGIN_SUCCESS
    }
}

/// Replies to `RNFR` and, only after a 350, `RNTO`.
#[derive(Debug, Clone)]
pub struct RenameResult {
    pub from: Reply,
    pub to: Option<Reply>,
}

impl RenameResult {
    /// The reply that decides the outcome of the rename.
    pub fn outcome(&self) -> &Reply {
        self.to.as_ref().unwrap_or(&self.from)
    }
}
