//! Transfer result types
//!
//! Defines result structures returned by transfer operations.

use crate::protocol::Reply;

/// Every reply exchanged during one LIST/NLST/RETR/STOR, plus the byte count.
#[derive(Debug, Clone)]
pub struct TransferReport {
    /// Answer to PASV or PORT.
    pub negotiation: Reply,
    /// First answer to the transfer command.
    pub preliminary: Reply,
    /// Answer read after the data connection closed; `None` when the
    /// transfer command was refused.
    pub completion: Option<Reply>,
    pub bytes: u64,
}

impl TransferReport {
    /// True when the server refused the transfer command and no data moved.
    pub fn is_rejected(&self) -> bool {
        self.completion.is_none()
    }

    /// The reply that decides the outcome of the transfer.
    pub fn outcome(&self) -> &Reply {
        self.completion.as_ref().unwrap_or(&self.preliminary)
    }

    /// Replies in the order they were received.
    pub fn replies(&self) -> impl Iterator<Item = &Reply> {
        [Some(&self.negotiation), Some(&self.preliminary), self.completion.as_ref()]
            .into_iter()
            .flatten()
    }
}

/// Result of a directory listing.
#[derive(Debug, Clone)]
pub struct ListResult {
    pub report: TransferReport,
    pub listing: String,
}
