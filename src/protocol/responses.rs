//! FTP reply codes
//!
//! The codes this client interprets. Everything else is passed through.

pub const DATA_CONNECTION_ALREADY_OPEN: u16 = 125;
pub const FILE_STATUS_OK: u16 = 150;
pub const LOGIN_SUCCESS: u16 = 230;
pub const FILE_ACTION_PENDING: u16 = 350;

/// Preliminary codes that allow a transfer to proceed.
pub fn opens_transfer(code: u16) -> bool {
    code == FILE_STATUS_OK || code == DATA_CONNECTION_ALREADY_OPEN
}
