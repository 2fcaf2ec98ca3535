//! Error handlers
//!
//! Classifies client errors for the shell.

use crate::error::types::FtpClientError;
use log::{error, warn};

/// Log an FTP client error at a level matching its severity
pub fn handle_error(err: &FtpClientError) {
    if is_usage_error(err) {
        warn!("FTP client: {}", err);
    } else {
        error!("FTP client error: {}", err);
    }
}

/// Errors caused by the caller's request rather than by the network or server.
pub fn is_usage_error(err: &FtpClientError) -> bool {
    matches!(
        err,
        FtpClientError::NotConnected
            | FtpClientError::AlreadyConnected(_)
            | FtpClientError::InvalidArgument(_)
            | FtpClientError::LocalFileNotFound(_)
    )
}
