//! FTP transfer modes
//!
//! Representation type (ASCII/binary) and data connection mode
//! (passive/active).

use serde::Deserialize;
use std::fmt;

/// Representation type announced with `TYPE`.
///
/// Only the command differs; bytes are moved unchanged in both modes.
/// ASCII is the RFC 959 default a server starts a session with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferMode {
    #[default]
    Ascii,
    Binary,
}

impl TransferMode {
    /// Argument of the `TYPE` command.
    pub fn type_code(&self) -> &'static str {
        match self {
            TransferMode::Ascii => "A",
            TransferMode::Binary => "I",
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Ascii => f.write_str("ascii"),
            TransferMode::Binary => f.write_str("binary"),
        }
    }
}

/// Who opens the data connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    /// Client connects to the address from the PASV reply.
    #[default]
    Passive,
    /// Client listens and announces the address with PORT.
    Active,
}

impl fmt::Display for DataMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataMode::Passive => f.write_str("passive"),
            DataMode::Active => f.write_str("active"),
        }
    }
}
