//! Module `commands`
//!
//! Defines the FTP commands the client sends and their wire form.

use std::fmt;

use crate::error::{FtpClientError, Result};
use crate::transfer::{HostPort, TransferMode};

/// An FTP command as sent on the control connection.
///
/// Commands that take arguments store them as `String` variants; `Display`
/// renders the wire form without the trailing CRLF.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    USER(String),
    PASS(String),
    OPTS(String),
    PASV,
    PORT(HostPort),
    LIST(Option<String>),
    NLST(Option<String>),
    RETR(String),
    STOR(String),
    CWD(String),
    PWD,
    TYPE(TransferMode),
    DELE(String),
    RNFR(String),
    RNTO(String),
    QUIT,
}

impl Command {
    /// `OPTS UTF8 ON`, sent right after connecting.
    pub fn utf8_on() -> Self {
        Command::OPTS("UTF8 ON".into())
    }

    /// Rejects arguments that would smuggle extra commands past CRLF framing.
    pub fn validate(&self) -> Result<()> {
        match self.argument() {
            Some(arg) if arg.contains('\r') || arg.contains('\n') => {
                Err(FtpClientError::InvalidArgument(arg.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Form used in logs; the password is masked.
    pub fn loggable(&self) -> String {
        match self {
            Command::PASS(_) => "PASS ****".to_string(),
            other => other.to_string(),
        }
    }

    fn argument(&self) -> Option<&str> {
        match self {
            Command::USER(arg)
            | Command::PASS(arg)
            | Command::OPTS(arg)
            | Command::RETR(arg)
            | Command::STOR(arg)
            | Command::CWD(arg)
            | Command::DELE(arg)
            | Command::RNFR(arg)
            | Command::RNTO(arg) => Some(arg),
            Command::LIST(arg) | Command::NLST(arg) => arg.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::USER(user) => write!(f, "USER {}", user),
            Command::PASS(pass) => write!(f, "PASS {}", pass),
            Command::OPTS(opts) => write!(f, "OPTS {}", opts),
            Command::PASV => f.write_str("PASV"),
            Command::PORT(addr) => write!(f, "PORT {}", addr.encode()),
            Command::LIST(Some(dir)) => write!(f, "LIST {}", dir),
            Command::LIST(None) => f.write_str("LIST"),
            Command::NLST(Some(dir)) => write!(f, "NLST {}", dir),
            Command::NLST(None) => f.write_str("NLST"),
            Command::RETR(name) => write!(f, "RETR {}", name),
            Command::STOR(name) => write!(f, "STOR {}", name),
            Command::CWD(dir) => write!(f, "CWD {}", dir),
            Command::PWD => f.write_str("PWD"),
            Command::TYPE(mode) => write!(f, "TYPE {}", mode.type_code()),
            Command::DELE(name) => write!(f, "DELE {}", name),
            Command::RNFR(name) => write!(f, "RNFR {}", name),
            Command::RNTO(name) => write!(f, "RNTO {}", name),
            Command::QUIT => f.write_str("QUIT"),
        }
    }
}
