pub mod config;
pub mod control;
pub mod error;
pub mod protocol;
pub mod session;
pub mod storage;
pub mod terminal;
pub mod transfer;
pub mod utils;

pub use config::ClientConfig;
pub use control::ControlChannel;
pub use error::{FtpClientError, Result};
pub use protocol::{Command, Reply, ReplyParser};
pub use session::{LoginResult, RenameResult, Session};
pub use terminal::Terminal;
pub use transfer::{DataMode, HostPort, ListResult, TransferMode, TransferReport};
