//! Interactive shell
//!
//! A thin prompt loop over `Session`; it holds no protocol logic.

pub mod parser;
pub mod shell;

pub use parser::{ShellCommand, parse_command};
pub use shell::Terminal;
