//! Client session
//!
//! Top-level facade over the control connection and the transfer engine.

pub mod core;
pub mod results;

pub use self::core::Session;
pub use results::{LoginResult, RenameResult};
