//! FTP Protocol implementation
//!
//! Handles command rendering, reply parsing, and reply codes.

pub mod commands;
pub mod parser;
pub mod reply;
pub mod responses;

pub use commands::Command;
pub use parser::ReplyParser;
pub use reply::Reply;
