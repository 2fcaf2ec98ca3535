//! Control connection
//!
//! Command/reply exchange over the FTP control socket.

pub mod channel;

pub use channel::ControlChannel;
