//! Transfer module for the FTP client
//!
//! Handles data channel negotiation, PASV/PORT addressing, byte pumping and
//! the sequencing of complete transfers.

pub mod address;
pub mod data_channel;
pub mod file_ops;
pub mod modes;
pub mod operations;
pub mod results;

// Re-export key types
pub use address::HostPort;
pub use data_channel::{DataChannelDescriptor, DataChannelNegotiator, DataConnection, Negotiation};
pub use modes::{DataMode, TransferMode};
pub use operations::TransferEngine;
pub use results::{ListResult, TransferReport};
