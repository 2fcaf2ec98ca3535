//! Local file storage
//!
//! The filesystem collaborator used by downloads and uploads.

pub mod filesystem;

pub use filesystem::{LocalFiles, StdFileSystem};
