//! File system operations
//!
//! The local side of downloads and uploads.

use std::fs::File;
use std::io::{Read, Result, Write};
use std::path::Path;

/// Local files a session reads uploads from and writes downloads to.
pub trait LocalFiles {
    /// True if `path` names an existing regular file.
    fn exists(&self, path: &Path) -> bool;

    /// Creates or truncates `path` for writing.
    fn create(&self, path: &Path) -> Result<Box<dyn Write>>;

    /// Opens `path` for reading.
    fn open(&self, path: &Path) -> Result<Box<dyn Read>>;
}

/// `LocalFiles` backed by `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl LocalFiles for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists() && path.is_file()
    }

    fn create(&self, path: &Path) -> Result<Box<dyn Write>> {
        Ok(Box::new(File::create(path)?))
    }

    fn open(&self, path: &Path) -> Result<Box<dyn Read>> {
        Ok(Box::new(File::open(path)?))
    }
}
