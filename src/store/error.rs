//! Error types for store operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations.
///
/// Lookups that simply miss are not errors: `get` returns `Ok(None)` and
/// `delete` returns `Ok(false)` for absent keys.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A segment file failed structural validation during replay.
    #[error("malformed segment {}: {reason}", .path.display())]
    MalformedSegment { path: PathBuf, reason: String },

    /// A key-length field on disk did not match the fixed 4-byte key width.
    #[error("segment {}: key length field is {found}, expected 4", .path.display())]
    BadKeyLength { path: PathBuf, found: u32 },

    /// `put` was called with an empty value.
    #[error("empty values are not storable")]
    EmptyValue,

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
