//! Rich diagnostic error types for mpx-chunky.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives
//! next to the code that raises it; [`ChunkyError`] aggregates them so the CLI
//! can report any failure with its code and help text intact.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::document::DocumentError;
use crate::paths::PathError;
use crate::query::QueryError;
use crate::remote::RemoteError;
use crate::timestamp::TimestampError;

/// Top-level error type.
#[derive(Debug, Error, Diagnostic)]
pub enum ChunkyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Timestamp(#[from] TimestampError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),
}

pub type ChunkyResult<T> = std::result::Result<T, ChunkyError>;

// ---------------------------------------------------------------------------
// Chunk store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("chunk store I/O failed at {path}")]
    #[diagnostic(
        code(chunky::store::io),
        help("Check that the chunk directory exists and is readable and writable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("chunk {number} not found at {path}")]
    #[diagnostic(
        code(chunky::store::missing),
        help("Chunks are written by `chunky run`; check the container and the `--out` directory.")
    )]
    Missing { number: u32, path: String },

    #[error("invalid chunk number {number}")]
    #[diagnostic(
        code(chunky::store::invalid_number),
        help("Chunk numbers start at 1.")
    )]
    InvalidNumber { number: u32 },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
