//! Diagnostic error types for documents.

use miette::Diagnostic;
use thiserror::Error;

use crate::timestamp::TimestampError;

/// Errors from document merge and document files.
#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error("record {type_name}/{id} has a malformed last-modified value")]
    #[diagnostic(
        code(chunky::document::timestamp),
        help(
            "Merging compares last-modified values down to the second. \
             The record carries a value that cannot be normalized; fix the data \
             at its source instead of merging around it."
        )
    )]
    Timestamp {
        type_name: String,
        id: String,
        #[source]
        source: TimestampError,
    },

    #[error("malformed since value \"{value}\"")]
    #[diagnostic(
        code(chunky::document::since),
        help("Pass `since` with date and time down to the second, e.g. `2021-10-14T07:40:29`.")
    )]
    Since {
        value: String,
        #[source]
        source: TimestampError,
    },

    #[error("failed to read document file: {path}")]
    #[diagnostic(
        code(chunky::document::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write document file: {path}")]
    #[diagnostic(
        code(chunky::document::write),
        help("Check that the target directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {origin}: {message}")]
    #[diagnostic(
        code(chunky::document::parse),
        help(
            "A document is a JSON object with a `modules` list. Each module needs a \
             unique `name`, and record ids must be unique within a module."
        )
    )]
    Parse { origin: String, message: String },
}

pub type DocumentResult<T> = std::result::Result<T, DocumentError>;
