//! Remote search error types.

use miette::Diagnostic;
use thiserror::Error;

/// Failure of a remote search. Whatever went wrong underneath (connection,
/// HTTP status, undecodable body) surfaces as this single condition.
#[derive(Debug, Error, Diagnostic)]
pub enum RemoteError {
    #[error("remote search for {target} failed: {cause}")]
    #[diagnostic(
        code(chunky::remote::search_failed),
        help(
            "Check that the service is reachable and the credentials are valid. \
             The request was already retried according to `remote.max_attempts`; \
             rerun the command to resume from the last stored chunk."
        )
    )]
    SearchFailed { target: String, cause: String },
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

impl RemoteError {
    pub(crate) fn failed(target: &str, cause: impl Into<String>) -> Self {
        RemoteError::SearchFailed {
            target: target.to_string(),
            cause: cause.into(),
        }
    }
}
