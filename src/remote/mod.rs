//! Remote search abstraction: trait + HTTP and in-memory implementations.
//!
//! `SearchPort` executes one query descriptor against one record type.
//! - `HttpSearchPort` uses ureq (sync HTTP) against a live service.
//! - `MemorySearchPort` answers from a local document, for offline runs and tests.

pub mod error;
pub mod http;
pub mod memory;

use crate::document::Document;
use crate::query::QueryDescriptor;

pub use error::{RemoteError, RemoteResult};
pub use http::HttpSearchPort;
pub use memory::MemorySearchPort;

/// Executes expert searches.
///
/// The returned document holds a record set for the descriptor's module (empty
/// if nothing matched) whose reported total is the full match count,
/// regardless of limit and offset. Retries and authentication are the
/// implementation's business.
pub trait SearchPort {
    fn search(&self, query: &QueryDescriptor) -> RemoteResult<Document>;
}

impl<P: SearchPort + ?Sized> SearchPort for &P {
    fn search(&self, query: &QueryDescriptor) -> RemoteResult<Document> {
        (**self).search(query)
    }
}

impl<P: SearchPort + ?Sized> SearchPort for Box<P> {
    fn search(&self, query: &QueryDescriptor) -> RemoteResult<Document> {
        (**self).search(query)
    }
}
