// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # mpx-chunky
//!
//! Client-side aggregation and pagination over a museum collection search
//! service. Large containers (object groups, exhibitions, locations,
//! approvals, arbitrary queries) are exported as a sequence of self-contained
//! chunks: each holds one page of primary records together with every media
//! and person record they reference.
//!
//! ## Architecture
//!
//! - **Query builder** (`query`): expert-search criteria trees with explicit scope handles
//! - **Documents** (`document`): multi-type record sets with newest-wins merge
//! - **Timestamps** (`timestamp`): normalized 14-digit last-modified comparison
//! - **Remote ports** (`remote`): `SearchPort` trait, HTTP (ureq) and in-memory implementations
//! - **Related items** (`resolve`): one OR-query per secondary type for a page's references
//! - **Pagination** (`chunky`): lazy chunk iterator, container catalogue, chunk store
//!
//! ## Library usage
//!
//! ```no_run
//! use mpx_chunky::chunky::{ChunkStore, Chunky, Container, ContainerKind};
//! use mpx_chunky::config::ChunkyConfig;
//! use mpx_chunky::remote::HttpSearchPort;
//!
//! let config = ChunkyConfig::load(std::path::Path::new("chunky.toml")).unwrap();
//! let port = HttpSearchPort::new(&config.remote);
//! let container = Container::new(ContainerKind::Exhibit, "20222").unwrap();
//! let store = ChunkStore::new("chunks", &container);
//! let chunky = Chunky::from_config(port, container, &config.chunking).unwrap();
//! let summary = chunky.run_into(&store, true).unwrap();
//! println!("{} chunks", summary.chunks_written);
//! ```

pub mod chunky;
pub mod config;
pub mod document;
pub mod error;
pub mod paths;
pub mod query;
pub mod remote;
pub mod resolve;
pub mod timestamp;
