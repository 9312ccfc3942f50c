//! hostwatch-state: host status model and persistence for hostwatch.
//!
//! Backed by [redb](https://docs.rs/redb), provides the durable side of
//! host tracking: one status row per host, the latest request sample per
//! host/label pair, and an append-only failure log.
//!
//! # Architecture
//!
//! All rows are JSON-serialized into redb's `&[u8]` value columns.
//! [`StatusDb`] implements [`StatusBackend`], the interface the monitor's
//! cache writes through. `StatusDb` is `Clone` + `Send` + `Sync` (backed by
//! `Arc<Database>`) and can be shared across threads.

pub mod backend;
pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use backend::StatusBackend;
pub use error::{StateError, StateResult};
pub use store::StatusDb;
pub use types::*;
