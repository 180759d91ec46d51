#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **coffer-store-core** – Storage abstraction for the coffer ledger.
//!
//! This crate defines the [`StorageBackend`] contract drivers implement and
//! everything typed that sits on top of it: the JSON object codec, the
//! caching [`Repository`], refspec resolution, history walks, and merges.
//! Concrete drivers (filesystem, in-memory) live in separate crates that
//! depend on this one.
//!
//! Objects are immutable and content addressed, so the repository's LRU
//! cache never invalidates, repeated writes are no-ops, and two histories
//! that agree on content agree on every identity.

pub mod backend;
pub mod codec;
pub mod error;
pub mod merge;
pub mod refspec;
pub mod repository;
pub mod walk;

pub use backend::StorageBackend;
pub use codec::{Object, StateRecord, TransactionRecord};
pub use error::StoreError;
pub use refspec::{RefSpec, DEFAULT_BRANCH, HEAD_ALIAS};
pub use repository::{Repository, DEFAULT_CACHE_CAPACITY};
pub use walk::{Walk, WalkMode};
