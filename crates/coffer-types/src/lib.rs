#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **coffer-types** – Core value types for the coffer ledger.
//!
//! This crate sits at the bottom of the workspace graph and defines the
//! domain model every other crate shares: exact multi-asset [`Balance`]
//! values, the [`Accounts`] listing, the hierarchical [`Budget`] tree, the
//! [`State`] snapshot pairing the two, signed [`Impact`] differences, and
//! the [`Transaction`] commits linking states into a history.
//!
//! Identity is content-derived: each entity hashes its canonical byte
//! encoding into a 20-byte [`ObjectId`], and entities reference one another
//! by identity, forming a Merkle DAG. Equal content always means an equal
//! identity, regardless of process, platform, or in-memory map ordering.
//!
//! The crate makes no assumptions about I/O or storage; persistence lives in
//! the `coffer-store-*` crates.

pub mod balance;
pub mod budget;
pub mod ident;
pub mod state;
pub mod transaction;

mod accounts;

pub use accounts::Accounts;
pub use balance::{AssetType, Balance, BalanceParseError};
pub use budget::Budget;
pub use ident::{ObjectId, ParseIdError, ID_LENGTH};
pub use state::{detect_amount, state_id, Impact, State};
pub use transaction::{transaction_id, Transaction};
