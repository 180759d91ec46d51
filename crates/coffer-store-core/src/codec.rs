//! On-disk object records and their JSON codec.
//!
//! Stored objects are JSON documents. A transaction record carries its state
//! by identity, and a state record carries its accounts and budget by
//! identity; only `Accounts` and `Budget` store their content inline. The
//! identity of every object is computed over the canonical encoding defined
//! in `coffer-types`, never over these storage bytes, so the codec can
//! evolve without disturbing history.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use coffer_types::{
    state_id, transaction_id, Accounts, Balance, Budget, ObjectId, State, Transaction,
};

use crate::error::StoreError;

/// Stored form of a [`Transaction`], referencing its state by identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Identity of the resulting state.
    pub state: ObjectId,
    /// Parent transaction identities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<ObjectId>,
    /// Reported magnitude of the change.
    pub amount: Balance,
    /// The party funds moved to or from.
    #[serde(default)]
    pub merchant: String,
    /// Free-form notes.
    #[serde(default)]
    pub comment: String,
    /// Bank-assigned unique identifier, empty when none was supplied.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub record_id: String,
    /// When the underlying purchase or deposit happened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<DateTime<Utc>>,
    /// When the institution posted the change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_time: Option<DateTime<Utc>>,
    /// When the transaction was recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entered_time: Option<DateTime<Utc>>,
}

impl TransactionRecord {
    /// Captures a transaction's storable fields, snapshotting its state by
    /// identity.
    pub fn from_transaction(transaction: &Transaction) -> Self {
        TransactionRecord {
            state: transaction.state.id(),
            parents: transaction.parents.clone(),
            amount: transaction.amount.clone(),
            merchant: transaction.merchant.clone(),
            comment: transaction.comment.clone(),
            record_id: transaction.record_id.clone(),
            actual_time: transaction.actual_time,
            posted_time: transaction.posted_time,
            entered_time: transaction.entered_time,
        }
    }

    /// Rehydrates the full transaction once its state has been loaded.
    pub fn into_transaction(self, state: State) -> Transaction {
        Transaction {
            state,
            parents: self.parents,
            amount: self.amount,
            merchant: self.merchant,
            comment: self.comment,
            record_id: self.record_id,
            actual_time: self.actual_time,
            posted_time: self.posted_time,
            entered_time: self.entered_time,
        }
    }

    /// The identity this record serializes under.
    pub fn id(&self) -> ObjectId {
        transaction_id(
            self.state,
            &self.parents,
            &self.amount,
            &self.merchant,
            &self.comment,
            &self.record_id,
            self.actual_time,
            self.posted_time,
            self.entered_time,
        )
    }

    /// The first parent, if any.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }
}

/// Stored form of a [`State`], referencing both components by identity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Identity of the accounts listing.
    pub accounts: ObjectId,
    /// Identity of the budget tree.
    pub budget: ObjectId,
}

impl StateRecord {
    /// The identity this record serializes under.
    pub fn id(&self) -> ObjectId {
        state_id(self.accounts, self.budget)
    }
}

/// The union of storable object kinds, sharing one write path.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// A transaction record.
    Transaction(TransactionRecord),
    /// A state record.
    State(StateRecord),
    /// An accounts listing, stored inline.
    Accounts(Accounts),
    /// A budget tree, stored inline.
    Budget(Budget),
}

impl Object {
    /// The content-derived identity of the wrapped object.
    pub fn id(&self) -> ObjectId {
        match self {
            Object::Transaction(record) => record.id(),
            Object::State(record) => record.id(),
            Object::Accounts(accounts) => accounts.id(),
            Object::Budget(budget) => budget.id(),
        }
    }

    /// Serializes the object into its storage bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Object::Transaction(record) => encode(record),
            Object::State(record) => encode(record),
            Object::Accounts(accounts) => encode(accounts),
            Object::Budget(budget) => encode(budget),
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Vec<u8> {
    // Keys come out of BTreeMaps, so repeated encodes are byte-identical.
    serde_json::to_vec(value).expect("object records always serialize")
}

/// Decodes stored bytes as `T`, reporting failures as [`StoreError::CorruptObject`].
pub fn decode<T: DeserializeOwned>(id: ObjectId, bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|err| StoreError::corrupt(id, err))
}
