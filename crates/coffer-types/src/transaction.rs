//! Transactions, the commits of the ledger's history.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::balance::Balance;
use crate::ident::{hash_object, ObjectId};
use crate::state::State;

/// A committed change, linking a new [`State`] to the transactions it came
/// from.
///
/// An initial transaction has no parents, an ordinary one has a single
/// parent, and a merge lists every history it reconciles. Timestamps that
/// were never recorded are `None`; the serialization layer is the only place
/// an absent time takes a sentinel form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transaction {
    /// The resulting snapshot.
    pub state: State,
    /// Parent transaction identities, oldest history first.
    pub parents: Vec<ObjectId>,
    /// The reported magnitude of this change.
    pub amount: Balance,
    /// The party funds moved to or from.
    pub merchant: String,
    /// Free-form notes.
    pub comment: String,
    /// Bank-assigned unique identifier, empty when none was supplied.
    pub record_id: String,
    /// When the underlying purchase or deposit happened.
    pub actual_time: Option<DateTime<Utc>>,
    /// When the institution posted the change.
    pub posted_time: Option<DateTime<Utc>>,
    /// When the transaction was recorded here.
    pub entered_time: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Content-derived identity covering the state identity, parents,
    /// amount, descriptive fields, and timestamps.
    pub fn id(&self) -> ObjectId {
        transaction_id(
            self.state.id(),
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

    /// True when this transaction reconciles more than one history.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// The first parent, if any.
    pub fn parent(&self) -> Option<ObjectId> {
        self.parents.first().copied()
    }
}

/// Computes a transaction identity from its canonical fields.
///
/// Shared with the storage layer, where a stored record carries the state by
/// identity rather than by value.
#[allow(clippy::too_many_arguments)]
pub fn transaction_id(
    state: ObjectId,
    parents: &[ObjectId],
    amount: &Balance,
    merchant: &str,
    comment: &str,
    record_id: &str,
    actual_time: Option<DateTime<Utc>>,
    posted_time: Option<DateTime<Utc>>,
    entered_time: Option<DateTime<Utc>>,
) -> ObjectId {
    let mut body = String::new();
    body.push_str("state ");
    body.push_str(&state.to_hex());
    body.push('\n');
    for parent in parents {
        body.push_str("parent ");
        body.push_str(&parent.to_hex());
        body.push('\n');
    }
    body.push_str("amount ");
    body.push_str(&amount.canonical_encoding());
    body.push('\n');
    body.push_str("merchant ");
    body.push_str(merchant);
    body.push('\n');
    body.push_str("comment ");
    body.push_str(comment);
    body.push('\n');
    body.push_str("record ");
    body.push_str(record_id);
    body.push('\n');
    body.push_str("actual ");
    body.push_str(&canonical_time(actual_time));
    body.push('\n');
    body.push_str("posted ");
    body.push_str(&canonical_time(posted_time));
    body.push('\n');
    body.push_str("entered ");
    body.push_str(&canonical_time(entered_time));
    body.push('\n');
    hash_object("transaction", &body)
}

/// RFC 3339 at nanosecond precision in UTC; unset times encode empty.
fn canonical_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Nanos, true))
        .unwrap_or_default()
}
