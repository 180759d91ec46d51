//! Refspec parsing and resolution.
//!
//! A refspec is the user-facing way to name a transaction. The grammar, in
//! match priority order:
//!
//! | Form          | Meaning                                            |
//! |---------------|----------------------------------------------------|
//! | 40 hex chars  | a literal identity                                 |
//! | `HEAD`        | the currently checked-out transaction              |
//! | branch name   | the identity the branch points at                  |
//! | `<spec>^`     | first parent of `<spec>`                           |
//! | `<spec>~N`    | N-th first-parent ancestor of `<spec>` (`~0` self) |
//!
//! Operators chain left to right, so `x~1~1`, `x^^`, and `x~2` agree. Once a
//! form matches, resolution never falls back to another interpretation.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use coffer_types::ObjectId;

use crate::backend::StorageBackend;
use crate::error::StoreError;
use crate::repository::Repository;

/// The alias naming the currently checked-out transaction.
pub const HEAD_ALIAS: &str = "HEAD";

/// The branch a fresh repository starts on.
pub const DEFAULT_BRANCH: &str = "main";

/// Ceiling on recursive resolution steps, guarding against a current
/// pointer that names itself.
const MAX_RESOLUTION_DEPTH: u32 = 32;

/// A string that is attempting to name a particular transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefSpec(String);

impl RefSpec {
    /// Wraps user-supplied text.
    pub fn new(text: impl Into<String>) -> Self {
        RefSpec(text.into())
    }

    /// The refspec naming the current transaction.
    pub fn head() -> Self {
        RefSpec(HEAD_ALIAS.to_string())
    }

    /// The raw text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RefSpec {
    fn from(text: &str) -> Self {
        RefSpec::new(text)
    }
}

impl From<String> for RefSpec {
    fn from(text: String) -> Self {
        RefSpec(text)
    }
}

impl From<ObjectId> for RefSpec {
    fn from(id: ObjectId) -> Self {
        RefSpec(id.to_hex())
    }
}

impl<B: StorageBackend> Repository<B> {
    /// Resolves a refspec to the transaction identity it names.
    ///
    /// Fails with [`StoreError::InvalidRefspec`] when no grammar form
    /// matches or when an ancestor step walks past the initial transaction.
    pub async fn resolve(
        &self,
        refspec: &RefSpec,
        token: &CancellationToken,
    ) -> Result<ObjectId, StoreError> {
        self.resolve_step(refspec.as_str().to_string(), token, 0).await
    }

    fn resolve_step<'a>(
        &'a self,
        text: String,
        token: &'a CancellationToken,
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = Result<ObjectId, StoreError>> + Send + 'a>> {
        Box::pin(async move {
            Self::ensure_live(token)?;
            if depth > MAX_RESOLUTION_DEPTH {
                return Err(StoreError::InvalidRefspec(text));
            }

            if is_hex_id(&text) {
                return text
                    .parse()
                    .map_err(|_| StoreError::InvalidRefspec(text));
            }

            if text == HEAD_ALIAS {
                let current = self.backend().current().await?;
                return self.resolve_step(current, token, depth + 1).await;
            }

            if let Some(id) = self.try_read_branch(&text, token).await? {
                return Ok(id);
            }

            if let Some(prefix) = text.strip_suffix('^') {
                let base = self.resolve_step(prefix.to_string(), token, depth + 1).await?;
                return self.ancestor(base, 1, &text, token).await;
            }

            if let Some((prefix, jumps)) = split_tilde(&text) {
                let base = self.resolve_step(prefix.to_string(), token, depth + 1).await?;
                return self.ancestor(base, jumps, &text, token).await;
            }

            Err(StoreError::InvalidRefspec(text))
        })
    }

    /// Walks `jumps` steps up the first-parent chain from `id`.
    async fn ancestor(
        &self,
        mut id: ObjectId,
        jumps: u64,
        refspec: &str,
        token: &CancellationToken,
    ) -> Result<ObjectId, StoreError> {
        for _ in 0..jumps {
            Self::ensure_live(token)?;
            if id.is_null() {
                return Err(StoreError::InvalidRefspec(refspec.to_string()));
            }
            let record = self
                .load_transaction_record(id, token)
                .await
                .map_err(|err| match err {
                    StoreError::NotFound(_) => StoreError::InvalidRefspec(refspec.to_string()),
                    other => other,
                })?;
            id = match record.parent() {
                Some(parent) if !parent.is_null() => parent,
                _ => return Err(StoreError::InvalidRefspec(refspec.to_string())),
            };
        }
        Ok(id)
    }
}

fn is_hex_id(text: &str) -> bool {
    text.len() == 40 && text.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Splits a trailing `~N` operator off a refspec, if one is present.
fn split_tilde(text: &str) -> Option<(&str, u64)> {
    let idx = text.rfind('~')?;
    if idx == 0 {
        return None;
    }
    let digits = &text[idx + 1..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((&text[..idx], digits.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_detection() {
        assert!(is_hex_id(&"ab".repeat(20)));
        assert!(!is_hex_id("abc"));
        assert!(!is_hex_id(&"zz".repeat(20)));
    }

    #[test]
    fn tilde_splitting() {
        assert_eq!(split_tilde("main~3"), Some(("main", 3)));
        assert_eq!(split_tilde("main~1~2"), Some(("main~1", 2)));
        assert_eq!(split_tilde("main~"), None);
        assert_eq!(split_tilde("main~x"), None);
        assert_eq!(split_tilde("~3"), None);
        assert_eq!(split_tilde("main"), None);
    }
}
