//! wak-repo
//!
//! Local account repository boundary.
//!
//! Reads are synchronous snapshots (the add-accounts screen classifies on
//! every render); writes are async because a real store hits disk.
//!
//! Implementations:
//! - [`InMemoryAccountRepository`]: process-local, with a failure-injection
//!   seam for tests.
//! - [`JsonFileAccountRepository`]: a JSON array on disk, rewritten
//!   atomically on every persist.

mod json_file;
mod memory;

use std::fmt;

use async_trait::async_trait;
use wak_schemas::Account;

pub use json_file::JsonFileAccountRepository;
pub use memory::InMemoryAccountRepository;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Why a single account could not be persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PersistError {
    /// The store refused this account.
    Rejected { account_id: String, reason: String },
    /// Filesystem failure.
    Io(String),
    /// The store contents could not be encoded.
    Encode(String),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Rejected { account_id, reason } => {
                write!(f, "account {account_id} rejected: {reason}")
            }
            PersistError::Io(msg) => write!(f, "io error: {msg}"),
            PersistError::Encode(msg) => write!(f, "encode error: {msg}"),
        }
    }
}

impl std::error::Error for PersistError {}

// ---------------------------------------------------------------------------
// Repository trait
// ---------------------------------------------------------------------------

/// Store of accounts already imported into the wallet.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Snapshot of every stored account, in insertion order.
    fn list_existing(&self) -> Vec<Account>;

    /// Stored copy of the account with `id`, if any.
    fn get(&self, id: &str) -> Option<Account>;

    fn exists(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Insert `account`, replacing a stored account with the same id.
    async fn persist(&self, account: Account) -> Result<(), PersistError>;
}

/// Insert or replace by id, keeping the position of a replaced account.
pub(crate) fn upsert(accounts: &mut Vec<Account>, account: Account) {
    match accounts.iter_mut().find(|a| a.id == account.id) {
        Some(slot) => *slot = account,
        None => accounts.push(account),
    }
}
