//! JSON-file backed repository.
//!
//! File format: a JSON array of accounts. A missing file is an empty store.
//!
//! Every persist writes the whole array to `<path>.tmp` and renames it over
//! `<path>`; the in-memory copy is only updated after the rename succeeded, so
//! reads never observe an account the file does not hold.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use wak_schemas::Account;

use crate::{upsert, AccountRepository, PersistError};

#[derive(Debug)]
pub struct JsonFileAccountRepository {
    path: PathBuf,
    accounts: RwLock<Vec<Account>>,
    /// serializes writers across the await points of a persist
    write_lock: Mutex<()>,
}

impl JsonFileAccountRepository {
    /// Load the store at `path`. The file is created on first persist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let accounts = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read account store: {}", path.display()))?;
            if raw.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&raw).with_context(|| {
                    format!("invalid account store json: {}", path.display())
                })?
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            accounts: RwLock::new(accounts),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl AccountRepository for JsonFileAccountRepository {
    fn list_existing(&self) -> Vec<Account> {
        self.accounts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn get(&self, id: &str) -> Option<Account> {
        self.accounts
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    async fn persist(&self, account: Account) -> Result<(), PersistError> {
        let _guard = self.write_lock.lock().await;

        let mut next = self.list_existing();
        let account_id = account.id.clone();
        upsert(&mut next, account);

        let body =
            serde_json::to_vec_pretty(&next).map_err(|e| PersistError::Encode(e.to_string()))?;

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| PersistError::Io(format!("{}: {e}", tmp.display())))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PersistError::Io(format!("{}: {e}", self.path.display())))?;

        *self.accounts.write().unwrap_or_else(|e| e.into_inner()) = next;
        debug!(account_id = %account_id, path = %self.path.display(), "account persisted");
        Ok(())
    }
}
