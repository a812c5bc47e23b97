use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use wak_schemas::Account;

use crate::{upsert, AccountRepository, PersistError};

/// Process-local repository.
///
/// Lock poisoning is recovered from: the guarded data is a plain list and is
/// never left half-updated by a panicking writer.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<Vec<Account>>,
    /// account id -> rejection reason
    rejections: RwLock<BTreeMap<String, String>>,
    /// every persist attempt, in call order
    persist_calls: Mutex<Vec<String>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
            ..Self::default()
        }
    }

    /// Make every future persist of `account_id` fail with `reason`.
    pub fn reject_persist(&self, account_id: impl Into<String>, reason: impl Into<String>) {
        self.rejections
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(account_id.into(), reason.into());
    }

    /// Ids passed to `persist`, in call order, including rejected ones.
    pub fn persist_calls(&self) -> Vec<String> {
        self.persist_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
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
        self.persist_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(account.id.clone());

        let rejection = self
            .rejections
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&account.id)
            .cloned();
        if let Some(reason) = rejection {
            return Err(PersistError::Rejected {
                account_id: account.id,
                reason,
            });
        }

        let mut accounts = self.accounts.write().unwrap_or_else(|e| e.into_inner());
        upsert(&mut accounts, account);
        Ok(())
    }
}
