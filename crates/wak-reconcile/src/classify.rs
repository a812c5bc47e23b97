use std::collections::BTreeMap;

use serde::Serialize;
use wak_schemas::Account;

/// Read-only view of accounts already imported into the wallet.
pub trait KnownAccounts {
    /// Stored copy of the account with `id`, if imported.
    fn known(&self, id: &str) -> Option<Account>;

    fn is_known(&self, id: &str) -> bool {
        self.known(id).is_some()
    }
}

impl KnownAccounts for BTreeMap<String, Account> {
    fn known(&self, id: &str) -> Option<Account> {
        self.get(id).cloned()
    }
}

impl KnownAccounts for [Account] {
    fn known(&self, id: &str) -> Option<Account> {
        self.iter().find(|a| a.id == id).cloned()
    }
}

impl KnownAccounts for Vec<Account> {
    fn known(&self, id: &str) -> Option<Account> {
        self.as_slice().known(id)
    }
}

/// Scanned accounts split into the three groups shown to the user.
///
/// Each group keeps discovery order; together they cover the scanned list
/// exactly once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Already imported. Holds the stored copy, which may carry more history
    /// than the scanned one.
    pub existing: Vec<Account>,
    /// Empty and not imported: the slot offered for creating a new account.
    pub new_empty: Vec<Account>,
    /// Non-empty and not imported.
    pub regular: Vec<Account>,
    /// At least one empty account was scanned and every one of them is
    /// already imported, so no new account can be created.
    pub cant_create_account: bool,
    /// Nothing left to import.
    pub no_importable_accounts: bool,
    /// Stored copy of the first empty scanned account when
    /// `cant_create_account` holds; the UI names it in its message.
    pub cant_create_counterpart: Option<Account>,
}

impl Classification {
    pub fn total(&self) -> usize {
        self.existing.len() + self.new_empty.len() + self.regular.len()
    }
}

/// Partition `scanned` against `known`.
pub fn classify<K: KnownAccounts + ?Sized>(scanned: &[Account], known: &K) -> Classification {
    let mut out = Classification::default();
    let mut saw_empty = false;

    for account in scanned {
        if account.is_empty() {
            saw_empty = true;
        }
        match known.known(&account.id) {
            Some(stored) => out.existing.push(stored),
            None if account.is_empty() => out.new_empty.push(account.clone()),
            None => out.regular.push(account.clone()),
        }
    }

    out.cant_create_account = saw_empty && out.new_empty.is_empty();
    out.no_importable_accounts = out.regular.is_empty() && out.new_empty.is_empty();

    if out.cant_create_account {
        out.cant_create_counterpart = scanned
            .iter()
            .find(|a| a.is_empty())
            .and_then(|a| known.known(&a.id));
    }

    out
}
