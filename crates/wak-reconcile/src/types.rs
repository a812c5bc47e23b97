use std::collections::BTreeSet;

use serde::Serialize;
use wak_schemas::{Account, ScanError};

/// Lifecycle status of a scan session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    /// No scan running; results are frozen.
    Idle,
    /// A scan is (or is about to be) delivering accounts.
    Scanning,
    /// The last scan failed. Only a restart leaves this state.
    Error,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Idle => "idle",
            ScanStatus::Scanning => "scanning",
            ScanStatus::Error => "error",
        }
    }
}

/// Working state of the add-accounts screen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScanSession {
    pub status: ScanStatus,
    /// Discovery order. Only grows while `status == Scanning`.
    pub scanned_accounts: Vec<Account>,
    pub selected_ids: BTreeSet<String>,
    /// Present only in `Error`.
    pub error: Option<ScanError>,
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSession {
    /// A fresh session. Scanning starts as soon as the screen is shown, so
    /// the initial status is `Scanning`.
    pub fn new() -> Self {
        Self {
            status: ScanStatus::Scanning,
            scanned_accounts: Vec::new(),
            selected_ids: BTreeSet::new(),
            error: None,
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.status == ScanStatus::Scanning
    }

    pub fn is_selected(&self, account_id: &str) -> bool {
        self.selected_ids.contains(account_id)
    }

    /// Scanned accounts that are selected, in discovery order.
    pub fn selected_accounts(&self) -> impl Iterator<Item = &Account> {
        self.scanned_accounts
            .iter()
            .filter(|a| self.selected_ids.contains(&a.id))
    }

    pub fn scanned_ids(&self) -> Vec<String> {
        wak_schemas::account_ids(&self.scanned_accounts)
    }
}
