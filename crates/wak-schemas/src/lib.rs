//! wak-schemas
//!
//! Shared data model for the add-accounts flow: accounts discovered on a
//! hardware device, their operation history, and the identifiers used to
//! address a scan (currency + device).
//!
//! Amounts are integer minor units (`u128`) so balances of chains with 18
//! decimals still fit without floats.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Currency identifier as understood by the device scanner (e.g. `"bitcoin"`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyId(pub String);

impl CurrencyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-level identifier of the connected device (e.g. `"usb:0"`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    In,
    Out,
    Fees,
}

/// A single entry of an account's transaction history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub hash: String,
    pub kind: OperationKind,
    /// Amount moved by this operation, in minor units.
    pub value: u128,
    pub date: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// An account as discovered on the device or stored locally.
///
/// `id` is stable across scans: the same derivation on the same device always
/// yields the same id, which is what lets a scan be matched against the local
/// repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub currency: CurrencyId,
    /// Derivation index on the device.
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub fresh_address: String,
    /// Balance in minor units.
    #[serde(default)]
    pub balance: u128,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Account {
    pub fn new(id: impl Into<String>, name: impl Into<String>, currency: CurrencyId) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            currency,
            index: 0,
            fresh_address: String::new(),
            balance: 0,
            operations: Vec::new(),
        }
    }

    pub fn with_balance(mut self, balance: u128) -> Self {
        self.balance = balance;
        self
    }

    pub fn with_operations(mut self, operations: Vec<Operation>) -> Self {
        self.operations = operations;
        self
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// An account is empty iff it has no operations and a zero balance.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.balance == 0
    }
}

// ---------------------------------------------------------------------------
// Scan failure
// ---------------------------------------------------------------------------

/// Terminal failure of a device scan (device unplugged, transport error, ...).
///
/// Cloneable so it can be kept in session state and shown to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanError {
    /// The device went away mid-scan.
    Disconnected,
    /// Communication with the device failed.
    Transport { message: String },
    /// The device answered with an error status word.
    Device { code: u16, message: String },
    /// The scan task ended without a terminal signal.
    Aborted,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Disconnected => write!(f, "device disconnected"),
            ScanError::Transport { message } => write!(f, "transport error: {message}"),
            ScanError::Device { code, message } => {
                write!(f, "device error 0x{code:04x}: {message}")
            }
            ScanError::Aborted => write!(f, "scan aborted before completion"),
        }
    }
}

impl std::error::Error for ScanError {}

/// Collect the ids of `accounts` in order.
pub fn account_ids(accounts: &[Account]) -> Vec<String> {
    accounts.iter().map(|a| a.id.clone()).collect()
}
