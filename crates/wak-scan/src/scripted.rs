//! Deterministic scripted scanner.
//!
//! Replays a fixed [`ScanScript`] every time a scan is started:
//! - only accounts whose currency matches the requested one are emitted,
//!   in script order;
//! - the optional `error` is emitted after the last account instead of
//!   completing;
//! - no randomness. Timing is controlled either by `delay_ms` or by a
//!   [`ScanGate`] that releases one item per permit.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use wak_schemas::{Account, CurrencyId, DeviceId, ScanError};

use crate::{AccountScanner, AccountStream};

/// What a scripted scan emits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanScript {
    pub accounts: Vec<Account>,
    /// Terminal failure emitted after the accounts. `None` means completion.
    #[serde(default)]
    pub error: Option<ScanError>,
    /// Pause before each emitted item.
    #[serde(default)]
    pub delay_ms: u64,
}

impl ScanScript {
    pub fn completing(accounts: Vec<Account>) -> Self {
        Self {
            accounts,
            error: None,
            delay_ms: 0,
        }
    }

    pub fn failing(accounts: Vec<Account>, error: ScanError) -> Self {
        Self {
            accounts,
            error: Some(error),
            delay_ms: 0,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("invalid scan script json")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scan script: {}", path.display()))?;
        Self::from_json_str(&raw)
    }
}

/// Releases gated scan items one permit at a time.
#[derive(Clone, Debug)]
pub struct ScanGate {
    permits: Arc<Semaphore>,
}

impl ScanGate {
    /// Allow `n` more items (accounts or the terminal error) to be emitted.
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

/// Scanner replaying a [`ScanScript`].
#[derive(Debug)]
pub struct ScriptedScanner {
    script: ScanScript,
    gate: Option<Arc<Semaphore>>,
    scans_started: AtomicUsize,
}

impl ScriptedScanner {
    pub fn new(script: ScanScript) -> Self {
        Self {
            script,
            gate: None,
            scans_started: AtomicUsize::new(0),
        }
    }

    /// A scanner whose items are only emitted as permits are released through
    /// the returned gate. The gate is shared by every scan started.
    pub fn gated(script: ScanScript) -> (Self, ScanGate) {
        let permits = Arc::new(Semaphore::new(0));
        let scanner = Self {
            script,
            gate: Some(Arc::clone(&permits)),
            scans_started: AtomicUsize::new(0),
        };
        (scanner, ScanGate { permits })
    }

    /// Number of times `scan` was called.
    pub fn scans_started(&self) -> usize {
        self.scans_started.load(Ordering::SeqCst)
    }
}

impl AccountScanner for ScriptedScanner {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn scan(&self, currency: &CurrencyId, _device: &DeviceId) -> AccountStream {
        self.scans_started.fetch_add(1, Ordering::SeqCst);

        let mut items: Vec<Result<Account, ScanError>> = self
            .script
            .accounts
            .iter()
            .filter(|a| &a.currency == currency)
            .cloned()
            .map(Ok)
            .collect();
        if let Some(err) = self.script.error.clone() {
            items.push(Err(err));
        }

        let gate = self.gate.clone();
        let delay = Duration::from_millis(self.script.delay_ms);

        stream::iter(items)
            .then(move |item| {
                let gate = gate.clone();
                async move {
                    if let Some(gate) = gate {
                        // the gate semaphore is never closed
                        if let Ok(permit) = gate.acquire().await {
                            permit.forget();
                        }
                    }
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    item
                }
            })
            .boxed()
    }
}
