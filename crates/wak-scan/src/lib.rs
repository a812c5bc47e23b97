//! wak-scan
//!
//! Device scanner boundary for the add-accounts flow.
//!
//! - [`AccountScanner`] is the contract a device bridge implements: a stream
//!   of discovered accounts ending in exactly one terminal signal.
//! - [`ScanHandle`] owns a running scan as a cancellable task. Cancelling is
//!   synchronous: once `cancel` returns, no further message is observable.
//! - [`ScriptedScanner`] replays a fixed script and is the deterministic
//!   stand-in used by tests and the CLI.
//!
//! This crate does not classify accounts or touch the repository.

mod handle;
mod scripted;

use futures_util::stream::BoxStream;
use wak_schemas::{Account, CurrencyId, DeviceId, ScanError};

pub use handle::{ScanHandle, ScanMessage, TryNext, DEFAULT_CHANNEL_CAPACITY};
pub use scripted::{ScanGate, ScanScript, ScriptedScanner};

/// Stream of scan results. The first `Err` is terminal; a clean end of stream
/// means the scan completed.
pub type AccountStream = BoxStream<'static, Result<Account, ScanError>>;

/// Device account scanner contract.
///
/// Implementations must be object-safe so the runtime can hold an
/// `Arc<dyn AccountScanner>`, and `Send + Sync` so scans can be spawned onto
/// the tokio runtime.
pub trait AccountScanner: Send + Sync {
    /// Human-readable name of this scanner (e.g. `"scripted"`).
    fn name(&self) -> &'static str;

    /// Start enumerating accounts of `currency` on `device`.
    ///
    /// Dropping the returned stream must halt emission.
    fn scan(&self, currency: &CurrencyId, device: &DeviceId) -> AccountStream;
}
