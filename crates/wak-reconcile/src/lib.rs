//! wak-reconcile
//!
//! Scan-to-selection reconciliation core.
//!
//! - Session state is advanced only through [`reduce`]; every event is applied
//!   to completion and the function has no side effects.
//! - Discovered accounts are appended in emission order and auto-selected
//!   when non-empty and not already imported.
//! - Classification partitions scanned accounts into existing / new-empty /
//!   regular against a read-only view of imported accounts.
//!
//! Deterministic, pure logic. No IO. No device calls.

mod affordance;
mod classify;
mod engine;
mod types;

pub use affordance::{FooterAction, SectionVisibility};
pub use classify::{classify, Classification, KnownAccounts};
pub use engine::{reduce, SessionEvent};
pub use types::*;
