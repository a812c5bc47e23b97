//! wak-runtime
//!
//! Drives one add-accounts screen: owns the scan subscription, feeds scanner
//! messages through the session reducer, and commits the selection to the
//! repository.
//!
//! Single logical thread: the reconciler is `&mut self` everywhere, and each
//! message is reduced to completion before the next one is read.

mod import;
mod reconciler;

pub use import::{ImportFailure, ImportReport};
pub use reconciler::{ReconcilerSettings, ScanReconciler, StartError};
