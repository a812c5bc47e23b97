//! Session reducer.
//!
//! # State diagram
//!
//! ```text
//!            Restarted (from any state)
//!     ┌───────────────────────────────────────┐
//!     ▼                                       │
//!  Scanning ──Completed──► Idle ──────────────┤
//!     │  │                                    │
//!     │  └─Stopped───────► Idle               │
//!     │                                       │
//!     └─────Failed───────► Error ─────────────┘
//! ```
//!
//! Discovery, completion, failure and stop events are only meaningful while
//! `Scanning`; outside it they leave the session unchanged. Selection events
//! apply in every state.

use wak_schemas::{Account, ScanError};

use crate::{ScanSession, ScanStatus};

/// Everything that can change a [`ScanSession`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// An account arrived from the scanner. `already_imported` is resolved
    /// against the repository at the moment of discovery.
    Discovered {
        account: Account,
        already_imported: bool,
    },
    /// The scanner finished normally.
    Completed,
    /// The scanner terminated with an error.
    Failed(ScanError),
    /// The user stopped the scan and the UI should settle to idle.
    Stopped,
    /// Flip selection of one account.
    Toggled(String),
    /// Add every id to the selection.
    SelectAll(Vec<String>),
    /// Remove every id from the selection.
    UnselectAll(Vec<String>),
    /// Discard all results and scan again.
    Restarted,
}

/// Apply `event` to `session`.
pub fn reduce(mut session: ScanSession, event: SessionEvent) -> ScanSession {
    use ScanStatus::*;
    use SessionEvent::*;

    match (session.status, event) {
        (
            Scanning,
            Discovered {
                account,
                already_imported,
            },
        ) => {
            if !account.is_empty() && !already_imported {
                session.selected_ids.insert(account.id.clone());
            }
            session.scanned_accounts.push(account);
        }

        (Scanning, Completed | Stopped) => session.status = Idle,

        (Scanning, Failed(err)) => {
            session.status = Error;
            session.error = Some(err);
        }

        // Late scan signals after the session settled: results are frozen.
        (Idle | Error, Discovered { .. } | Completed | Failed(_) | Stopped) => {}

        (_, Toggled(id)) => {
            if !session.selected_ids.remove(&id) {
                session.selected_ids.insert(id);
            }
        }

        (_, SelectAll(ids)) => session.selected_ids.extend(ids),

        (_, UnselectAll(ids)) => {
            for id in &ids {
                session.selected_ids.remove(id);
            }
        }

        (_, Restarted) => session = ScanSession::new(),
    }

    session
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
