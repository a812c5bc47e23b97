//! What the add-accounts screen may offer the user, derived from session
//! state and classification. Rendering is not this crate's concern; these
//! values only decide which controls exist.

use serde::Serialize;

use crate::{Classification, ScanSession, ScanStatus};

/// The single primary action shown in the footer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FooterAction {
    /// A scan is running: offer to stop it.
    StopScanning,
    /// Nothing importable and nothing blocking creation: scan again.
    Retry,
    /// Every empty account already exists: leave the flow.
    Done,
    /// Import the selection. Disabled while nothing is selected.
    Import { enabled: bool },
}

impl FooterAction {
    pub fn derive(session: &ScanSession, classification: &Classification) -> Self {
        if session.status == ScanStatus::Scanning {
            FooterAction::StopScanning
        } else if classification.no_importable_accounts && !classification.cant_create_account {
            FooterAction::Retry
        } else if classification.cant_create_account {
            FooterAction::Done
        } else {
            FooterAction::Import {
                enabled: !session.selected_ids.is_empty(),
            }
        }
    }
}

/// Which account sections and banners are visible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SectionVisibility {
    pub show_regular: bool,
    /// "Synchronizing" hint shown in place of an empty regular list.
    pub show_syncing_hint: bool,
    pub show_new_accounts: bool,
    pub show_existing: bool,
    /// Error banner with a retry control.
    pub show_retry_banner: bool,
}

impl SectionVisibility {
    pub fn derive(session: &ScanSession, classification: &Classification) -> Self {
        let scanning = session.status == ScanStatus::Scanning;
        Self {
            show_regular: !classification.regular.is_empty(),
            show_syncing_hint: classification.regular.is_empty() && scanning,
            show_new_accounts: !classification.new_empty.is_empty()
                || session.status == ScanStatus::Idle,
            show_existing: !classification.existing.is_empty(),
            show_retry_banner: session.status == ScanStatus::Error && session.error.is_some(),
        }
    }
}
