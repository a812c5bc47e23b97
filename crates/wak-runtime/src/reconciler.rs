//! Scan reconciler.
//!
//! # Lifecycle
//!
//! - [`ScanReconciler::mount`] is the screen being shown: a session is created
//!   in `Scanning` and the scan starts immediately.
//! - [`ScanReconciler::restart`] cancels the current scan *before* resetting
//!   the session, so nothing from the old subscription is ever reduced into
//!   the new one.
//! - [`ScanReconciler::dismiss`] (or dropping the reconciler) releases the
//!   subscription without touching session state.
//!
//! Scanner messages are only read through the owned [`ScanHandle`]; once it
//! is cancelled no further message can reach the session.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;
use wak_reconcile::{
    classify, reduce, Classification, FooterAction, KnownAccounts, ScanSession, ScanStatus,
    SectionVisibility, SessionEvent,
};
use wak_repo::AccountRepository;
use wak_scan::{AccountScanner, ScanHandle, ScanMessage, TryNext, DEFAULT_CHANNEL_CAPACITY};
use wak_schemas::{account_ids, Account, CurrencyId, DeviceId, ScanError};

use crate::import::{ImportFailure, ImportReport};

// ---------------------------------------------------------------------------
// Settings / errors
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Messages buffered between the scan task and the reconciler.
    pub channel_capacity: usize,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartError {
    /// A scan is already running for this session.
    AlreadyScanning,
    /// `retry` was called before any scan was started.
    NoTarget,
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartError::AlreadyScanning => write!(f, "a scan is already active"),
            StartError::NoTarget => write!(f, "no previous scan target to retry"),
        }
    }
}

impl std::error::Error for StartError {}

/// Repository seen through the classification interface.
struct RepoView<'a>(&'a dyn AccountRepository);

impl KnownAccounts for RepoView<'_> {
    fn known(&self, id: &str) -> Option<Account> {
        self.0.get(id)
    }

    fn is_known(&self, id: &str) -> bool {
        self.0.exists(id)
    }
}

// ---------------------------------------------------------------------------
// ScanReconciler
// ---------------------------------------------------------------------------

pub struct ScanReconciler {
    scanner: Arc<dyn AccountScanner>,
    repo: Arc<dyn AccountRepository>,
    settings: ReconcilerSettings,
    session: ScanSession,
    handle: Option<ScanHandle>,
    scan_id: Option<Uuid>,
    target: Option<(CurrencyId, DeviceId)>,
}

impl fmt::Debug for ScanReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanReconciler")
            .field("scanner", &self.scanner.name())
            .field("settings", &self.settings)
            .field("status", &self.session.status)
            .field("scanned", &self.session.scanned_accounts.len())
            .field("selected", &self.session.selected_ids.len())
            .field("scan_active", &self.is_scan_active())
            .field("scan_id", &self.scan_id)
            .finish()
    }
}

impl ScanReconciler {
    /// A reconciler with a fresh session and no scan running yet.
    pub fn new(
        scanner: Arc<dyn AccountScanner>,
        repo: Arc<dyn AccountRepository>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            scanner,
            repo,
            settings,
            session: ScanSession::new(),
            handle: None,
            scan_id: None,
            target: None,
        }
    }

    /// Create the reconciler and start scanning right away.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn mount(
        scanner: Arc<dyn AccountScanner>,
        repo: Arc<dyn AccountRepository>,
        settings: ReconcilerSettings,
        currency: CurrencyId,
        device: DeviceId,
    ) -> Self {
        let mut me = Self::new(scanner, repo, settings);
        me.spawn_scan(currency, device);
        me
    }

    // -- read side ----------------------------------------------------------

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn status(&self) -> ScanStatus {
        self.session.status
    }

    /// `true` while a subscription is held.
    pub fn is_scan_active(&self) -> bool {
        self.handle.as_ref().is_some_and(ScanHandle::is_active)
    }

    /// Id of the current (or last) scan attempt.
    pub fn scan_id(&self) -> Option<Uuid> {
        self.scan_id
    }

    pub fn target(&self) -> Option<(&CurrencyId, &DeviceId)> {
        self.target.as_ref().map(|(c, d)| (c, d))
    }

    /// Partition the scanned accounts against the repository.
    pub fn classify(&self) -> Classification {
        classify(
            &self.session.scanned_accounts,
            &RepoView(self.repo.as_ref()),
        )
    }

    pub fn footer_action(&self) -> FooterAction {
        FooterAction::derive(&self.session, &self.classify())
    }

    pub fn sections(&self) -> SectionVisibility {
        SectionVisibility::derive(&self.session, &self.classify())
    }

    // -- scan lifecycle -----------------------------------------------------

    /// Begin scanning `currency` on `device`.
    ///
    /// Results left over from a previous scan are discarded first.
    pub fn start(&mut self, currency: CurrencyId, device: DeviceId) -> Result<(), StartError> {
        if self.is_scan_active() {
            return Err(StartError::AlreadyScanning);
        }
        if self.session != ScanSession::new() {
            self.dispatch(SessionEvent::Restarted);
        }
        self.spawn_scan(currency, device);
        Ok(())
    }

    /// Cancel any running scan, clear all results and scan again.
    pub fn restart(&mut self, currency: CurrencyId, device: DeviceId) {
        self.release_subscription();
        self.dispatch(SessionEvent::Restarted);
        info!(currency = %currency, device = %device, "scan restart requested");
        self.spawn_scan(currency, device);
    }

    /// Restart against the last target (the UI retry control).
    pub fn retry(&mut self) -> Result<(), StartError> {
        let (currency, device) = self.target.clone().ok_or(StartError::NoTarget)?;
        self.restart(currency, device);
        Ok(())
    }

    /// Cancel the running scan, if any.
    ///
    /// With `commit_status` a running session settles to `Idle`; without it
    /// the status is left as is (teardown, nothing will render it again).
    /// Calling this with no scan running is a no-op apart from the commit.
    pub fn stop(&mut self, commit_status: bool) {
        self.release_subscription();
        if commit_status {
            self.dispatch(SessionEvent::Stopped);
        }
    }

    /// The screen is going away: release the subscription, keep the state.
    pub fn dismiss(mut self) -> ScanSession {
        self.stop(false);
        std::mem::take(&mut self.session)
    }

    // -- event pumping ------------------------------------------------------

    /// Wait for one scanner message and reduce it.
    ///
    /// Returns `false` when there is no subscription to read from.
    pub async fn advance(&mut self) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        let next = handle.next().await;
        match next {
            Some(msg) => {
                self.apply_message(msg);
                true
            }
            None => {
                self.on_closed();
                false
            }
        }
    }

    /// Reduce every message already buffered, without waiting.
    ///
    /// Returns how many messages were applied.
    pub fn pump_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(handle) = self.handle.as_mut() {
            let next = handle.try_next();
            match next {
                TryNext::Ready(msg) => {
                    self.apply_message(msg);
                    applied += 1;
                }
                TryNext::Empty => break,
                TryNext::Closed => {
                    self.on_closed();
                    break;
                }
            }
        }
        applied
    }

    /// Drive the scan until it terminates or is cancelled.
    pub async fn run_to_end(&mut self) -> ScanStatus {
        while self.advance().await {}
        self.session.status
    }

    // -- selection ----------------------------------------------------------

    pub fn toggle_select(&mut self, account_id: impl Into<String>) {
        self.dispatch(SessionEvent::Toggled(account_id.into()));
    }

    pub fn select_all(&mut self, accounts: &[Account]) {
        self.dispatch(SessionEvent::SelectAll(account_ids(accounts)));
    }

    pub fn unselect_all(&mut self, accounts: &[Account]) {
        self.dispatch(SessionEvent::UnselectAll(account_ids(accounts)));
    }

    // -- import -------------------------------------------------------------

    /// Persist every selected scanned account, in discovery order.
    ///
    /// Failures are collected per account; the remaining accounts are still
    /// attempted. Importing while the session is `Scanning` is allowed but
    /// logged.
    pub async fn commit_import(&self) -> ImportReport {
        let currency = self.target.as_ref().map(|(c, _)| c.clone());
        let mut report = ImportReport::new(currency);

        if self.session.is_scanning() {
            warn!(
                scan_id = ?self.scan_id,
                scan_active = self.is_scan_active(),
                "import requested while session is still scanning"
            );
            report.while_scanning = true;
        }

        for account in self.session.selected_accounts() {
            let account_id = account.id.clone();
            match self.repo.persist(account.clone()).await {
                Ok(()) => {
                    debug!(account_id = %account_id, "account imported");
                    report.imported.push(account_id);
                }
                Err(error) => {
                    warn!(account_id = %account_id, error = %error, "account import failed");
                    report.failed.push(ImportFailure { account_id, error });
                }
            }
        }

        report.finished_at = chrono::Utc::now();
        info!(
            imported = report.imported.len(),
            failed = report.failed.len(),
            "import committed"
        );
        report
    }

    // -- internals ----------------------------------------------------------

    fn spawn_scan(&mut self, currency: CurrencyId, device: DeviceId) {
        let scan_id = Uuid::new_v4();
        let stream = self.scanner.scan(&currency, &device);
        self.handle = Some(ScanHandle::spawn(stream, self.settings.channel_capacity));
        self.scan_id = Some(scan_id);
        info!(
            scan_id = %scan_id,
            scanner = self.scanner.name(),
            currency = %currency,
            device = %device,
            "scan started"
        );
        self.target = Some((currency, device));
    }

    fn release_subscription(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            if handle.cancel() {
                info!(
                    scan_id = ?self.scan_id,
                    scanned = self.session.scanned_accounts.len(),
                    "scan stopped"
                );
            }
        }
    }

    fn apply_message(&mut self, msg: ScanMessage) {
        let event = match msg {
            ScanMessage::Discovered(account) => {
                let already_imported = self.repo.exists(&account.id);
                debug!(
                    scan_id = ?self.scan_id,
                    account_id = %account.id,
                    empty = account.is_empty(),
                    already_imported,
                    "account discovered"
                );
                SessionEvent::Discovered {
                    account,
                    already_imported,
                }
            }
            ScanMessage::Completed => {
                self.handle = None;
                info!(
                    scan_id = ?self.scan_id,
                    scanned = self.session.scanned_accounts.len(),
                    "scan completed"
                );
                SessionEvent::Completed
            }
            ScanMessage::Failed(err) => {
                self.handle = None;
                warn!(scan_id = ?self.scan_id, error = %err, "scan failed");
                SessionEvent::Failed(err)
            }
        };
        self.dispatch(event);
    }

    /// The subscription closed without a terminal message.
    fn on_closed(&mut self) {
        self.handle = None;
        warn!(scan_id = ?self.scan_id, "scan task ended without a terminal signal");
        self.dispatch(SessionEvent::Failed(ScanError::Aborted));
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let session = std::mem::take(&mut self.session);
        self.session = reduce(session, event);
    }
}
