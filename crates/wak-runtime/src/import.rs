use chrono::{DateTime, Utc};
use wak_repo::PersistError;
use wak_schemas::CurrencyId;

/// One account that could not be imported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportFailure {
    pub account_id: String,
    pub error: PersistError,
}

/// Outcome of committing a selection.
///
/// Import is a sequence of independent writes: one failure does not stop the
/// others, and both lists keep discovery order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportReport {
    pub currency: Option<CurrencyId>,
    pub imported: Vec<String>,
    pub failed: Vec<ImportFailure>,
    /// The session was still `Scanning` when the import was committed.
    pub while_scanning: bool,
    pub finished_at: DateTime<Utc>,
}

impl ImportReport {
    pub(crate) fn new(currency: Option<CurrencyId>) -> Self {
        Self {
            currency,
            imported: Vec::new(),
            failed: Vec::new(),
            while_scanning: false,
            finished_at: Utc::now(),
        }
    }

    /// `true` when every selected account was persisted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.imported.len() + self.failed.len()
    }
}
