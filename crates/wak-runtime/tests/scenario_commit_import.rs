//! Scenario: committing the selection.
//!
//! # Invariants under test
//!
//! 1. Only selected accounts are persisted, in discovery order, regardless of
//!    the order they were selected in.
//! 2. A rejected account does not stop the others; the report lists it with
//!    its error and `is_complete()` is false.
//! 3. After import into the JSON store, a fresh scan classifies the imported
//!    accounts as existing and does not auto-select them.
//! 4. An empty selection persists nothing.
//! 5. Importing while the session is still `Scanning` is allowed and flagged
//!    on the report, including after a teardown stop that released the
//!    subscription but left the status untouched.

use std::sync::Arc;

use wak_reconcile::ScanStatus;
use wak_repo::{
    AccountRepository, InMemoryAccountRepository, JsonFileAccountRepository, PersistError,
};
use wak_runtime::{ReconcilerSettings, ScanReconciler};
use wak_scan::{ScanScript, ScriptedScanner};
use wak_schemas::{Account, CurrencyId, DeviceId};

fn btc() -> CurrencyId {
    CurrencyId::new("bitcoin")
}

fn acc(id: &str, balance: u128) -> Account {
    Account::new(id, format!("Bitcoin {id}"), btc()).with_balance(balance)
}

async fn scanned(accounts: Vec<Account>, repo: Arc<dyn AccountRepository>) -> ScanReconciler {
    let mut r = ScanReconciler::mount(
        Arc::new(ScriptedScanner::new(ScanScript::completing(accounts))),
        repo,
        ReconcilerSettings::default(),
        btc(),
        DeviceId::new("usb:0"),
    );
    r.run_to_end().await;
    r
}

#[tokio::test]
async fn persists_selection_in_discovery_order() {
    let repo = Arc::new(InMemoryAccountRepository::new());
    let accounts = vec![acc("a", 1), acc("b", 0), acc("c", 3), acc("d", 4)];
    let mut r = scanned(accounts.clone(), repo.clone()).await;

    // auto-selected: a, c, d. Drop a, add b by hand after d.
    r.toggle_select("a");
    r.toggle_select("b");

    let report = r.commit_import().await;
    assert!(report.is_complete());
    assert_eq!(report.imported, vec!["b", "c", "d"]);
    assert_eq!(report.attempted(), 3);
    assert_eq!(report.currency, Some(btc()));
    assert_eq!(repo.persist_calls(), vec!["b", "c", "d"]);

    let stored: Vec<String> = repo.list_existing().into_iter().map(|a| a.id).collect();
    assert_eq!(stored, vec!["b", "c", "d"]);
}

#[tokio::test]
async fn partial_failure_keeps_going() {
    let repo = Arc::new(InMemoryAccountRepository::new());
    repo.reject_persist("b", "device locked");
    let mut r = scanned(vec![acc("a", 1), acc("b", 2), acc("c", 3)], repo.clone()).await;
    let all = r.session().scanned_accounts.clone();
    r.select_all(&all);

    let report = r.commit_import().await;
    assert!(!report.is_complete());
    assert_eq!(report.imported, vec!["a", "c"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].account_id, "b");
    assert_eq!(
        report.failed[0].error,
        PersistError::Rejected {
            account_id: "b".to_string(),
            reason: "device locked".to_string(),
        }
    );
    assert_eq!(repo.persist_calls(), vec!["a", "b", "c"]);
    assert!(repo.exists("a"));
    assert!(!repo.exists("b"));
}

#[tokio::test]
async fn empty_selection_imports_nothing() {
    let repo = Arc::new(InMemoryAccountRepository::new());
    let mut r = scanned(vec![acc("a", 1), acc("b", 2)], repo.clone()).await;
    let all = r.session().scanned_accounts.clone();
    r.unselect_all(&all);

    let report = r.commit_import().await;
    assert!(report.is_complete());
    assert_eq!(report.attempted(), 0);
    assert!(repo.persist_calls().is_empty());
}

#[tokio::test]
async fn imported_accounts_are_existing_on_next_scan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accounts.json");
    let accounts = vec![acc("a", 0), acc("b", 5)];

    {
        let repo = Arc::new(JsonFileAccountRepository::open(&path).unwrap());
        let mut r = scanned(accounts.clone(), repo).await;
        r.toggle_select("a");
        let report = r.commit_import().await;
        assert_eq!(report.imported, vec!["a", "b"]);
    }

    let repo = Arc::new(JsonFileAccountRepository::open(&path).unwrap());
    let r = scanned(accounts, repo).await;

    assert!(r.session().selected_ids.is_empty(), "nothing auto-selected");
    let cls = r.classify();
    assert_eq!(cls.existing.len(), 2);
    assert!(cls.new_empty.is_empty());
    assert!(cls.regular.is_empty());
    assert!(cls.cant_create_account);
}

#[tokio::test]
async fn import_after_teardown_stop_is_flagged_as_scanning() {
    let repo = Arc::new(InMemoryAccountRepository::new());
    let (scanner, gate) =
        ScriptedScanner::gated(ScanScript::completing(vec![acc("a", 1), acc("b", 2)]));
    let mut r = ScanReconciler::mount(
        Arc::new(scanner),
        repo.clone(),
        ReconcilerSettings::default(),
        btc(),
        DeviceId::new("usb:0"),
    );

    gate.release(1);
    assert!(r.advance().await);
    r.stop(false);
    assert!(!r.is_scan_active());
    assert_eq!(r.status(), ScanStatus::Scanning);

    let report = r.commit_import().await;
    assert!(report.while_scanning);
    assert_eq!(report.imported, vec!["a"]);
    assert_eq!(repo.persist_calls(), vec!["a"]);
}

#[tokio::test]
async fn import_after_completion_is_not_flagged() {
    let repo = Arc::new(InMemoryAccountRepository::new());
    let r = scanned(vec![acc("a", 1)], repo).await;
    assert_eq!(r.status(), ScanStatus::Idle);

    let report = r.commit_import().await;
    assert!(!report.while_scanning);
    assert_eq!(report.imported, vec!["a"]);
}
