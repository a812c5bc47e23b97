//! Scenario: JSON file repository persists across reopen.
//!
//! # Invariants under test
//!
//! 1. A missing file opens as an empty store.
//! 2. Persisted accounts are visible immediately and after reopening.
//! 3. Persisting an existing id replaces it in place (no duplicates).
//! 4. No `.tmp` file is left behind after a successful persist.
//! 5. A corrupt store file is reported with its path.
//! 6. A persist into a missing directory fails with `PersistError::Io` and
//!    leaves the in-memory view unchanged.

use wak_repo::{AccountRepository, JsonFileAccountRepository, PersistError};
use wak_schemas::{Account, CurrencyId};

fn acc(id: &str, balance: u128) -> Account {
    Account::new(id, format!("Account {id}"), CurrencyId::new("bitcoin")).with_balance(balance)
}

#[tokio::test]
async fn missing_file_is_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonFileAccountRepository::open(dir.path().join("accounts.json")).unwrap();
    assert!(repo.list_existing().is_empty());
    assert!(!repo.exists("anything"));
}

#[tokio::test]
async fn persisted_accounts_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accounts.json");

    {
        let repo = JsonFileAccountRepository::open(&path).unwrap();
        repo.persist(acc("a", 1)).await.unwrap();
        repo.persist(acc("b", 2)).await.unwrap();
        assert!(repo.exists("a"));
    }

    let reopened = JsonFileAccountRepository::open(&path).unwrap();
    let ids: Vec<String> = reopened.list_existing().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(reopened.get("b").unwrap().balance, 2);

    assert!(!dir.path().join("accounts.json.tmp").exists());
}

#[tokio::test]
async fn persisting_same_id_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accounts.json");
    let repo = JsonFileAccountRepository::open(&path).unwrap();

    repo.persist(acc("a", 1)).await.unwrap();
    repo.persist(acc("a", 99)).await.unwrap();

    let reopened = JsonFileAccountRepository::open(&path).unwrap();
    assert_eq!(reopened.list_existing().len(), 1);
    assert_eq!(reopened.get("a").unwrap().balance, 99);
}

#[test]
fn corrupt_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("accounts.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = JsonFileAccountRepository::open(&path).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("invalid account store json"), "got: {msg}");
    assert!(msg.contains("accounts.json"), "got: {msg}");
}

#[tokio::test]
async fn io_failure_leaves_view_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("accounts.json");
    let repo = JsonFileAccountRepository::open(&path).unwrap();

    let err = repo.persist(acc("a", 1)).await.unwrap_err();
    assert!(matches!(err, PersistError::Io(_)), "got: {err:?}");
    assert!(!repo.exists("a"));
}
