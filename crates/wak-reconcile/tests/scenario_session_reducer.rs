//! Scenario: session reducer over discovery sequences.
//!
//! # Invariants under test
//!
//! 1. `scanned_accounts` equals the discovered accounts in emission order.
//! 2. An account is auto-selected iff it is non-empty and was not already
//!    imported when discovered.
//! 3. Results freeze once the session leaves `Scanning`.
//! 4. `Restarted` always yields an empty `Scanning` session.
//! 5. A failure does not touch the selection.

use wak_reconcile::{reduce, ScanSession, ScanStatus, SessionEvent};
use wak_schemas::{Account, CurrencyId, ScanError};

fn acc(id: &str, balance: u128) -> Account {
    Account::new(id, id, CurrencyId::new("bitcoin")).with_balance(balance)
}

fn discover(session: ScanSession, account: Account, already_imported: bool) -> ScanSession {
    reduce(
        session,
        SessionEvent::Discovered {
            account,
            already_imported,
        },
    )
}

#[test]
fn emission_order_is_preserved_without_drops() {
    let mut s = ScanSession::new();
    let emitted: Vec<Account> = (0..20)
        .map(|i| acc(&format!("acc-{i:02}"), (i % 3) as u128))
        .collect();
    for (i, a) in emitted.iter().enumerate() {
        s = discover(s, a.clone(), i % 5 == 0);
    }
    assert_eq!(s.scanned_accounts, emitted);
}

#[test]
fn auto_selection_rule() {
    let cases = [
        (acc("empty-new", 0), false, false),
        (acc("empty-known", 0), true, false),
        (acc("funded-new", 5), false, true),
        (acc("funded-known", 5), true, false),
    ];
    let mut s = ScanSession::new();
    for (account, known, _) in cases.iter().cloned() {
        s = discover(s, account, known);
    }
    for (account, _, expect_selected) in cases.iter() {
        assert_eq!(
            s.is_selected(&account.id),
            *expect_selected,
            "account {}",
            account.id
        );
    }
}

#[test]
fn scenario_error_after_one_account() {
    let mut s = discover(ScanSession::new(), acc("X", 10), false);
    let before = s.selected_ids.clone();
    s = reduce(
        s,
        SessionEvent::Failed(ScanError::Transport {
            message: "usb reset".to_string(),
        }),
    );

    assert_eq!(s.status, ScanStatus::Error);
    assert_eq!(s.scanned_ids(), vec!["X"]);
    assert!(s.error.is_some());
    assert_eq!(s.selected_ids, before);
}

#[test]
fn partial_results_stay_selectable_after_error() {
    let mut s = discover(ScanSession::new(), acc("X", 0), false);
    s = reduce(s, SessionEvent::Failed(ScanError::Disconnected));
    s = reduce(s, SessionEvent::Toggled("X".to_string()));
    assert!(s.is_selected("X"));
    assert_eq!(s.status, ScanStatus::Error);
}

#[test]
fn restart_from_every_reachable_state() {
    let scanning = discover(ScanSession::new(), acc("a", 1), false);
    let idle = reduce(scanning.clone(), SessionEvent::Completed);
    let stopped = reduce(scanning.clone(), SessionEvent::Stopped);
    let failed = reduce(scanning.clone(), SessionEvent::Failed(ScanError::Aborted));

    for s in [scanning, idle, stopped, failed] {
        let r = reduce(s, SessionEvent::Restarted);
        assert_eq!(r.status, ScanStatus::Scanning);
        assert!(r.scanned_accounts.is_empty());
        assert!(r.selected_ids.is_empty());
        assert!(r.error.is_none());
    }
}

#[test]
fn selected_accounts_follow_discovery_order() {
    let mut s = ScanSession::new();
    for id in ["z", "m", "a"] {
        s = discover(s, acc(id, 1), false);
    }
    let ids: Vec<&str> = s.selected_accounts().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["z", "m", "a"]);
}

#[test]
fn session_serializes_for_display() {
    let s = discover(ScanSession::new(), acc("a", 1), false);
    let v = serde_json::to_value(&s).unwrap();
    assert_eq!(v["status"], "scanning");
    assert_eq!(v["selected_ids"][0], "a");
}
