// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, params};
use rust_decimal::Decimal;

use centime::db;
use centime::error::LedgerError;
use centime::rates::{Conversion, RateOracle};
use centime::transfer::transfer;

/// Multiplies by a fixed rate, as a stand-in for the live oracle.
struct FixedRate(Decimal);

impl RateOracle for FixedRate {
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Conversion {
        if from == to {
            return Conversion { amount, fallback: false };
        }
        Conversion {
            amount: amount * self.0,
            fallback: false,
        }
    }
}

/// Simulates an unreachable rate service.
struct DownOracle;

impl RateOracle for DownOracle {
    fn convert(&self, amount: Decimal, _from: &str, _to: &str) -> Conversion {
        Conversion { amount, fallback: true }
    }
}

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute(
        "INSERT INTO projects(id, name, budget, currency) VALUES (1, 'Home', '0', 'USD')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO accounts(id, project_id, name, balance, currency) VALUES (1, 1, 'A', '100', 'USD')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO accounts(id, project_id, name, balance, currency) VALUES (2, 1, 'B', '0', 'EUR')",
        [],
    )
    .unwrap();
    conn
}

fn balance(conn: &Connection, account_id: i64) -> String {
    conn.query_row(
        "SELECT balance FROM accounts WHERE id=?1",
        params![account_id],
        |r| r.get(0),
    )
    .unwrap()
}

fn tx_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap()
}

#[test]
fn cross_currency_transfer_converts_the_credit_only() {
    let mut conn = setup();
    let outcome = transfer(&mut conn, &FixedRate(Decimal::new(9, 1)), 1, 2, Decimal::from(50)).unwrap();

    assert_eq!(outcome.debited, Decimal::from(50));
    assert_eq!(outcome.credited, Decimal::new(450, 1));
    assert!(!outcome.fallback_rate);
    assert_eq!(balance(&conn, 1), "50");
    assert_eq!(balance(&conn, 2), "45.0");
    // Transfers change balances only; they never appear in history.
    assert_eq!(tx_count(&conn), 0);
}

#[test]
fn same_currency_transfer_skips_the_oracle() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO accounts(id, project_id, name, balance, currency) VALUES (3, 1, 'C', '10', 'USD')",
        [],
    )
    .unwrap();
    // DownOracle would mark any consulted conversion as a fallback.
    let outcome = transfer(&mut conn, &DownOracle, 1, 3, Decimal::from(25)).unwrap();
    assert_eq!(outcome.credited, Decimal::from(25));
    assert!(!outcome.fallback_rate);
    assert_eq!(balance(&conn, 1), "75");
    assert_eq!(balance(&conn, 3), "35");
}

#[test]
fn insufficient_funds_changes_nothing() {
    let mut conn = setup();
    let err = transfer(&mut conn, &DownOracle, 1, 2, Decimal::from(150)).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds { balance, requested }
            if balance == Decimal::from(100) && requested == Decimal::from(150)
    ));
    assert_eq!(balance(&conn, 1), "100");
    assert_eq!(balance(&conn, 2), "0");
}

#[test]
fn transfers_never_overdraw_even_by_a_cent() {
    let mut conn = setup();
    let err = transfer(&mut conn, &DownOracle, 1, 2, Decimal::new(10001, 2)).unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
    // The full balance itself is transferable.
    transfer(&mut conn, &DownOracle, 1, 2, Decimal::from(100)).unwrap();
    assert_eq!(balance(&conn, 1), "0");
}

#[test]
fn same_account_is_rejected_before_any_read() {
    let mut conn = setup();
    let err = transfer(&mut conn, &DownOracle, 1, 1, Decimal::from(10)).unwrap_err();
    assert!(matches!(err, LedgerError::SameAccount));
    assert_eq!(balance(&conn, 1), "100");
}

#[test]
fn non_positive_amounts_are_rejected() {
    let mut conn = setup();
    for amount in [Decimal::ZERO, Decimal::from(-5)] {
        let err = transfer(&mut conn, &DownOracle, 1, 2, amount).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(a) if a == amount));
    }
    assert_eq!(balance(&conn, 1), "100");
    assert_eq!(balance(&conn, 2), "0");
}

#[test]
fn missing_destination_leaves_source_untouched() {
    let mut conn = setup();
    let err = transfer(&mut conn, &DownOracle, 1, 99, Decimal::from(50)).unwrap_err();
    assert!(matches!(err, LedgerError::AccountNotFound(99)));
    assert_eq!(balance(&conn, 1), "100");
}

#[test]
fn unreachable_oracle_credits_one_to_one_and_flags_it() {
    let mut conn = setup();
    let outcome = transfer(&mut conn, &DownOracle, 1, 2, Decimal::from(50)).unwrap();
    assert_eq!(outcome.credited, Decimal::from(50));
    assert!(outcome.fallback_rate);
    assert_eq!(balance(&conn, 1), "50");
    assert_eq!(balance(&conn, 2), "50");
}
