// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior, params};

use centime::error::LedgerError;
use centime::recurring::materialize;
use centime::{cli, commands, db};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn seed(conn: &Connection) {
    conn.execute(
        "INSERT INTO projects(id, name, budget, currency) VALUES (1, 'Home', '1000', 'USD')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO accounts(id, project_id, name, balance, currency) VALUES (1, 1, 'Cash', '200', 'USD')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO categories(project_id, name, is_default) VALUES (1, 'Rent', 0)",
        [],
    )
    .unwrap();
}

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    seed(&conn);
    conn
}

fn add_rule(
    conn: &Connection,
    id: i64,
    account_id: i64,
    amount: &str,
    kind: &str,
    category: &str,
    frequency: &str,
    interval: i64,
    next_due: NaiveDate,
) {
    conn.execute(
        "INSERT INTO recurring(id, project_id, account_id, amount, kind, category, frequency,
                               interval, start_date, next_due)
         VALUES (?1, 1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            account_id,
            amount,
            kind,
            category,
            frequency,
            interval,
            next_due.to_string()
        ],
    )
    .unwrap();
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

fn cursor(conn: &Connection, rule_id: i64) -> String {
    conn.query_row(
        "SELECT next_due FROM recurring WHERE id=?1",
        params![rule_id],
        |r| r.get(0),
    )
    .unwrap()
}

#[test]
fn no_due_rules_is_a_no_op() {
    let mut conn = setup();
    add_rule(&conn, 1, 1, "20", "Expense", "Rent", "monthly", 1, d(2025, 7, 1));

    let outcome = materialize(&mut conn, 1, d(2025, 6, 15)).unwrap();
    assert_eq!(outcome.created, 0);
    assert_eq!(tx_count(&conn), 0);
    assert_eq!(balance(&conn, 1), "200");
    assert_eq!(cursor(&conn, 1), "2025-07-01");
}

#[test]
fn expands_one_transaction_per_elapsed_period() {
    let mut conn = setup();
    // Due three periods before the reference date: one transaction per
    // period, never a lump sum.
    add_rule(&conn, 1, 1, "20", "Expense", "Rent", "monthly", 1, d(2025, 4, 20));

    let outcome = materialize(&mut conn, 1, d(2025, 7, 5)).unwrap();
    assert_eq!(outcome.created, 3);

    let mut stmt = conn
        .prepare("SELECT occurred_on FROM transactions ORDER BY occurred_on")
        .unwrap();
    let dates: Vec<String> = stmt
        .query_map([], |r| r.get(0))
        .unwrap()
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(dates, vec!["2025-04-20", "2025-05-20", "2025-06-20"]);
    assert_eq!(cursor(&conn, 1), "2025-07-20");
    assert_eq!(balance(&conn, 1), "140");
}

#[test]
fn scenario_monthly_rent_two_months_behind() {
    let mut conn = setup();
    add_rule(&conn, 1, 1, "20", "Expense", "Rent", "monthly", 1, d(2025, 4, 15));

    let outcome = materialize(&mut conn, 1, d(2025, 6, 10)).unwrap();
    assert_eq!(outcome.created, 2);
    assert_eq!(balance(&conn, 1), "160");
    assert_eq!(cursor(&conn, 1), "2025-06-15");

    // The produced rows carry the rule back-reference and a default
    // description derived from the category.
    let (recurring_id, description): (Option<i64>, Option<String>) = conn
        .query_row(
            "SELECT recurring_id, description FROM transactions LIMIT 1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(recurring_id, Some(1));
    assert_eq!(description.as_deref(), Some("Recurring: Rent"));

    // Immediately re-running finds nothing due.
    let again = materialize(&mut conn, 1, d(2025, 6, 10)).unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(balance(&conn, 1), "160");
}

#[test]
fn income_and_expense_conserve_the_balance() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO categories(project_id, name) VALUES (1, 'Salary')",
        [],
    )
    .unwrap();
    add_rule(&conn, 1, 1, "20", "Expense", "Rent", "weekly", 1, d(2025, 6, 2));
    add_rule(&conn, 2, 1, "500", "Income", "Salary", "monthly", 1, d(2025, 6, 1));

    // Weekly rule fires Jun 2, 9, 16; monthly fires Jun 1.
    let outcome = materialize(&mut conn, 1, d(2025, 6, 16)).unwrap();
    assert_eq!(outcome.created, 4);
    // 200 + 500 - 3*20, both rules compounding on the same account.
    assert_eq!(balance(&conn, 1), "640");
}

#[test]
fn rules_on_separate_accounts_do_not_interfere() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO accounts(id, project_id, name, balance, currency) VALUES (2, 1, 'Savings', '50', 'USD')",
        [],
    )
    .unwrap();
    add_rule(&conn, 1, 1, "20", "Expense", "Rent", "daily", 1, d(2025, 6, 14));
    add_rule(&conn, 2, 2, "5", "Income", "Rent", "daily", 2, d(2025, 6, 13));

    let outcome = materialize(&mut conn, 1, d(2025, 6, 15)).unwrap();
    // Rule 1 fires on the 14th and 15th; rule 2 on the 13th and 15th.
    assert_eq!(outcome.created, 4);
    assert_eq!(balance(&conn, 1), "160");
    assert_eq!(balance(&conn, 2), "60");
    assert_eq!(cursor(&conn, 1), "2025-06-16");
    assert_eq!(cursor(&conn, 2), "2025-06-17");
}

#[test]
fn zero_interval_rule_fails_without_writes() {
    let mut conn = setup();
    add_rule(&conn, 1, 1, "20", "Expense", "Rent", "monthly", 0, d(2025, 5, 1));
    add_rule(&conn, 2, 1, "10", "Expense", "Rent", "monthly", 1, d(2025, 5, 1));

    let err = materialize(&mut conn, 1, d(2025, 6, 1)).unwrap_err();
    assert!(matches!(err, LedgerError::InvalidInterval(0)));
    // All-or-nothing: the healthy rule's work rolled back too.
    assert_eq!(tx_count(&conn), 0);
    assert_eq!(balance(&conn, 1), "200");
    assert_eq!(cursor(&conn, 2), "2025-05-01");
}

#[test]
fn missing_account_skips_rule_and_leaves_cursor() {
    let mut conn = setup();
    add_rule(&conn, 1, 99, "20", "Expense", "Rent", "monthly", 1, d(2025, 5, 1));
    add_rule(&conn, 2, 1, "10", "Expense", "Rent", "monthly", 1, d(2025, 6, 1));

    let outcome = materialize(&mut conn, 1, d(2025, 6, 1)).unwrap();
    // Only the healthy rule materialized; the orphaned rule kept its cursor
    // so it is revisited once its account situation is resolved.
    assert_eq!(outcome.created, 1);
    assert_eq!(cursor(&conn, 1), "2025-05-01");
    assert_eq!(cursor(&conn, 2), "2025-07-01");
    assert_eq!(balance(&conn, 1), "190");
}

#[test]
fn only_the_requested_project_is_touched() {
    let mut conn = setup();
    conn.execute(
        "INSERT INTO projects(id, name, budget, currency) VALUES (2, 'Side', '0', 'EUR')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO accounts(id, project_id, name, balance, currency) VALUES (2, 2, 'Side cash', '100', 'EUR')",
        [],
    )
    .unwrap();
    add_rule(&conn, 1, 1, "20", "Expense", "Rent", "monthly", 1, d(2025, 6, 1));
    conn.execute(
        "INSERT INTO recurring(id, project_id, account_id, amount, kind, category, frequency,
                               interval, start_date, next_due)
         VALUES (2, 2, 2, '30', 'Expense', 'Rent', 'monthly', 1, '2025-06-01', '2025-06-01')",
        [],
    )
    .unwrap();

    let outcome = materialize(&mut conn, 1, d(2025, 6, 1)).unwrap();
    assert_eq!(outcome.created, 1);
    assert_eq!(balance(&conn, 2), "100");
    assert_eq!(cursor(&conn, 2), "2025-06-01");
}

#[test]
fn concurrent_writers_conflict_then_materialize_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("centime.sqlite");

    let mut first = Connection::open(&path).unwrap();
    db::init_schema(&first).unwrap();
    seed(&first);
    add_rule(&first, 1, 1, "20", "Expense", "Rent", "monthly", 1, d(2025, 4, 15));

    let mut second = Connection::open(&path).unwrap();

    // While one writer holds the write lock, the other must give up with a
    // conflict after exhausting its retries rather than double-posting.
    let held = first
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .unwrap();
    let err = materialize(&mut second, 1, d(2025, 6, 10)).unwrap_err();
    assert!(matches!(err, LedgerError::CommitConflict(3)));
    assert_eq!(tx_count(&second), 0);
    drop(held);

    // Once the lock is released the losing writer posts the batch in full.
    let outcome = materialize(&mut second, 1, d(2025, 6, 10)).unwrap();
    assert_eq!(outcome.created, 2);
    assert_eq!(balance(&second, 1), "160");
    assert_eq!(cursor(&second, 1), "2025-06-15");

    // The other writer then sees an advanced cursor and has nothing to do.
    let again = materialize(&mut first, 1, d(2025, 6, 10)).unwrap();
    assert_eq!(again.created, 0);
    assert_eq!(tx_count(&first), 2);
}

#[test]
fn delete_removes_rule_and_rejects_unknown_ids() {
    let mut conn = setup();
    add_rule(&conn, 7, 1, "20", "Expense", "Rent", "monthly", 1, d(2025, 7, 1));

    let matches = cli::build_cli().get_matches_from([
        "centime", "recurring", "delete", "Home", "--id", "7",
    ]);
    let Some(("recurring", sub)) = matches.subcommand() else {
        panic!("recurring command not parsed");
    };
    commands::recurring::handle(&mut conn, sub).unwrap();
    let remaining: i64 = conn
        .query_row("SELECT COUNT(*) FROM recurring", [], |r| r.get(0))
        .unwrap();
    assert_eq!(remaining, 0);

    let matches = cli::build_cli().get_matches_from([
        "centime", "recurring", "delete", "Home", "--id", "7",
    ]);
    let Some(("recurring", sub)) = matches.subcommand() else {
        panic!("recurring command not parsed");
    };
    let err = commands::recurring::handle(&mut conn, sub).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<LedgerError>(),
        Some(LedgerError::RuleNotFound(7))
    ));
}
