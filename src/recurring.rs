// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The recurring materializer: expands every due rule of a project into the
//! concrete transactions missed since the last run, updates balances, and
//! advances each rule's cursor, all inside one store transaction.
//!
//! The cursor is read and written inside the same serialized transaction, so
//! concurrent invocations for one project are exactly-once per period: the
//! loser of the race re-reads an already-advanced cursor and creates nothing.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior, params};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{LedgerError, Result, is_busy};
use crate::ledger::{self, AccountSnapshot};
use crate::models::{Frequency, TxKind};
use crate::schedule::next_due_date;
use crate::utils::{stored_date, stored_decimal};

const MAX_COMMIT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeOutcome {
    pub created: usize,
}

struct DueRule {
    id: i64,
    account_id: i64,
    amount: Decimal,
    kind: TxKind,
    category: String,
    description: Option<String>,
    frequency: Frequency,
    interval: i64,
    next_due: NaiveDate,
}

/// Materialize all due rules of a project, with `today` captured once as the
/// reference date. Safe to call arbitrarily often: with nothing due it is a
/// no-op. Busy-store failures are retried before surfacing as a conflict.
pub fn materialize(
    conn: &mut Connection,
    project_id: i64,
    today: NaiveDate,
) -> Result<MaterializeOutcome> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match run_batch(conn, project_id, today) {
            Err(e) if is_busy(&e) && attempt < MAX_COMMIT_ATTEMPTS => {
                warn!(attempt, project_id, "materialize hit a busy store, retrying");
            }
            Err(e) if is_busy(&e) => return Err(LedgerError::CommitConflict(attempt)),
            other => return other,
        }
    }
}

fn run_batch(conn: &mut Connection, project_id: i64, today: NaiveDate) -> Result<MaterializeOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let due = load_due_rules(&tx, project_id, today)?;
    if due.is_empty() {
        return Ok(MaterializeOutcome { created: 0 });
    }

    // Working set: every account of the project, loaded once. Balances are
    // mutated here during the loop so rules sharing an account compound
    // instead of clobbering each other.
    let mut accounts = load_accounts(&tx, project_id)?;
    let mut touched: HashSet<i64> = HashSet::new();
    let mut created = 0usize;

    for rule in &due {
        if rule.interval < 1 {
            // Creation-time validation should make this unreachable; fail
            // rather than loop forever on a corrupt rule.
            return Err(LedgerError::InvalidInterval(rule.interval));
        }

        if !accounts.contains_key(&rule.account_id) {
            // The account was deleted after the rule was created. The rule
            // and its cursor are left untouched and revisited on the next
            // run; see DESIGN.md for why the cursor is not advanced.
            warn!(
                rule = rule.id,
                account = rule.account_id,
                "skipping recurring rule whose account is gone"
            );
            continue;
        }

        let mut cursor = rule.next_due;
        while cursor <= today {
            let Some(account) = accounts.get_mut(&rule.account_id) else {
                break;
            };
            let description = rule
                .description
                .clone()
                .or_else(|| Some(format!("Recurring: {}", rule.category)));
            // Rule amounts are kept in the project's reporting currency, so
            // the reporting and native amounts coincide here.
            let posting = ledger::post(
                project_id,
                account,
                rule.kind,
                rule.amount,
                rule.amount,
                &rule.category,
                description,
                cursor,
                Some(rule.id),
            );
            ledger::insert_transaction(&tx, &posting.record)?;
            account.balance = posting.new_balance;
            touched.insert(rule.account_id);
            created += 1;

            cursor = next_due_date(cursor, rule.frequency, rule.interval)?;
        }

        if cursor != rule.next_due {
            tx.execute(
                "UPDATE recurring SET next_due=?1 WHERE id=?2",
                params![cursor.to_string(), rule.id],
            )?;
            debug!(rule = rule.id, next_due = %cursor, "advanced rule cursor");
        }
    }

    for account_id in &touched {
        if let Some(account) = accounts.get(account_id) {
            ledger::write_balance(&tx, *account_id, account.balance)?;
        }
    }

    tx.commit()?;
    Ok(MaterializeOutcome { created })
}

fn load_due_rules(conn: &Connection, project_id: i64, today: NaiveDate) -> Result<Vec<DueRule>> {
    let mut stmt = conn.prepare(
        "SELECT id, account_id, amount, kind, category, description, frequency, interval, next_due
         FROM recurring WHERE project_id=?1 AND next_due<=?2 ORDER BY id",
    )?;
    let mut rows = stmt.query(params![project_id, today.to_string()])?;
    let mut due = Vec::new();
    while let Some(r) = rows.next()? {
        let amount: String = r.get(2)?;
        let kind: String = r.get(3)?;
        let frequency: String = r.get(6)?;
        let next_due: String = r.get(8)?;
        due.push(DueRule {
            id: r.get(0)?,
            account_id: r.get(1)?,
            amount: stored_decimal(&amount)?,
            kind: kind.parse()?,
            category: r.get(4)?,
            description: r.get(5)?,
            frequency: frequency.parse()?,
            interval: r.get(7)?,
            next_due: stored_date(&next_due)?,
        });
    }
    Ok(due)
}

fn load_accounts(conn: &Connection, project_id: i64) -> Result<HashMap<i64, AccountSnapshot>> {
    let mut stmt =
        conn.prepare("SELECT id, name, currency, balance FROM accounts WHERE project_id=?1")?;
    let mut rows = stmt.query(params![project_id])?;
    let mut accounts = HashMap::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let balance: String = r.get(3)?;
        accounts.insert(
            id,
            AccountSnapshot {
                id,
                name: r.get(1)?,
                currency: r.get(2)?,
                balance: stored_decimal(&balance)?,
            },
        );
    }
    Ok(accounts)
}
