// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The ledger mutator: turns "apply this signed amount to this account" into
//! a new balance plus the transaction record to persist. Used by manual entry
//! and by the recurring materializer; persisting both pieces atomically is
//! the caller's job.

use chrono::NaiveDate;
use rusqlite::{Connection, TransactionBehavior, params};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{LedgerError, Result, is_busy};
use crate::models::TxKind;
use crate::rates::RateOracle;
use crate::utils::stored_decimal;

const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// A point-in-time view of an account, loaded once per logical operation.
#[derive(Debug, Clone)]
pub struct AccountSnapshot {
    pub id: i64,
    pub name: String,
    pub currency: String,
    pub balance: Decimal,
}

/// A transaction row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub project_id: i64,
    /// In the project's reporting currency.
    pub amount: Decimal,
    /// In the account's native currency.
    pub original_amount: Decimal,
    pub kind: TxKind,
    pub category: String,
    pub occurred_on: NaiveDate,
    pub account_id: i64,
    pub account_name: String,
    pub account_currency: String,
    pub description: Option<String>,
    pub recurring_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct Posting {
    pub new_balance: Decimal,
    pub record: NewTransaction,
}

/// Build the posting for an account. Pure: no conversion happens here, the
/// reporting amount must already be in the project's currency and the native
/// amount in the account's.
#[allow(clippy::too_many_arguments)]
pub fn post(
    project_id: i64,
    account: &AccountSnapshot,
    kind: TxKind,
    reporting_amount: Decimal,
    native_amount: Decimal,
    category: &str,
    description: Option<String>,
    occurred_on: NaiveDate,
    recurring_id: Option<i64>,
) -> Posting {
    Posting {
        new_balance: account.balance + kind.signed(native_amount),
        record: NewTransaction {
            project_id,
            amount: reporting_amount,
            original_amount: native_amount,
            kind,
            category: category.to_string(),
            occurred_on,
            account_id: account.id,
            account_name: account.name.clone(),
            account_currency: account.currency.clone(),
            description,
            recurring_id,
        },
    }
}

pub fn insert_transaction(conn: &Connection, rec: &NewTransaction) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions(project_id, amount, original_amount, kind, category,
                                  occurred_on, account_id, account_name, account_currency,
                                  description, recurring_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            rec.project_id,
            rec.amount.to_string(),
            rec.original_amount.to_string(),
            rec.kind.as_str(),
            rec.category,
            rec.occurred_on.to_string(),
            rec.account_id,
            rec.account_name,
            rec.account_currency,
            rec.description,
            rec.recurring_id
        ],
    )?;
    Ok(())
}

pub fn load_account(conn: &Connection, account_id: i64) -> Result<AccountSnapshot> {
    let row = conn
        .query_row(
            "SELECT name, currency, balance FROM accounts WHERE id=?1",
            params![account_id],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                ))
            },
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => LedgerError::AccountNotFound(account_id),
            other => LedgerError::from(other),
        })?;
    Ok(AccountSnapshot {
        id: account_id,
        name: row.0,
        currency: row.1,
        balance: stored_decimal(&row.2)?,
    })
}

pub fn write_balance(conn: &Connection, account_id: i64, balance: Decimal) -> Result<()> {
    conn.execute(
        "UPDATE accounts SET balance=?1 WHERE id=?2",
        params![balance.to_string(), account_id],
    )?;
    Ok(())
}

/// Outcome of a manual entry: the recorded reporting amount, the account's
/// new balance, and whether the conversion fell back to 1:1.
#[derive(Debug, Clone)]
pub struct RecordedEntry {
    pub amount: Decimal,
    pub new_balance: Decimal,
    pub approximate: bool,
}

/// Record a manual transaction. The amount is given in the account's native
/// currency; when that differs from the project's reporting currency the
/// oracle supplies the reporting amount. Overdraft is allowed here, unlike
/// transfers. Balance update and record insert commit as one unit.
#[allow(clippy::too_many_arguments)]
pub fn record_entry(
    conn: &mut Connection,
    oracle: &dyn RateOracle,
    project_id: i64,
    account_id: i64,
    kind: TxKind,
    native_amount: Decimal,
    category: &str,
    description: Option<String>,
    occurred_on: NaiveDate,
) -> Result<RecordedEntry> {
    if native_amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(native_amount));
    }

    let reporting_currency: String = conn
        .query_row(
            "SELECT currency FROM projects WHERE id=?1",
            params![project_id],
            |r| r.get(0),
        )
        .map_err(LedgerError::from)?;
    let account_currency: String = conn
        .query_row(
            "SELECT currency FROM accounts WHERE id=?1",
            params![account_id],
            |r| r.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => LedgerError::AccountNotFound(account_id),
            other => LedgerError::from(other),
        })?;

    // Rate lookup stays outside the write transaction.
    let conversion = oracle.convert(native_amount, &account_currency, &reporting_currency);

    let mut attempt = 0;
    loop {
        attempt += 1;
        let res: Result<RecordedEntry> = (|| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let account = load_account(&tx, account_id)?;
            let posting = post(
                project_id,
                &account,
                kind,
                conversion.amount,
                native_amount,
                category,
                description.clone(),
                occurred_on,
                None,
            );
            insert_transaction(&tx, &posting.record)?;
            write_balance(&tx, account_id, posting.new_balance)?;
            tx.commit()?;
            Ok(RecordedEntry {
                amount: conversion.amount,
                new_balance: posting.new_balance,
                approximate: conversion.fallback,
            })
        })();
        match res {
            Err(e) if is_busy(&e) && attempt < MAX_COMMIT_ATTEMPTS => {
                warn!(attempt, "manual entry hit a busy store, retrying");
            }
            Err(e) if is_busy(&e) => return Err(LedgerError::CommitConflict(attempt)),
            other => return other,
        }
    }
}
