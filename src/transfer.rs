// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Moves funds between two accounts as one atomic unit. Unlike manual entry,
//! transfers never overdraw the source: they are zero-sum inside the system,
//! so the balance check is a hard constraint. No transaction records are
//! written, only balances change; transfers stay out of income/expense
//! reports by design.

use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use tracing::warn;

use crate::error::{LedgerError, Result, is_busy};
use crate::ledger::{load_account, write_balance};
use crate::rates::{Conversion, RateOracle};

const MAX_COMMIT_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Amount removed from the source, in its native currency.
    pub debited: Decimal,
    /// Amount added to the destination, in its native currency.
    pub credited: Decimal,
    /// True when the credited amount used the 1:1 fallback rate.
    pub fallback_rate: bool,
}

pub fn transfer(
    conn: &mut Connection,
    oracle: &dyn RateOracle,
    from_account: i64,
    to_account: i64,
    amount: Decimal,
) -> Result<TransferOutcome> {
    if from_account == to_account {
        return Err(LedgerError::SameAccount);
    }
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }

    // Currencies are stable, so the rate lookup happens before the write
    // transaction opens; only balance reads need to be serialized with it.
    let from_currency = load_account(conn, from_account)?.currency;
    let to_currency = load_account(conn, to_account)?.currency;
    let conversion = if from_currency == to_currency {
        Conversion { amount, fallback: false }
    } else {
        oracle.convert(amount, &from_currency, &to_currency)
    };

    let mut attempt = 0;
    loop {
        attempt += 1;
        match run_transfer(conn, from_account, to_account, amount, conversion) {
            Err(e) if is_busy(&e) && attempt < MAX_COMMIT_ATTEMPTS => {
                warn!(attempt, "transfer hit a busy store, retrying");
            }
            Err(e) if is_busy(&e) => return Err(LedgerError::CommitConflict(attempt)),
            other => return other,
        }
    }
}

fn run_transfer(
    conn: &mut Connection,
    from_account: i64,
    to_account: i64,
    amount: Decimal,
    conversion: Conversion,
) -> Result<TransferOutcome> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let from = load_account(&tx, from_account)?;
    let to = load_account(&tx, to_account)?;
    if from.balance < amount {
        return Err(LedgerError::InsufficientFunds {
            balance: from.balance,
            requested: amount,
        });
    }

    write_balance(&tx, from.id, from.balance - amount)?;
    write_balance(&tx, to.id, to.balance + conversion.amount)?;
    tx.commit()?;

    Ok(TransferOutcome {
        debited: amount,
        credited: conversion.amount,
        fallback_rate: conversion.fallback,
    })
}
