// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors raised by the ledger engine (schedule, materializer, transfers).
///
/// Validation errors are detected before any mutation. `CommitConflict` is
/// transient and surfaced only after internal retries are exhausted.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("interval must be a positive integer, got {0}")]
    InvalidInterval(i64),

    #[error("unknown frequency '{0}', expected daily, weekly, monthly or yearly")]
    InvalidFrequency(String),

    #[error("unknown transaction kind '{0}', expected Income or Expense")]
    InvalidKind(String),

    #[error("source and destination accounts must differ")]
    SameAccount,

    #[error("amount must be greater than zero, got {0}")]
    InvalidAmount(Decimal),

    #[error("insufficient funds: balance {balance} is less than {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("account {0} not found")]
    AccountNotFound(i64),

    #[error("recurring rule {0} not found")]
    RuleNotFound(i64),

    /// Non-fatal: the rate oracle absorbs this into the 1:1 fallback.
    #[error("conversion {from}->{to} unavailable: {reason}")]
    ConversionUnavailable {
        from: String,
        to: String,
        reason: String,
    },

    #[error("commit conflict persisted after {0} attempts, try again")]
    CommitConflict(u32),

    #[error("store unavailable")]
    StoreUnavailable(#[source] rusqlite::Error),

    #[error("stored amount '{0}' is not a valid decimal")]
    BadStoredAmount(String),

    #[error("stored date '{0}' is not a valid date")]
    BadStoredDate(String),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        LedgerError::StoreUnavailable(e)
    }
}

/// True when the underlying store reported a busy/locked condition, i.e. a
/// concurrent writer held the database. These are retried before becoming
/// `CommitConflict`.
pub(crate) fn is_busy(e: &LedgerError) -> bool {
    matches!(
        e,
        LedgerError::StoreUnavailable(rusqlite::Error::SqliteFailure(f, _))
            if f.code == rusqlite::ErrorCode::DatabaseBusy
                || f.code == rusqlite::ErrorCode::DatabaseLocked
    )
}
