// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, Months, NaiveDate};

use crate::error::{LedgerError, Result};
use crate::models::Frequency;

/// Advance a due date by exactly one schedule step.
///
/// Month and year steps clamp to the last valid day of the target month:
/// Jan 31 + 1 month lands on Feb 28 (Feb 29 in leap years), and Feb 29 + 1
/// year lands on Feb 28. Callers that need several periods call this once
/// per period; batching the arithmetic would drift at month ends.
pub fn next_due_date(current: NaiveDate, frequency: Frequency, interval: i64) -> Result<NaiveDate> {
    let step = u32::try_from(interval)
        .ok()
        .filter(|i| *i >= 1)
        .ok_or(LedgerError::InvalidInterval(interval))?;

    let next = match frequency {
        Frequency::Daily => current.checked_add_signed(Duration::days(interval)),
        Frequency::Weekly => current.checked_add_signed(Duration::weeks(interval)),
        Frequency::Monthly => current.checked_add_months(Months::new(step)),
        Frequency::Yearly => step
            .checked_mul(12)
            .and_then(|months| current.checked_add_months(Months::new(months))),
    };
    next.ok_or(LedgerError::InvalidInterval(interval))
}
