// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::error::LedgerError;
use crate::models::{Frequency, TxKind};
use crate::recurring::materialize;
use crate::utils::{
    id_for_account, id_for_category, id_for_project, parse_date, parse_decimal, pretty_table,
};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("delete", sub)) => delete(conn, sub)?,
        Some(("process", sub)) => process(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let account = sub.get_one::<String>("account").unwrap().trim();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;
    let kind: TxKind = sub.get_one::<String>("kind").unwrap().trim().parse()?;
    let category = sub.get_one::<String>("category").unwrap().trim().to_string();
    let frequency: Frequency = sub.get_one::<String>("frequency").unwrap().trim().parse()?;
    let interval = *sub.get_one::<i64>("interval").unwrap();
    let start = match sub.get_one::<String>("start") {
        Some(s) => parse_date(s.trim())?,
        None => Utc::now().date_naive(),
    };
    let end = sub
        .get_one::<String>("end")
        .map(|s| parse_date(s.trim()))
        .transpose()?;
    let description = sub.get_one::<String>("description").map(|s| s.to_string());

    if interval < 1 {
        bail!("Interval must be a positive integer, got {}", interval);
    }
    if amount <= rust_decimal::Decimal::ZERO {
        bail!("Amount must be greater than zero, got {}", amount);
    }

    let project_id = id_for_project(conn, project)?;
    let account_id = id_for_account(conn, project_id, account)?;
    id_for_category(conn, project_id, &category)?;

    // The first due date is the start date itself.
    conn.execute(
        "INSERT INTO recurring(project_id, account_id, amount, kind, category, description,
                               frequency, interval, start_date, end_date, next_due)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?9)",
        params![
            project_id,
            account_id,
            amount.to_string(),
            kind.as_str(),
            category,
            description,
            frequency.as_str(),
            interval,
            start.to_string(),
            end.map(|d| d.to_string())
        ],
    )?;
    println!(
        "Added {} {} rule '{}' ({}, every {}) starting {}",
        kind.as_str(),
        amount,
        category,
        frequency.as_str(),
        interval,
        start
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let project_id = id_for_project(conn, project)?;
    let mut stmt = conn.prepare(
        "SELECT r.id, a.name, r.kind, r.amount, r.category, r.frequency, r.interval, r.next_due
         FROM recurring r LEFT JOIN accounts a ON r.account_id=a.id
         WHERE r.project_id=?1 ORDER BY r.next_due, r.id",
    )?;
    let rows = stmt.query_map(params![project_id], |r| {
        Ok(vec![
            r.get::<_, i64>(0)?.to_string(),
            r.get::<_, Option<String>>(1)?.unwrap_or_else(|| "(deleted)".into()),
            r.get::<_, String>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
            r.get::<_, i64>(6)?.to_string(),
            r.get::<_, String>(7)?,
        ])
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    println!(
        "{}",
        pretty_table(
            &["Id", "Account", "Kind", "Amount", "Category", "Frequency", "Every", "Next due"],
            data,
        )
    );
    Ok(())
}

fn delete(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let id = *sub.get_one::<i64>("id").unwrap();
    let project_id = id_for_project(conn, project)?;
    let n = conn.execute(
        "DELETE FROM recurring WHERE id=?1 AND project_id=?2",
        params![id, project_id],
    )?;
    if n == 0 {
        return Err(LedgerError::RuleNotFound(id).into());
    }
    println!("Deleted recurring rule {}", id);
    Ok(())
}

fn process(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let project_id = id_for_project(conn, project)?;
    let today = Utc::now().date_naive();
    let outcome = materialize(conn, project_id, today)?;
    println!("Created {} transactions for '{}'", outcome.created, project);
    Ok(())
}
