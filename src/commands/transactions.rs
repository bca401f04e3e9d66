// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;

use crate::ledger;
use crate::models::TxKind;
use crate::rates::HttpRateOracle;
use crate::utils::{
    id_for_account, id_for_category, id_for_project, maybe_print_json, parse_date, parse_decimal,
    pretty_table,
};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let account = sub.get_one::<String>("account").unwrap().trim();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;
    let kind: TxKind = sub.get_one::<String>("kind").unwrap().trim().parse()?;
    let category = sub.get_one::<String>("category").unwrap().trim().to_string();
    let date = match sub.get_one::<String>("date") {
        Some(s) => parse_date(s.trim())?,
        None => Utc::now().date_naive(),
    };
    let description = sub.get_one::<String>("description").map(|s| s.to_string());

    let project_id = id_for_project(conn, project)?;
    let account_id = id_for_account(conn, project_id, account)?;
    // The category must exist even though transactions store it by name.
    id_for_category(conn, project_id, &category)?;

    let oracle = HttpRateOracle::new()?;
    let entry = ledger::record_entry(
        conn,
        &oracle,
        project_id,
        account_id,
        kind,
        amount,
        &category,
        description,
        date,
    )?;

    let approx = if entry.approximate { " (approximate 1:1 rate)" } else { "" };
    println!(
        "Recorded {} {} on {} at '{}'{}; new balance {}",
        kind.as_str(),
        entry.amount,
        date,
        account,
        approx,
        entry.new_balance
    );
    Ok(())
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub occurred_on: String,
    pub account: String,
    pub kind: String,
    pub amount: String,
    pub original_amount: String,
    pub currency: String,
    pub category: String,
    pub description: String,
    pub recurring: bool,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.occurred_on.clone(),
                    r.account.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.original_amount.clone(),
                    r.currency.clone(),
                    r.category.clone(),
                    r.description.clone(),
                    if r.recurring { "*".into() } else { String::new() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Account", "Kind", "Amount", "Original", "CCY", "Category", "Description", "Rec"],
                rows,
            )
        );
    }
    Ok(())
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<TransactionRow>> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let project_id = id_for_project(conn, project)?;

    let mut sql = String::from(
        "SELECT occurred_on, account_name, kind, amount, original_amount, account_currency,
                category, description, recurring_id
         FROM transactions WHERE project_id=?",
    );
    let mut params_vec: Vec<String> = vec![project_id.to_string()];

    if let Some(month) = sub.get_one::<String>("month") {
        sql.push_str(" AND substr(occurred_on,1,7)=?");
        params_vec.push(month.into());
    }
    if let Some(acct) = sub.get_one::<String>("account") {
        sql.push_str(" AND account_name=?");
        params_vec.push(acct.into());
    }
    if let Some(cat) = sub.get_one::<String>("category") {
        sql.push_str(" AND category=?");
        params_vec.push(cat.into());
    }
    sql.push_str(" ORDER BY occurred_on DESC, id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let description: Option<String> = r.get(7)?;
        let recurring_id: Option<i64> = r.get(8)?;
        data.push(TransactionRow {
            occurred_on: r.get(0)?,
            account: r.get(1)?,
            kind: r.get(2)?,
            amount: r.get(3)?,
            original_amount: r.get(4)?,
            currency: r.get(5)?,
            category: r.get(6)?,
            description: description.unwrap_or_default(),
            recurring: recurring_id.is_some(),
        });
    }
    Ok(data)
}
