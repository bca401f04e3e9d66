// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::utils::{id_for_project, maybe_print_json, parse_decimal, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let name = sub.get_one::<String>("name").unwrap().trim();
    let currency = sub.get_one::<String>("currency").unwrap().to_uppercase();
    let balance = parse_decimal(sub.get_one::<String>("balance").unwrap().trim())?;
    let project_id = id_for_project(conn, project)?;

    conn.execute(
        "INSERT INTO accounts(project_id, name, balance, currency) VALUES (?1, ?2, ?3, ?4)",
        params![project_id, name, balance.to_string(), currency],
    )
    .with_context(|| format!("Create account '{}' in '{}'", name, project))?;
    println!("Added account '{}' ({} {}) to '{}'", name, currency, balance, project);
    Ok(())
}

#[derive(Serialize)]
struct AccountRow {
    name: String,
    currency: String,
    balance: String,
    created_at: String,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let project_id = id_for_project(conn, project)?;
    let mut stmt = conn.prepare(
        "SELECT name, currency, balance, created_at FROM accounts WHERE project_id=?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![project_id], |r| {
        Ok(AccountRow {
            name: r.get(0)?,
            currency: r.get(1)?,
            balance: r.get(2)?,
            created_at: r.get(3)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|a| {
                vec![
                    a.name.clone(),
                    a.currency.clone(),
                    a.balance.clone(),
                    a.created_at.clone(),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Account", "CCY", "Balance", "Created"], rows));
    }
    Ok(())
}
