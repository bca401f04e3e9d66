// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::models::Role;
use crate::utils::{id_for_project, maybe_print_json, parse_decimal, pretty_table};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("delete", sub)) => delete(conn, sub)?,
        Some(("member", sub)) => member(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim().to_string();
    let currency = sub.get_one::<String>("currency").unwrap().to_uppercase();
    let budget = parse_decimal(sub.get_one::<String>("budget").unwrap().trim())?;
    let owner = sub.get_one::<String>("owner").unwrap().trim().to_string();
    if budget.is_sign_negative() {
        bail!("Monthly budget must not be negative, got {}", budget);
    }

    conn.execute(
        "INSERT INTO projects(name, budget, currency) VALUES (?1, ?2, ?3)",
        params![name, budget.to_string(), currency],
    )
    .with_context(|| format!("Create project '{}'", name))?;
    let project_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO collaborators(project_id, user, role) VALUES (?1, ?2, 'Owner')",
        params![project_id, owner],
    )?;
    conn.execute(
        "INSERT INTO categories(project_id, name, is_default) VALUES (?1, 'General', 1)",
        params![project_id],
    )?;
    println!("Created project '{}' ({} {}/month), owner '{}'", name, currency, budget, owner);
    Ok(())
}

#[derive(Serialize)]
struct ProjectRow {
    name: String,
    currency: String,
    budget: String,
    created_at: String,
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let mut stmt =
        conn.prepare("SELECT name, currency, budget, created_at FROM projects ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok(ProjectRow {
            name: r.get(0)?,
            currency: r.get(1)?,
            budget: r.get(2)?,
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
            .map(|p| {
                vec![
                    p.name.clone(),
                    p.currency.clone(),
                    p.budget.clone(),
                    p.created_at.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Project", "CCY", "Budget/month", "Created"], rows)
        );
    }
    Ok(())
}

fn delete(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap().trim();
    let project_id = id_for_project(conn, name)?;
    // Cascades to accounts, categories, transactions, collaborators, rules.
    conn.execute("DELETE FROM projects WHERE id=?1", params![project_id])?;
    println!("Deleted project '{}' and all its data", name);
    Ok(())
}

fn member(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let project = sub.get_one::<String>("project").unwrap().trim();
            let user = sub.get_one::<String>("user").unwrap().trim();
            let role: Role = sub
                .get_one::<String>("role")
                .unwrap()
                .trim()
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let project_id = id_for_project(conn, project)?;
            if role != Role::Owner && is_last_owner(conn, project_id, user)? {
                bail!("'{}' is the last Owner of '{}'; promote someone else first", user, project);
            }
            conn.execute(
                "INSERT INTO collaborators(project_id, user, role) VALUES (?1, ?2, ?3)
                 ON CONFLICT(project_id, user) DO UPDATE SET role=excluded.role",
                params![project_id, user, role.as_str()],
            )?;
            println!("{} is now {} on '{}'", user, role.as_str(), project);
        }
        Some(("remove", sub)) => {
            let project = sub.get_one::<String>("project").unwrap().trim();
            let user = sub.get_one::<String>("user").unwrap().trim();
            let project_id = id_for_project(conn, project)?;
            if is_last_owner(conn, project_id, user)? {
                bail!("'{}' is the last Owner of '{}'; promote someone else first", user, project);
            }
            let n = conn.execute(
                "DELETE FROM collaborators WHERE project_id=?1 AND user=?2",
                params![project_id, user],
            )?;
            if n == 0 {
                bail!("'{}' is not a collaborator on '{}'", user, project);
            }
            println!("Removed {} from '{}'", user, project);
        }
        Some(("list", sub)) => {
            let project = sub.get_one::<String>("project").unwrap().trim();
            let project_id = id_for_project(conn, project)?;
            let mut stmt = conn.prepare(
                "SELECT user, role FROM collaborators WHERE project_id=?1 ORDER BY role, user",
            )?;
            let rows = stmt.query_map(params![project_id], |r| {
                Ok(vec![r.get::<_, String>(0)?, r.get::<_, String>(1)?])
            })?;
            let mut data = Vec::new();
            for row in rows {
                data.push(row?);
            }
            println!("{}", pretty_table(&["User", "Role"], data));
        }
        _ => {}
    }
    Ok(())
}

fn is_last_owner(conn: &Connection, project_id: i64, user: &str) -> Result<bool> {
    let owners: i64 = conn.query_row(
        "SELECT COUNT(*) FROM collaborators WHERE project_id=?1 AND role='Owner'",
        params![project_id],
        |r| r.get(0),
    )?;
    let is_owner: i64 = conn.query_row(
        "SELECT COUNT(*) FROM collaborators WHERE project_id=?1 AND user=?2 AND role='Owner'",
        params![project_id, user],
        |r| r.get(0),
    )?;
    Ok(is_owner == 1 && owners == 1)
}
