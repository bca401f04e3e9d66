// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, params};

use crate::utils::{id_for_category, id_for_project, pretty_table};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("rename", sub)) => rename(conn, sub)?,
        Some(("delete", sub)) => delete(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let name = sub.get_one::<String>("name").unwrap().trim();
    let is_default = sub.get_flag("default");
    let project_id = id_for_project(conn, project)?;
    conn.execute(
        "INSERT INTO categories(project_id, name, is_default) VALUES (?1, ?2, ?3)",
        params![project_id, name, is_default as i64],
    )
    .with_context(|| format!("Create category '{}' in '{}' (names are unique, case-insensitive)", name, project))?;
    println!("Added category '{}' to '{}'", name, project);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let project_id = id_for_project(conn, project)?;
    let mut stmt = conn.prepare(
        "SELECT name, is_default FROM categories WHERE project_id=?1 ORDER BY name",
    )?;
    let rows = stmt.query_map(params![project_id], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (name, is_default) = row?;
        data.push(vec![name, if is_default != 0 { "yes".into() } else { String::new() }]);
    }
    println!("{}", pretty_table(&["Category", "Default"], data));
    Ok(())
}

/// Categories join transactions by name, so a rename must rewrite every
/// referencing transaction. Both writes go in one transaction: a rename is
/// either fully applied or not at all.
fn rename(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let old = sub.get_one::<String>("old").unwrap().trim();
    let new = sub.get_one::<String>("new").unwrap().trim();
    let project_id = id_for_project(conn, project)?;
    let cat_id = id_for_category(conn, project_id, old)?;

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE categories SET name=?1 WHERE id=?2",
        params![new, cat_id],
    )
    .with_context(|| format!("Rename category '{}' to '{}'", old, new))?;
    let rewritten = tx.execute(
        "UPDATE transactions SET category=?1 WHERE project_id=?2 AND category=?3 COLLATE NOCASE",
        params![new, project_id, old],
    )?;
    tx.execute(
        "UPDATE recurring SET category=?1 WHERE project_id=?2 AND category=?3 COLLATE NOCASE",
        params![new, project_id, old],
    )?;
    tx.commit()?;
    println!("Renamed '{}' to '{}' ({} transactions rewritten)", old, new, rewritten);
    Ok(())
}

fn delete(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let project = sub.get_one::<String>("project").unwrap().trim();
    let name = sub.get_one::<String>("name").unwrap().trim();
    let project_id = id_for_project(conn, project)?;
    let cat_id = id_for_category(conn, project_id, name)?;

    let referenced: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE project_id=?1 AND category=?2 COLLATE NOCASE",
        params![project_id, name],
        |r| r.get(0),
    )?;
    if referenced > 0 {
        bail!(
            "Category '{}' is referenced by {} transactions and cannot be deleted",
            name,
            referenced
        );
    }
    conn.execute("DELETE FROM categories WHERE id=?1", params![cat_id])?;
    println!("Deleted category '{}'", name);
    Ok(())
}
