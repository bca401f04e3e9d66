// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::rates::HttpRateOracle;
use crate::transfer::transfer;
use crate::utils::{id_for_account, id_for_project, parse_decimal};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    let project = m.get_one::<String>("project").unwrap().trim();
    let from = m.get_one::<String>("from").unwrap().trim();
    let to = m.get_one::<String>("to").unwrap().trim();
    let amount = parse_decimal(m.get_one::<String>("amount").unwrap().trim())?;

    let project_id = id_for_project(conn, project)?;
    let from_id = id_for_account(conn, project_id, from)?;
    let to_id = id_for_account(conn, project_id, to)?;

    let oracle = HttpRateOracle::new()?;
    let outcome = transfer(conn, &oracle, from_id, to_id, amount)?;

    if outcome.fallback_rate {
        println!(
            "Transferred {} from '{}' to '{}' at an approximate 1:1 rate (rate service unavailable); credited {}",
            outcome.debited, from, to, outcome.credited
        );
    } else {
        println!(
            "Transferred {} from '{}' to '{}'; credited {}",
            outcome.debited, from, to, outcome.credited
        );
    }
    Ok(())
}
