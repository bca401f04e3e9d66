// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use crate::rates::{HttpRateOracle, RateOracle};
use crate::utils::parse_decimal;

pub fn handle(m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("convert", sub)) => {
            let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;
            let from = sub.get_one::<String>("from").unwrap().trim().to_uppercase();
            let to = sub.get_one::<String>("to").unwrap().trim().to_uppercase();
            let oracle = HttpRateOracle::new()?;
            let conversion = oracle.convert(amount, &from, &to);
            if conversion.fallback {
                println!(
                    "{} {} -> {} {} (approximate 1:1 rate, rate service unavailable)",
                    amount, from, conversion.amount, to
                );
            } else {
                println!("{} {} -> {:.4} {}", amount, from, conversion.amount, to);
            }
        }
        _ => {}
    }
    Ok(())
}
