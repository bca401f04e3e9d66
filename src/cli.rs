// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as a JSON array"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .help("Print as JSON lines"),
    )
}

pub fn build_cli() -> Command {
    Command::new("centime")
        .version(crate_version!())
        .about("Multi-project budget tracker: accounts, categorized transactions, recurring rules, transfers")
        .subcommand(Command::new("init").about("Create the database if it does not exist"))
        .subcommand(project_cmd())
        .subcommand(account_cmd())
        .subcommand(category_cmd())
        .subcommand(tx_cmd())
        .subcommand(recurring_cmd())
        .subcommand(transfer_cmd())
        .subcommand(rates_cmd())
}

fn project_cmd() -> Command {
    Command::new("project")
        .about("Manage budget projects and their collaborators")
        .subcommand(
            Command::new("add")
                .about("Create a project")
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("currency").long("currency").default_value("USD").help("Reporting currency"))
                .arg(Arg::new("budget").long("budget").allow_negative_numbers(true).default_value("0").help("Monthly budget in the reporting currency"))
                .arg(Arg::new("owner").long("owner").default_value("me").help("User seeded as the project Owner")),
        )
        .subcommand(json_flags(Command::new("list").about("List projects")))
        .subcommand(
            Command::new("delete")
                .about("Delete a project and everything in it")
                .arg(Arg::new("name").required(true)),
        )
        .subcommand(
            Command::new("member")
                .about("Manage the project role map")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("project").required(true))
                        .arg(Arg::new("user").required(true))
                        .arg(Arg::new("role").required(true).help("Owner, Editor or Viewer")),
                )
                .subcommand(
                    Command::new("remove")
                        .arg(Arg::new("project").required(true))
                        .arg(Arg::new("user").required(true)),
                )
                .subcommand(
                    Command::new("list").arg(Arg::new("project").required(true)),
                ),
        )
}

fn account_cmd() -> Command {
    Command::new("account")
        .about("Manage accounts inside a project")
        .subcommand(
            Command::new("add")
                .arg(Arg::new("project").required(true))
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("currency").long("currency").default_value("USD"))
                .arg(Arg::new("balance").long("balance").allow_negative_numbers(true).default_value("0").help("Opening balance")),
        )
        .subcommand(json_flags(
            Command::new("list").arg(Arg::new("project").required(true)),
        ))
}

fn category_cmd() -> Command {
    Command::new("category")
        .about("Manage categories (names are the join key on transactions)")
        .subcommand(
            Command::new("add")
                .arg(Arg::new("project").required(true))
                .arg(Arg::new("name").required(true))
                .arg(
                    Arg::new("default")
                        .long("default")
                        .action(ArgAction::SetTrue)
                        .help("Mark as a default category"),
                ),
        )
        .subcommand(Command::new("list").arg(Arg::new("project").required(true)))
        .subcommand(
            Command::new("rename")
                .about("Rename a category and rewrite every referencing transaction")
                .arg(Arg::new("project").required(true))
                .arg(Arg::new("old").required(true))
                .arg(Arg::new("new").required(true)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a category (refused while transactions reference it)")
                .arg(Arg::new("project").required(true))
                .arg(Arg::new("name").required(true)),
        )
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and list transactions")
        .subcommand(
            Command::new("add")
                .arg(Arg::new("project").required(true))
                .arg(Arg::new("account").long("account").required(true))
                .arg(Arg::new("amount").long("amount").required(true).allow_negative_numbers(true).help("Amount in the account's currency"))
                .arg(Arg::new("kind").long("kind").required(true).help("income or expense"))
                .arg(Arg::new("category").long("category").required(true))
                .arg(Arg::new("date").long("date").help("Occurred-on date, defaults to today"))
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(json_flags(
            Command::new("list")
                .arg(Arg::new("project").required(true))
                .arg(Arg::new("month").long("month").help("Filter by YYYY-MM"))
                .arg(Arg::new("account").long("account"))
                .arg(Arg::new("category").long("category"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(clap::value_parser!(usize)),
                ),
        ))
}

fn recurring_cmd() -> Command {
    Command::new("recurring")
        .about("Manage recurring rules and materialize due ones")
        .subcommand(
            Command::new("add")
                .arg(Arg::new("project").required(true))
                .arg(Arg::new("account").long("account").required(true))
                .arg(Arg::new("amount").long("amount").required(true).allow_negative_numbers(true).help("Amount in the project's reporting currency"))
                .arg(Arg::new("kind").long("kind").required(true).help("income or expense"))
                .arg(Arg::new("category").long("category").required(true))
                .arg(Arg::new("frequency").long("frequency").required(true).help("daily, weekly, monthly or yearly"))
                .arg(
                    Arg::new("interval")
                        .long("interval")
                        .default_value("1")
                        .value_parser(clap::value_parser!(i64))
                        .help("Every N periods"),
                )
                .arg(Arg::new("start").long("start").help("First due date, defaults to today"))
                .arg(Arg::new("end").long("end").help("Optional end date (stored, not yet enforced)"))
                .arg(Arg::new("description").long("description")),
        )
        .subcommand(Command::new("list").arg(Arg::new("project").required(true)))
        .subcommand(
            Command::new("delete")
                .about("Delete a recurring rule by id")
                .arg(Arg::new("project").required(true))
                .arg(
                    Arg::new("id")
                        .long("id")
                        .required(true)
                        .value_parser(clap::value_parser!(i64)),
                ),
        )
        .subcommand(
            Command::new("process")
                .about("Create all missed transactions for due rules and advance their cursors")
                .arg(Arg::new("project").required(true)),
        )
}

fn transfer_cmd() -> Command {
    Command::new("transfer")
        .about("Move funds between two accounts (no transaction records are written)")
        .arg(Arg::new("project").required(true))
        .arg(Arg::new("from").long("from").required(true))
        .arg(Arg::new("to").long("to").required(true))
        .arg(Arg::new("amount").long("amount").required(true).allow_negative_numbers(true).help("Amount in the source account's currency"))
}

fn rates_cmd() -> Command {
    Command::new("rates").about("Currency conversion").subcommand(
        Command::new("convert")
            .arg(Arg::new("amount").long("amount").required(true).allow_negative_numbers(true))
            .arg(Arg::new("from").long("from").required(true))
            .arg(Arg::new("to").long("to").required(true)),
    )
}
