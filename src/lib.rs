// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod cli;
pub mod db;
pub mod error;
pub mod models;
pub mod schedule;
pub mod ledger;
pub mod rates;
pub mod recurring;
pub mod transfer;
pub mod utils;
pub mod commands;
