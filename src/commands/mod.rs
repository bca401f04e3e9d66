// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod projects;
pub mod accounts;
pub mod categories;
pub mod transactions;
pub mod recurring;
pub mod transfer;
pub mod rates;
