// Copyright (c) 2025 Centime contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Currency conversion is advisory: it affects reported amounts, never the
//! correctness of the ledger itself. The oracle therefore never fails. Any
//! transport or parse trouble degrades to a 1:1 rate, marked as such so the
//! caller can surface it.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use tracing::warn;

use crate::error::LedgerError;
use crate::utils::http_client;

const DEFAULT_BASE_URL: &str = "https://api.frankfurter.dev";

/// A converted amount. `fallback` is true when no real rate was available
/// and the amount came back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conversion {
    pub amount: Decimal,
    pub fallback: bool,
}

pub trait RateOracle {
    /// Convert between currency codes. Infallible by contract: on any
    /// trouble the original amount comes back with `fallback = true`.
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Conversion;
}

pub struct HttpRateOracle {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpRateOracle {
    pub fn new() -> anyhow::Result<Self> {
        Ok(HttpRateOracle {
            client: http_client()?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(base_url: impl Into<String>) -> anyhow::Result<Self> {
        Ok(HttpRateOracle {
            client: http_client()?,
            base_url: base_url.into(),
        })
    }

    fn fetch_rate(&self, from: &str, to: &str) -> Result<Decimal, LedgerError> {
        #[derive(Deserialize)]
        struct Latest {
            rates: HashMap<String, f64>,
        }

        let unavailable = |reason: String| LedgerError::ConversionUnavailable {
            from: from.to_string(),
            to: to.to_string(),
            reason,
        };

        let url = format!("{}/latest?from={}&to={}", self.base_url, from, to);
        let resp = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| unavailable(e.to_string()))?;
        let body: Latest = resp.json().map_err(|e| unavailable(e.to_string()))?;
        body.rates
            .get(to)
            .and_then(|r| Decimal::from_f64(*r))
            .ok_or_else(|| unavailable(format!("no rate for {} in response", to)))
    }
}

impl RateOracle for HttpRateOracle {
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Conversion {
        if from == to {
            return Conversion { amount, fallback: false };
        }
        match self.fetch_rate(from, to) {
            Ok(rate) => Conversion {
                amount: amount * rate,
                fallback: false,
            },
            Err(e) => {
                warn!(from, to, error = %e, "rate lookup failed, using 1:1 fallback");
                Conversion { amount, fallback: true }
            }
        }
    }
}
