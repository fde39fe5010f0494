//! CoinGecko `/coins/markets` source.
//!
//! One `fetch` is one GET. There is deliberately no retry loop here: a
//! failed batch is a failed run, and backoff policy belongs to whatever
//! schedules runs, not to the source.

use std::time::Duration;

use tracing::{debug, info};

use crate::source::{MarketSource, RawRecord, SourceError};

/// Public CoinGecko API v3 root.
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Blocking CoinGecko market-data source.
pub struct CoinGeckoSource {
    client: reqwest::blocking::Client,
    base_url: String,
    vs_currency: String,
    per_page: u32,
    api_key: Option<String>,
}

impl CoinGeckoSource {
    /// Build a source quoting prices in `vs_currency`, requesting up to
    /// `per_page` records per call. `api_key` is the optional demo-tier
    /// key; without one the public rate limits apply.
    pub fn new(vs_currency: impl Into<String>, per_page: u32, api_key: Option<String>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("coinsnap/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            vs_currency: vs_currency.into(),
            per_page,
            api_key,
        }
    }

    /// Point the source at a different API root (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn markets_url(&self) -> String {
        format!("{}/coins/markets", self.base_url)
    }
}

impl MarketSource for CoinGeckoSource {
    fn name(&self) -> &str {
        "coingecko"
    }

    fn fetch(&self, coin_ids: &[String]) -> Result<Vec<RawRecord>, SourceError> {
        let ids = coin_ids.join(",");
        let per_page = self.per_page.to_string();
        debug!(ids = %ids, vs_currency = %self.vs_currency, "requesting market snapshot");

        let query = [
            ("vs_currency", self.vs_currency.as_str()),
            ("ids", ids.as_str()),
            ("order", "market_cap_desc"),
            ("per_page", per_page.as_str()),
            ("page", "1"),
            ("price_change_percentage", "24h"),
        ];

        let mut request = self.client.get(self.markets_url()).query(&query);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request
            .send()
            .map_err(|e| SourceError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(SourceError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
            });
        }

        let records: Vec<RawRecord> = response
            .json()
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        info!(count = records.len(), "fetched market snapshot");
        Ok(records)
    }
}
