//! Scraper collaborator contract.
//!
//! A scraper performs one unit of external work with a leased account and
//! proxy. Ordinary failures are values ([`ScrapeOutcome`]); only contract
//! violations such as a malformed payload are errors ([`ScrapeError`]).

mod email;
mod http;

pub use email::extract_email;
pub use http::HttpScraper;

use async_trait::async_trait;
use outreach_types::ResourceAddress;
use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Everything a scraper needs for one call.
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub work_item_id: String,
    pub target: String,
    pub kind: String,
    pub payload: Map<String, Value>,
    /// Leased account credential
    pub account: ResourceAddress,
    /// Leased egress proxy
    pub proxy: ResourceAddress,
}

/// Result of a scrape call as seen by the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "data", rename_all = "snake_case")]
pub enum ScrapeOutcome {
    Success(Value),
    /// Worth retrying; says nothing definitive about the account
    TransientFailure(String),
    /// Platform throttled the account
    RateLimited(String),
    /// Ban or abuse detection on the account
    Banned(String),
}

impl ScrapeOutcome {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::TransientFailure(_) => "transient",
            Self::RateLimited(_) => "rate_limited",
            Self::Banned(_) => "banned",
        }
    }
}

/// Programmer or contract errors. The work item cannot succeed as submitted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScrapeError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Unsupported work kind: {0}")]
    UnsupportedKind(String),
}

#[async_trait]
pub trait Scraper: Send + Sync {
    async fn scrape(&self, request: &ScrapeRequest) -> Result<ScrapeOutcome, ScrapeError>;

    /// Drop per-proxy state for proxies not in `live` (proxy URLs).
    /// Returns how many entries were dropped.
    fn retain_proxies(&self, _live: &HashSet<String>) -> usize {
        0
    }
}
