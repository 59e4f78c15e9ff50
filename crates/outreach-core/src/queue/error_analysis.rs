//! Diagnostic grouping of failure messages.

use outreach_types::{ErrorAnalysis, ErrorCategory, WorkItem};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

// Checked in order; the first match wins.
static CATEGORY_PATTERNS: LazyLock<Vec<(ErrorCategory, Regex)>> = LazyLock::new(|| {
    [
        (ErrorCategory::RateLimit, r"(?i)rate.?limit|\b429\b|too many requests|quota|throttl"),
        (
            ErrorCategory::Blocked,
            r"(?i)\bbann?ed\b|\bban\b|suspend|terminat|captcha|forbidden|\b403\b|blocked|unusual traffic",
        ),
        (
            ErrorCategory::Auth,
            r"(?i)auth|login|log in|sign.?in|password|credential|\b401\b",
        ),
        (
            ErrorCategory::Network,
            r"(?i)time.?out|timed out|connect|connection|dns|network|proxy|reset by peer|refused|\b5\d\d\b",
        ),
        (ErrorCategory::InvalidInput, r"(?i)invalid|malformed|not found|\b404\b|payload"),
    ]
    .into_iter()
    .filter_map(|(category, pattern)| match Regex::new(pattern) {
        Ok(re) => Some((category, re)),
        Err(e) => {
            tracing::error!(?category, "Invalid error category pattern: {}", e);
            None
        },
    })
    .collect()
});

pub fn categorize(error: &str) -> ErrorCategory {
    CATEGORY_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(error))
        .map_or(ErrorCategory::Unknown, |(category, _)| *category)
}

fn recommendation(category: ErrorCategory, count: usize) -> String {
    match category {
        ErrorCategory::Auth => {
            format!("{count} login failure(s): verify account credentials and 2FA state")
        },
        ErrorCategory::Blocked => {
            format!("{count} block/ban signal(s): replace disabled accounts and rotate proxies")
        },
        ErrorCategory::Network => {
            format!("{count} network error(s): check proxy connectivity or raise the scrape timeout")
        },
        ErrorCategory::RateLimit => {
            format!("{count} rate limit hit(s): lower the hourly limit or add accounts")
        },
        ErrorCategory::InvalidInput => {
            format!("{count} invalid target(s): review the channel ids before retrying")
        },
        ErrorCategory::Unknown => {
            format!("{count} unclassified failure(s): inspect last_error on failed items")
        },
    }
}

/// Group failed items by error category and suggest operator actions.
pub fn analyze<'a>(failed: impl IntoIterator<Item = &'a WorkItem>) -> ErrorAnalysis {
    let mut error_types: BTreeMap<ErrorCategory, usize> = BTreeMap::new();
    let mut total_errors = 0;

    for item in failed {
        let category = item.last_error.as_deref().map_or(ErrorCategory::Unknown, categorize);
        *error_types.entry(category).or_default() += 1;
        total_errors += 1;
    }

    let recommendations =
        error_types.iter().map(|(category, count)| recommendation(*category, *count)).collect();

    ErrorAnalysis { total_errors, error_types, recommendations }
}
