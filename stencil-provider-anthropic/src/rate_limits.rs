//! `anthropic-ratelimit-*` response headers.

use chrono::{DateTime, Utc};
use stencil_types::{RawResponse, RateLimit};

const LIMIT_NAMES: &[&str] = &["requests", "tokens", "input-tokens", "output-tokens"];

/// One [`RateLimit`] per limit family that sent at least one header.
pub(crate) fn parse_rate_limits(raw: &RawResponse) -> Vec<RateLimit> {
    LIMIT_NAMES
        .iter()
        .filter_map(|name| {
            let limit = header(raw, name, "limit");
            let remaining = header(raw, name, "remaining");
            let reset = header(raw, name, "reset");
            if limit.is_none() && remaining.is_none() && reset.is_none() {
                return None;
            }
            Some(RateLimit {
                name: (*name).to_string(),
                limit: limit.and_then(|v| v.parse().ok()),
                remaining: remaining.and_then(|v| v.parse().ok()),
                resets_at: reset
                    .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                    .map(|t| t.with_timezone(&Utc)),
            })
        })
        .collect()
}

fn header<'a>(raw: &'a RawResponse, name: &str, field: &str) -> Option<&'a str> {
    raw.header(&format!("anthropic-ratelimit-{name}-{field}"))
}
