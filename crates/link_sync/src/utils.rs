use chrono::{DateTime, Utc};
use itertools::Itertools;
use sha2::{Digest, Sha256};

use crate::cache::CacheKey;
use crate::UNKNOWN_TIMESTAMP;
use link_sync_integrity::LinkExpression;

pub fn get_now() -> DateTime<Utc> {
    Utc::now()
}

/// RFC 3339 timestamps from the store; anything else maps to the
/// unknown-timestamp sentinel.
pub fn parse_timestamp(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|value| DateTime::parse_from_rfc3339(value).ok())
        .map(|value| value.with_timezone(&Utc))
        .unwrap_or(*UNKNOWN_TIMESTAMP)
}

/// Keeps the first expression per cache key.
pub fn dedup_links(links: Vec<LinkExpression>) -> Vec<LinkExpression> {
    links
        .into_iter()
        .unique_by(|link| CacheKey::from(link))
        .collect()
}

/// SHA-256 over source, predicate, target, author and timestamp, hex encoded.
pub fn content_hash(link: &LinkExpression) -> String {
    let mut hasher = Sha256::new();
    let timestamp = link.timestamp.to_rfc3339();
    let fields = [
        link.data.source.as_str(),
        link.data.predicate.as_str(),
        link.data.target.as_str(),
        link.author.as_str(),
        timestamp.as_str(),
    ];
    for field in fields.iter() {
        hasher.update(field.as_bytes());
        // unit separator, so ("ab", "c") and ("a", "bc") differ
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}

#[allow(dead_code)]
pub fn create_link_expression(source: &str, target: &str) -> LinkExpression {
    use link_sync_integrity::{ExpressionProof, Triple};

    LinkExpression {
        author: String::from("Test author"),
        data: Triple::new(source, "p", target),
        timestamp: *UNKNOWN_TIMESTAMP,
        proof: ExpressionProof {
            signature: String::from("sig"),
            key: String::from("key"),
            valid: false,
        },
    }
}
