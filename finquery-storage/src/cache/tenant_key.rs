//! Tenant-scoped response cache keys.
//!
//! `ResponseCacheKey`'s private inner makes it impossible to build a key
//! without a tenant: the only constructor takes one, and the tenant is both
//! part of the readable prefix and of the hashed content.

use finquery_core::TenantId;
use sha2::{Digest, Sha256};

use super::pattern;

/// Namespace and format version of every response cache key.
pub const KEY_PREFIX: &str = "finquery:v1";

/// A cache key derived from `(tenant_id, normalized question)`.
///
/// # Format
///
/// `finquery:v1:{tenant}:{sha256-hex}` where `{tenant}` is the tenant id
/// with `%` and `:` percent-escaped, so one tenant's prefix can never be a
/// prefix of another's.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResponseCacheKey {
    inner: KeyInner,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct KeyInner {
    tenant_id: TenantId,
    encoded: String,
}

impl ResponseCacheKey {
    /// Derive the key for a tenant's question. Pure and deterministic.
    pub fn new(tenant_id: &TenantId, question: &str) -> Self {
        let normalized = normalize_question(question);

        let mut hasher = Sha256::new();
        hasher.update(tenant_id.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(normalized.as_bytes());
        let digest = hex::encode(hasher.finalize());

        Self {
            inner: KeyInner {
                tenant_id: tenant_id.clone(),
                encoded: format!("{}{}", tenant_prefix(tenant_id), digest),
            },
        }
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.inner.tenant_id
    }

    pub fn as_str(&self) -> &str {
        &self.inner.encoded
    }
}

impl std::fmt::Display for ResponseCacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner.encoded)
    }
}

/// Sentence-final punctuation ignored when comparing questions.
const TRAILING_PUNCTUATION: &[char] = &['?', '!', '.'];

/// Lowercase, trim, collapse internal whitespace runs to one space, and drop
/// trailing `?`, `!` and `.` so "…on food?" and "…on food" share a key.
pub fn normalize_question(question: &str) -> String {
    let collapsed = question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(TRAILING_PUNCTUATION)
        .trim_end()
        .to_string()
}

/// Readable key prefix shared by all of a tenant's entries.
pub fn tenant_prefix(tenant_id: &TenantId) -> String {
    let escaped = tenant_id.as_str().replace('%', "%25").replace(':', "%3A");
    format!("{}:{}:", KEY_PREFIX, escaped)
}

/// Glob pattern matching exactly one tenant's entries.
pub fn tenant_pattern(tenant_id: &TenantId) -> String {
    format!("{}*", pattern::escape(&tenant_prefix(tenant_id)))
}
