//! Stable content-derived domain identity
//!
//! Repeated observations of the same domain across crawls and batches are
//! unified by a deterministic digest of the normalized domain string. The
//! key is a deduplication/join key only, never a security token.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A domain string paired with its stable identity key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainIdentity {
    pub raw_domain: String,
    /// Hex-encoded SHA-256 of `lower(trim(raw_domain))`, 64 chars
    pub identity_key: String,
}

impl DomainIdentity {
    pub fn new(raw_domain: &str) -> Self {
        Self {
            raw_domain: raw_domain.to_string(),
            identity_key: identity_key(raw_domain),
        }
    }
}

/// Compute the identity key for a domain string.
///
/// Pure and total: identical normalized inputs always yield identical keys,
/// distinct normalized inputs yield distinct keys with overwhelming
/// probability.
pub fn identity_key(domain: &str) -> String {
    let normalized = domain.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)
}
