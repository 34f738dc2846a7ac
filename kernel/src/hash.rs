//! Canonical hashing types and domain separation constants.
//!
//! Algorithm: SHA-256 for every fingerprint. Each domain prefix is
//! null-terminated so that no prefix is a prefix of another domain's bytes.
//!
//! **Exactly one place defines canonical hashing.** The state graph cache
//! keys nodes by the [`ContentHash`] produced here.

use sha2::{Digest, Sha256};

use crate::vector::SparseVector;

/// A content-addressed hash with algorithm identifier.
///
/// Format: `"algorithm:hex_digest"` (e.g., `"sha256:abcdef..."`)
///
/// Invariant: the inner string always contains exactly one `:` separator,
/// with non-empty substrings on both sides (enforced by [`ContentHash::parse`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash {
    /// Full string in `"algorithm:hex_digest"` format.
    full: String,
    /// Byte offset of the `:` separator (cached from parse).
    colon: usize,
}

impl ContentHash {
    /// Parse from `"algorithm:hex"` format.
    ///
    /// Returns `None` if the format is invalid (missing colon,
    /// empty algorithm, or empty digest).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let colon = s.find(':')?;
        if colon == 0 || colon == s.len() - 1 {
            return None;
        }
        Some(Self {
            full: s.to_string(),
            colon,
        })
    }

    /// The algorithm portion (e.g., "sha256").
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.full[..self.colon]
    }

    /// The hex digest portion.
    #[must_use]
    pub fn hex_digest(&self) -> &str {
        &self.full[self.colon + 1..]
    }

    /// The full string representation (`"algorithm:hex_digest"`).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.full
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full)
    }
}

/// Domain prefix for state vector (MDP state or belief) fingerprints.
pub const DOMAIN_STATE_VECTOR: &[u8] = b"HORIZON::STATE_VECTOR::V1\0";

/// Domain prefix for digests of solve reports (cross-process comparison).
pub const DOMAIN_RUN_REPORT: &[u8] = b"HORIZON::RUN_REPORT::V1\0";

/// Compute the canonical hash of a byte slice with domain separation.
///
/// Result format: `"sha256:<hex_digest>"`.
#[must_use]
pub fn canonical_hash(domain: &[u8], data: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    let digest = hasher.finalize();
    let full = format!("sha256:{}", hex::encode(digest));
    ContentHash { full, colon: 6 }
}

/// Fingerprint of a state vector: the dedup key of the state graph cache.
///
/// Two vectors share a fingerprint iff their canonical identity bytes are
/// identical (same dimension, same support, bit-identical weights).
#[must_use]
pub fn state_fingerprint(state: &SparseVector) -> ContentHash {
    canonical_hash(DOMAIN_STATE_VECTOR, &state.identity_bytes())
}
