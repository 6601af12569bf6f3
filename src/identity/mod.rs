/// Identity Resolution System
///
/// Handles id/ name validation, record resolution against the naming
/// backend, fingerprint extraction and the fingerprint → name cache that
/// lets clients follow an index lookup with a get by fingerprint.

pub mod cache;
pub mod record;
pub mod resolver;

pub use cache::FingerprintCache;
pub use record::{extract_fingerprint, IdentityRecord, DISPLAY_FIELDS};
pub use resolver::IdentityRecordResolver;

use crate::error::{KeyserverError, KeyserverResult};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

/// Minimum fingerprint length in hex digits (SHA-1)
pub const MIN_FINGERPRINT_LEN: usize = 40;

lazy_static! {
    static ref IDENTITY_NAME_RE: Regex = Regex::new(r"^id/[a-z0-9]+(-?[a-z0-9])*$").unwrap();
}

/// A validated Namecoin identity name, e.g. `id/phelix`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityName(String);

impl IdentityName {
    pub fn parse(name: &str) -> KeyserverResult<Self> {
        if !IDENTITY_NAME_RE.is_match(name) {
            return Err(KeyserverError::InvalidInput(format!(
                "Wrong id/ format: {}",
                name
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lowercase hex fingerprint, at least 40 digits, stored without prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Validate and normalize. A single leading `0x` is accepted.
    pub fn parse(raw: &str) -> KeyserverResult<Self> {
        let lower = raw.trim().to_lowercase();
        let hex = lower.strip_prefix("0x").unwrap_or(&lower);

        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(KeyserverError::BadFingerprint(format!(
                "not a hex string: {}",
                raw
            )));
        }
        if hex.len() < MIN_FINGERPRINT_LEN {
            return Err(KeyserverError::BadFingerprint(format!(
                "insecure fingerprint, {} digits",
                hex.len()
            )));
        }

        Ok(Self(hex.to_string()))
    }

    /// Whether a search term is a full fingerprint rather than a key id or text
    pub fn looks_like(term: &str) -> bool {
        Self::parse(term).is_ok()
    }

    /// Bare lowercase hex
    pub fn hex(&self) -> &str {
        &self.0
    }

    /// `0x`-prefixed form used as cache key and in protocol text
    pub fn prefixed(&self) -> String {
        format!("0x{}", self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0)
    }
}
