/// OpenPGP key material and fingerprint checks
///
/// Whatever bytes come back from a custom URI or a keyserver are parsed as
/// OpenPGP certificates and only handed out when the computed fingerprint
/// equals the one that was looked up.

pub mod fetcher;

pub use fetcher::KeyMaterialFetcher;

use crate::{
    error::{KeyserverError, KeyserverResult},
    identity::Fingerprint,
};
use sequoia_openpgp::{cert::CertParser, parse::Parse};
use std::fmt;

/// Where a piece of key material came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    CustomUri(String),
    Keyserver(String),
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::CustomUri(uri) => write!(f, "custom uri {}", uri),
            KeySource::Keyserver(url) => write!(f, "keyserver {}", url),
        }
    }
}

/// Raw ASCII-armored or binary public key bytes
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub bytes: Vec<u8>,
    pub source: KeySource,
}

impl KeyMaterial {
    pub fn new(bytes: Vec<u8>, source: KeySource) -> Self {
        Self { bytes, source }
    }

    /// Fingerprints of every certificate in the material
    pub fn fingerprints(&self) -> KeyserverResult<Vec<Fingerprint>> {
        compute_fingerprints(&self.bytes)
    }

    /// Fail unless the material holds exactly the expected certificate
    pub fn verify(&self, expected: &Fingerprint) -> KeyserverResult<()> {
        let found = self.fingerprints().map_err(|e| KeyserverError::FingerprintMismatch {
            expected: expected.prefixed(),
            actual: e.to_string(),
        })?;

        if found.is_empty() {
            return Err(KeyserverError::FingerprintMismatch {
                expected: expected.prefixed(),
                actual: "no OpenPGP certificate".to_string(),
            });
        }

        if let Some(other) = found.iter().find(|fpr| *fpr != expected) {
            return Err(KeyserverError::FingerprintMismatch {
                expected: expected.prefixed(),
                actual: other.prefixed(),
            });
        }

        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Parse certificates out of armored or binary data
pub fn compute_fingerprints(bytes: &[u8]) -> KeyserverResult<Vec<Fingerprint>> {
    let parser = CertParser::from_bytes(bytes)
        .map_err(|e| KeyserverError::BadFingerprint(format!("unreadable key material: {}", e)))?;

    let mut fingerprints = Vec::new();
    for cert in parser {
        let cert = cert.map_err(|e| {
            KeyserverError::BadFingerprint(format!("unreadable certificate: {}", e))
        })?;
        fingerprints.push(Fingerprint::parse(&cert.fingerprint().to_hex())?);
    }
    Ok(fingerprints)
}
