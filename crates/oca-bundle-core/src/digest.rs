//! Self-addressing identifiers.
//!
//! A [`Said`] is the content address of a capture base, an overlay or a whole
//! bundle. Its text form is self-describing: a one-character algorithm code
//! followed by the lowercase hex digest, so a future algorithm change is
//! detectable from the identifier alone.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Hash algorithm that produced a [`Said`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DigestAlgorithm {
    /// BLAKE3 with a 256-bit output.
    Blake3_256,
}

impl DigestAlgorithm {
    /// One-character derivation code used in the text form.
    pub const fn code(self) -> char {
        match self {
            Self::Blake3_256 => 'E',
        }
    }

    /// Look up an algorithm by its derivation code.
    pub fn from_code(code: char) -> Option<Self> {
        match code {
            'E' => Some(Self::Blake3_256),
            _ => None,
        }
    }

    /// Digest length in bytes.
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Blake3_256 => 32,
        }
    }

    /// Hash `domain || data`.
    fn hash(self, domain: &[u8], data: &[u8]) -> [u8; 32] {
        match self {
            Self::Blake3_256 => {
                let mut hasher = blake3::Hasher::new();
                hasher.update(domain);
                hasher.update(data);
                *hasher.finalize().as_bytes()
            }
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blake3_256 => f.write_str("blake3-256"),
        }
    }
}

/// Self-addressing identifier: algorithm tag plus digest bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Said {
    algorithm: DigestAlgorithm,
    bytes: [u8; 32],
}

impl Said {
    /// Compute the identifier of `data` under a domain-separation prefix.
    pub fn compute(domain: &[u8], data: &[u8]) -> Self {
        Self::compute_with(DigestAlgorithm::Blake3_256, domain, data)
    }

    /// Compute the identifier with an explicit algorithm.
    pub fn compute_with(algorithm: DigestAlgorithm, domain: &[u8], data: &[u8]) -> Self {
        Self {
            algorithm,
            bytes: algorithm.hash(domain, data),
        }
    }

    /// Create from raw parts.
    pub const fn from_parts(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    /// The algorithm that produced this identifier.
    pub const fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Get the raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Digest bytes as lowercase hex (without the algorithm code).
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for Said {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.algorithm.code(), self.to_hex())
    }
}

impl fmt::Debug for Said {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Said({}{})", self.algorithm.code(), &self.to_hex()[..16])
    }
}

impl FromStr for Said {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let code = chars
            .next()
            .ok_or_else(|| CoreError::MalformedDigest("empty identifier".into()))?;
        let algorithm = DigestAlgorithm::from_code(code).ok_or(CoreError::UnknownAlgorithm(code))?;

        let digest = hex::decode(chars.as_str())
            .map_err(|e| CoreError::MalformedDigest(format!("{s:?}: {e}")))?;
        if digest.len() != algorithm.digest_len() {
            return Err(CoreError::MalformedDigest(format!(
                "{s:?}: expected {} digest bytes, got {}",
                algorithm.digest_len(),
                digest.len()
            )));
        }

        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Ok(Self { algorithm, bytes })
    }
}

impl Serialize for Said {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Said {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_said_text_roundtrip() {
        let said = Said::compute(b"test", b"hello");
        let text = said.to_string();
        assert!(text.starts_with('E'));
        assert_eq!(text.len(), 65);

        let recovered: Said = text.parse().unwrap();
        assert_eq!(said, recovered);
    }

    #[test]
    fn test_said_domain_separation() {
        let a = Said::compute(b"domain-a", b"payload");
        let b = Said::compute(b"domain-b", b"payload");
        assert_ne!(a, b);
    }

    #[test]
    fn test_unknown_algorithm_code() {
        let text = format!("Z{}", "00".repeat(32));
        let result = text.parse::<Said>();
        assert!(matches!(result, Err(CoreError::UnknownAlgorithm('Z'))));
    }

    #[test]
    fn test_wrong_length() {
        let result = "Eabcd".parse::<Said>();
        assert!(matches!(result, Err(CoreError::MalformedDigest(_))));
    }

    #[test]
    fn test_said_debug() {
        let said = Said::from_parts(DigestAlgorithm::Blake3_256, [0xcd; 32]);
        let debug = format!("{:?}", said);
        assert_eq!(debug, "Said(Ecdcdcdcdcdcdcdcd)");
    }

    #[test]
    fn test_said_serde_as_string() {
        let said = Said::from_parts(DigestAlgorithm::Blake3_256, [0xab; 32]);
        let json = serde_json::to_string(&said).unwrap();
        assert_eq!(json, format!("\"E{}\"", "ab".repeat(32)));

        let back: Said = serde_json::from_str(&json).unwrap();
        assert_eq!(back, said);
    }
}
