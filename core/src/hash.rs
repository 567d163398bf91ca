use std::{fmt::Display, str::FromStr};

use digest::Digest as _;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use tracing::warn;

use crate::error::{AuditError, AuditResult};

/// All the supported hash functions.
#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HashFunction {
    Md5,
    Sha1,
    Sha256,
    /// Approximated as the MD5 digest truncated to 32 hex characters.
    /// This is not the real NT hash (MD4 over UTF-16LE).
    Ntlm,
}

impl HashFunction {
    /// Parses an algorithm name, case-insensitively.
    /// Unknown names fall back to MD5.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!("Unknown hash algorithm `{name}`, falling back to MD5");
            Self::Md5
        })
    }

    /// Returns the size of a digest in bytes.
    pub fn digest_size(&self) -> usize {
        match self {
            Self::Md5 | Self::Ntlm => 16,
            Self::Sha1 => 20,
            Self::Sha256 => 32,
        }
    }
}

impl FromStr for HashFunction {
    type Err = AuditError;

    fn from_str(s: &str) -> AuditResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "ntlm" => Ok(Self::Ntlm),
            _ => Err(AuditError::UnknownAlgorithm(s.to_owned())),
        }
    }
}

impl Display for HashFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Ntlm => "ntlm",
        };

        f.write_str(name)
    }
}

/// Hashes candidates and compares them to a target digest.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HashOracle {
    hash_function: HashFunction,
}

impl HashOracle {
    pub fn new(hash_function: HashFunction) -> Self {
        Self { hash_function }
    }

    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    /// Returns the raw digest of a plaintext.
    pub fn digest_bytes(&self, plaintext: &str) -> Vec<u8> {
        let plaintext = plaintext.as_bytes();

        match self.hash_function {
            // 32 hex characters are exactly the 16 bytes of a MD5 digest
            HashFunction::Md5 | HashFunction::Ntlm => Md5::digest(plaintext).to_vec(),
            HashFunction::Sha1 => Sha1::digest(plaintext).to_vec(),
            HashFunction::Sha256 => Sha256::digest(plaintext).to_vec(),
        }
    }

    /// Returns the lowercase hexadecimal digest of a plaintext.
    pub fn digest(&self, plaintext: &str) -> String {
        hex::encode(self.digest_bytes(plaintext))
    }

    /// Returns true if the plaintext hashes to the given hexadecimal digest.
    /// The comparison is case-insensitive.
    pub fn matches(&self, plaintext: &str, target_hex: &str) -> bool {
        self.digest(plaintext).eq_ignore_ascii_case(target_hex.trim())
    }

    /// Returns true if the plaintext hashes to the given raw digest.
    #[inline]
    pub fn matches_digest(&self, plaintext: &str, target: &[u8]) -> bool {
        self.digest_bytes(plaintext) == target
    }
}
