use std::{fmt::Display, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    error::{AuditError, AuditResult},
    hash::{HashFunction, HashOracle},
    keyspace::Keyspace,
    mask::Mask,
    DEFAULT_MASK, DEFAULT_MAX_LENGTH, DEFAULT_MIN_LENGTH, DEFAULT_WORDLIST,
};

/// The digest to attack and the hash function that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetSpec {
    hash_value: String,
    digest: Vec<u8>,
    hash_function: HashFunction,
}

impl TargetSpec {
    /// Creates a new target from an hexadecimal digest.
    pub fn new(hash_value: &str, hash_function: HashFunction) -> AuditResult<Self> {
        let hash_value = hash_value.trim().to_ascii_lowercase();
        let digest = hex::decode(&hash_value).map_err(|_| AuditError::InvalidDigest)?;

        if digest.len() != hash_function.digest_size() {
            warn!(
                "The target digest is {} bytes long but {hash_function} digests are {} bytes long, \
                it cannot be matched",
                digest.len(),
                hash_function.digest_size()
            );
        }

        Ok(Self {
            hash_value,
            digest,
            hash_function,
        })
    }

    /// Returns the digest, in lowercase hexadecimal.
    pub fn hash_value(&self) -> &str {
        &self.hash_value
    }

    /// Returns the raw digest.
    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    /// Returns the oracle testing candidates against this target.
    pub fn oracle(&self) -> HashOracle {
        HashOracle::new(self.hash_function)
    }
}

/// The kinds of attacks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackMethod {
    Dict,
    Rule,
    Brute,
    Mask,
}

impl FromStr for AttackMethod {
    type Err = AuditError;

    fn from_str(s: &str) -> AuditResult<Self> {
        match s {
            "dict" => Ok(Self::Dict),
            "rule" => Ok(Self::Rule),
            "brute" => Ok(Self::Brute),
            "mask" => Ok(Self::Mask),
            _ => Err(AuditError::UnknownMethod(s.to_owned())),
        }
    }
}

impl Display for AttackMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Dict => "dict",
            Self::Rule => "rule",
            Self::Brute => "brute",
            Self::Mask => "mask",
        };

        f.write_str(name)
    }
}

/// The parameters of an attack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttackParams {
    /// Tries every word of a wordlist.
    Dictionary { path: PathBuf },
    /// Tries every variant of every word of a wordlist.
    Rule { path: PathBuf },
    /// Tries every combination of the flattened mask charset, for every length of the range.
    Brute {
        mask: String,
        min_len: usize,
        max_len: usize,
    },
    /// Tries every candidate matching the mask, position by position.
    MaskAttack { mask: String },
}

impl AttackParams {
    pub fn method(&self) -> AttackMethod {
        match self {
            Self::Dictionary { .. } => AttackMethod::Dict,
            Self::Rule { .. } => AttackMethod::Rule,
            Self::Brute { .. } => AttackMethod::Brute,
            Self::MaskAttack { .. } => AttackMethod::Mask,
        }
    }

    /// Returns the keyspace of a brute force or mask attack, `None` for wordlist attacks.
    /// Fails if the mask or the lengths are invalid.
    pub fn keyspace(&self) -> AuditResult<Option<Keyspace>> {
        let keyspace = match self {
            Self::Brute {
                mask,
                min_len,
                max_len,
            } => Keyspace::from_mask_flat(&Mask::parse(mask), *min_len..=*max_len)?,
            Self::MaskAttack { mask } => Keyspace::from_mask(&Mask::parse(mask))?,
            Self::Dictionary { .. } | Self::Rule { .. } => return Ok(None),
        };

        Ok(Some(keyspace))
    }

    /// Checks the parameters that can be checked without reading a word source.
    pub fn validate(&self) -> AuditResult<()> {
        self.keyspace().map(|_| ())
    }
}

/// An attack request, as sent by a front-end.
/// Missing fields take their default values.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct AttackRequest {
    pub target_hash: String,
    /// The hash algorithm name. Unknown names fall back to MD5.
    #[serde(default)]
    pub hash_type: Option<String>,
    pub method: String,
    #[serde(default)]
    pub wordlist: Option<PathBuf>,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
}

impl AttackRequest {
    /// Builds the target and the attack parameters of the request.
    pub fn into_parts(self) -> AuditResult<(TargetSpec, AttackParams)> {
        let hash_function = self
            .hash_type
            .as_deref()
            .map_or(HashFunction::Md5, HashFunction::from_name);
        let target = TargetSpec::new(&self.target_hash, hash_function)?;

        let wordlist = || {
            self.wordlist
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORDLIST))
        };
        let mask = || {
            self.charset
                .clone()
                .unwrap_or_else(|| DEFAULT_MASK.to_owned())
        };

        let params = match self.method.parse()? {
            AttackMethod::Dict => AttackParams::Dictionary { path: wordlist() },
            AttackMethod::Rule => AttackParams::Rule { path: wordlist() },
            AttackMethod::Brute => AttackParams::Brute {
                mask: mask(),
                min_len: self.min_length.unwrap_or(DEFAULT_MIN_LENGTH),
                max_len: self.max_length.unwrap_or(DEFAULT_MAX_LENGTH),
            },
            AttackMethod::Mask => AttackParams::MaskAttack { mask: mask() },
        };

        Ok((target, params))
    }
}
