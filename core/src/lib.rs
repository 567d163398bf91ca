mod analysis;
mod error;
mod event;
mod generator;
mod hash;
mod keyspace;
mod mask;
mod params;
mod registry;
mod rules;
mod scheduling;
mod session;
mod wordlist;

pub use {
    analysis::{CharDistribution, PatternCounts, WordlistStats},
    error::{AuditError, AuditResult},
    event::Event,
    generator::{CandidateGenerator, RuledWords},
    hash::{HashFunction, HashOracle},
    keyspace::{Keyspace, KeyspaceIterator},
    mask::{CharsetClass, Mask, MaskToken, DIGITS, LOWER, SPECIAL, UPPER},
    params::{AttackMethod, AttackParams, AttackRequest, TargetSpec},
    registry::{SessionRegistry, EVENT_CAPACITY},
    rules::{MutationSet, RuleEngine},
    scheduling::{split_keyspace, WorkUnit},
    session::{AttackSession, SessionId, Snapshot, Status},
    wordlist::{count_words, WordList},
};

/// The default mask of brute force and mask attacks.
pub const DEFAULT_MASK: &str = "?l?d";

/// The default minimum candidate length of a brute force attack.
pub const DEFAULT_MIN_LENGTH: usize = 1;

/// The default maximum candidate length of a brute force attack.
pub const DEFAULT_MAX_LENGTH: usize = 6;

/// The length of the longest candidate a keyspace can hold.
pub const MAX_CANDIDATE_LENGTH: usize = 256;

/// The default word source of dictionary and rule attacks.
pub const DEFAULT_WORDLIST: &str = "wordlists/common.txt";

/// The progress reported by a running session never goes above this value.
/// Only a finished session reports a progress of 100%.
pub const PROGRESS_CAP: f64 = 95.;

/// The default number of workers to split a keyspace for.
pub const DEFAULT_WORKERS: usize = 4;
