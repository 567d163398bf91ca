use std::{
    io::{self, BufRead},
    path::Path,
};

use rayon::prelude::*;
use tracing::debug;

use crate::{
    error::{AuditError, AuditResult},
    keyspace::{Keyspace, KeyspaceIterator},
    mask::Mask,
    params::AttackParams,
    rules::RuleEngine,
    wordlist::{count_words, open_source, WordList},
};

type WordSource = Box<dyn BufRead + Send>;

/// A lazy and finite sequence of candidates, along with the size of the sequence.
/// Iterating it yields an error if the word source becomes unreadable.
pub struct CandidateGenerator {
    total: u64,
    strategy: Strategy,
}

enum Strategy {
    Dictionary(WordList<WordSource>),
    Ruled(RuledWords<WordSource>),
    Keyspace(KeyspaceIterator),
}

impl CandidateGenerator {
    /// Opens the candidate sequence described by the attack parameters.
    /// Word sources are scanned once to compute the size of the sequence.
    pub fn open(params: &AttackParams) -> AuditResult<Self> {
        let generator = match params {
            AttackParams::Dictionary { path } => {
                Self::from_words(open_source(path)?, count_words(path)?)
            }

            AttackParams::Rule { path } => {
                Self::from_ruled_words(open_source(path)?, count_mutations(path)?)
            }

            AttackParams::Brute {
                mask,
                min_len,
                max_len,
            } => Self::from_keyspace(Keyspace::from_mask_flat(
                &Mask::parse(mask),
                *min_len..=*max_len,
            )?),

            AttackParams::MaskAttack { mask } => {
                Self::from_keyspace(Keyspace::from_mask(&Mask::parse(mask))?)
            }
        };

        debug!(
            "Opened a {} generator of {} candidates",
            params.method(),
            generator.total
        );

        Ok(generator)
    }

    /// Creates a generator trying every word of a word source holding `total` words.
    pub fn from_words(source: impl BufRead + Send + 'static, total: u64) -> Self {
        Self {
            total,
            strategy: Strategy::Dictionary(WordList::new(Box::new(source))),
        }
    }

    /// Creates a generator trying every variant of every word of a word source.
    /// `total` is the sum of the variant counts of the words.
    pub fn from_ruled_words(source: impl BufRead + Send + 'static, total: u64) -> Self {
        Self {
            total,
            strategy: Strategy::Ruled(RuledWords::new(WordList::new(Box::new(source)))),
        }
    }

    /// Creates a generator enumerating a keyspace.
    pub fn from_keyspace(keyspace: Keyspace) -> Self {
        Self {
            total: keyspace.len(),
            strategy: Strategy::Keyspace(keyspace.into_iter()),
        }
    }

    /// Returns the number of candidates of the sequence.
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Iterator for CandidateGenerator {
    type Item = AuditResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.strategy {
            Strategy::Dictionary(words) => words.next().map(|word| word.map_err(AuditError::from)),
            Strategy::Ruled(ruled) => ruled.next().map(|word| word.map_err(AuditError::from)),
            Strategy::Keyspace(keyspace) => keyspace.next().map(Ok),
        }
    }
}

/// Yields all the variants of a base word before moving to the next one.
pub struct RuledWords<R> {
    words: WordList<R>,
    engine: RuleEngine,
    variants: Option<indexmap::set::IntoIter<String>>,
}

impl<R: BufRead> RuledWords<R> {
    pub fn new(words: WordList<R>) -> Self {
        Self {
            words,
            engine: RuleEngine::new(),
            variants: None,
        }
    }
}

impl<R: BufRead> Iterator for RuledWords<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(variant) = self.variants.as_mut().and_then(Iterator::next) {
                return Some(Ok(variant));
            }

            match self.words.next()? {
                Ok(word) => self.variants = Some(self.engine.mutate(&word).into_iter()),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Sums the number of variants of every word of the word source at the given path.
fn count_mutations(path: &Path) -> AuditResult<u64> {
    let engine = RuleEngine::new();

    WordList::open(path)?
        .par_bridge()
        .map(|word| word.map(|word| engine.mutation_count(&word) as u64))
        .try_reduce(|| 0, |a, b| Ok(a + b))
        .map_err(|source| AuditError::WordSource {
            path: path.to_owned(),
            source,
        })
}
