use std::ops::RangeInclusive;

use crate::{
    error::{AuditError, AuditResult},
    mask::Mask,
    MAX_CANDIDATE_LENGTH,
};

/// A finite space of candidates, made of one charset per position.
/// Candidates are ordered by length first, then lexicographically by charset order,
/// the last position changing the fastest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keyspace {
    /// The charsets of the first positions.
    /// The last one is used for every position after them.
    charsets: Vec<Vec<char>>,
    /// The length of the shortest candidate.
    min_len: usize,
    /// The length of the longest candidate.
    max_len: usize,
    /// The number of candidates shorter than each length, plus the size of the space.
    /// `search_spaces[i]` is the counter of the first candidate of length `min_len + i`.
    search_spaces: Vec<u64>,
}

impl Keyspace {
    /// Creates the brute force space over a single charset, for every length of the range.
    pub fn brute(charset: Vec<char>, lengths: RangeInclusive<usize>) -> AuditResult<Self> {
        let (min_len, max_len) = lengths.into_inner();

        if min_len > max_len {
            return Err(AuditError::LengthRange {
                min: min_len,
                max: max_len,
            });
        }

        if charset.is_empty() {
            return Err(AuditError::EmptyCharset);
        }

        Self::new(vec![charset], min_len, max_len)
    }

    /// Creates the space of a mask attack, where each position has its own charset.
    pub fn positional(charsets: Vec<Vec<char>>) -> AuditResult<Self> {
        if charsets.is_empty() || charsets.iter().any(Vec::is_empty) {
            return Err(AuditError::EmptyCharset);
        }

        let len = charsets.len();
        Self::new(charsets, len, len)
    }

    /// Creates the space of the candidates of `len` characters starting with one of `first`,
    /// the other positions taking any character of `rest`.
    pub fn prefixed(first: Vec<char>, rest: Vec<char>, len: usize) -> AuditResult<Self> {
        if first.is_empty() || rest.is_empty() {
            return Err(AuditError::EmptyCharset);
        }

        Self::new(vec![first, rest], len, len)
    }

    /// Creates the brute force space of a flattened mask.
    pub fn from_mask_flat(mask: &Mask, lengths: RangeInclusive<usize>) -> AuditResult<Self> {
        Self::brute(mask.flatten()?, lengths)
    }

    /// Creates the positional space of a mask.
    pub fn from_mask(mask: &Mask) -> AuditResult<Self> {
        Self::positional(mask.positions()?)
    }

    fn new(charsets: Vec<Vec<char>>, min_len: usize, max_len: usize) -> AuditResult<Self> {
        let mut keyspace = Self {
            charsets,
            min_len,
            max_len,
            search_spaces: Vec::new(),
        };

        // candidates of the current length, and candidates of the lengths before it
        let mut space: u128 = 1;
        let mut n: u128 = 0;

        for len in 0..=max_len {
            if len > 0 {
                space *= keyspace.charset(len - 1).len() as u128;
            }

            // make sure the search space is <= 2^64, lengths only make it grow
            let total = if len >= min_len { n + space } else { space };
            if total > u64::MAX as u128 {
                return Err(AuditError::Space((total as f64).log2().ceil() as u8));
            }

            if len > MAX_CANDIDATE_LENGTH {
                return Err(AuditError::CandidateLength(MAX_CANDIDATE_LENGTH));
            }

            if len >= min_len {
                keyspace.search_spaces.push(n as u64);
                n = total;
            }
        }
        keyspace.search_spaces.push(n as u64);

        Ok(keyspace)
    }

    fn charset(&self, position: usize) -> &[char] {
        let last = self.charsets.len().saturating_sub(1);
        &self.charsets[position.min(last)]
    }

    /// Returns the number of candidates in the space.
    pub fn len(&self) -> u64 {
        self.search_spaces.last().copied().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the lengths of the candidates of the space.
    pub fn lengths(&self) -> RangeInclusive<usize> {
        self.min_len..=self.max_len
    }

    /// Returns the candidate at the given counter, or `None` if the counter is out of the space.
    pub fn candidate(&self, counter: u64) -> Option<String> {
        if counter >= self.len() {
            return None;
        }

        // the last search space is the size of the space, skip it
        let spaces = &self.search_spaces[..self.search_spaces.len() - 1];
        let index = spaces.iter().rposition(|space| counter >= *space)?;
        let len = self.min_len + index;
        let mut counter = counter - spaces[index];

        let mut plaintext = vec!['\0'; len];
        for (position, c) in plaintext.iter_mut().enumerate().rev() {
            let charset = self.charset(position);
            let base = charset.len() as u64;
            *c = charset[(counter % base) as usize];
            counter /= base;
        }

        Some(plaintext.into_iter().collect())
    }

    /// Returns an iterator over all the candidates.
    pub fn iter(&self) -> KeyspaceIterator {
        KeyspaceIterator {
            keyspace: self.clone(),
            counter: 0,
        }
    }
}

impl IntoIterator for Keyspace {
    type Item = String;
    type IntoIter = KeyspaceIterator;

    fn into_iter(self) -> Self::IntoIter {
        KeyspaceIterator {
            keyspace: self,
            counter: 0,
        }
    }
}

/// An iterator over the candidates of a keyspace.
#[derive(Clone, Debug)]
pub struct KeyspaceIterator {
    keyspace: Keyspace,
    counter: u64,
}

impl KeyspaceIterator {
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }
}

impl Iterator for KeyspaceIterator {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        let candidate = self.keyspace.candidate(self.counter)?;
        self.counter += 1;

        Some(candidate)
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.counter = self.counter.saturating_add(n as u64);
        self.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.keyspace.len().saturating_sub(self.counter);
        let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);

        (remaining, Some(remaining))
    }
}
