use std::{io::BufRead, path::Path};

use serde::Serialize;
use tracing::warn;

use crate::{
    error::{AuditError, AuditResult},
    wordlist::WordList,
};

/// The number of characters of each class in a word source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CharDistribution {
    pub lowercase: u64,
    pub uppercase: u64,
    pub digits: u64,
    pub special: u64,
}

/// The number of words following common password patterns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PatternCounts {
    pub ends_with_number: u64,
    pub starts_with_upper: u64,
    /// Words containing something that looks like a year, 19xx or 20xx.
    pub contains_year: u64,
    /// Words with at least one letter and no uppercase letter.
    pub all_lowercase: u64,
}

/// Statistics about the words of a word source.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WordlistStats {
    pub total_words: u64,
    /// Average length in characters.
    pub average_length: f64,
    pub char_distribution: CharDistribution,
    pub patterns: PatternCounts,
}

impl WordlistStats {
    /// Analyzes the word source at the given path.
    pub fn analyze_path(path: &Path) -> AuditResult<Self> {
        let words = WordList::open(path)?;

        Self::analyze_words(words).map_err(|source| AuditError::WordSource {
            path: path.to_owned(),
            source,
        })
    }

    /// Analyzes a word source, read with the same rules as a dictionary attack.
    pub fn analyze<R: BufRead>(reader: R) -> std::io::Result<Self> {
        Self::analyze_words(WordList::new(reader))
    }

    fn analyze_words<R: BufRead>(mut words: WordList<R>) -> std::io::Result<Self> {
        let mut stats = Self::default();
        let mut total_length = 0;

        for word in words.by_ref() {
            let word = word?;
            stats.total_words += 1;
            total_length += word.chars().count() as u64;
            stats.add_word(&word);
        }

        if words.skipped() > 0 {
            warn!("Skipped {} lines that are not valid UTF-8", words.skipped());
        }

        if stats.total_words > 0 {
            stats.average_length = total_length as f64 / stats.total_words as f64;
        }

        Ok(stats)
    }

    fn add_word(&mut self, word: &str) {
        let distribution = &mut self.char_distribution;
        for c in word.chars() {
            if c.is_lowercase() {
                distribution.lowercase += 1;
            } else if c.is_uppercase() {
                distribution.uppercase += 1;
            } else if c.is_numeric() {
                distribution.digits += 1;
            } else {
                distribution.special += 1;
            }
        }

        let patterns = &mut self.patterns;
        if word.chars().last().is_some_and(char::is_numeric) {
            patterns.ends_with_number += 1;
        }
        if word.chars().next().is_some_and(char::is_uppercase) {
            patterns.starts_with_upper += 1;
        }
        if contains_year(word) {
            patterns.contains_year += 1;
        }
        if word.chars().any(char::is_lowercase) && !word.chars().any(char::is_uppercase) {
            patterns.all_lowercase += 1;
        }
    }
}

fn contains_year(word: &str) -> bool {
    let chars = word.chars().collect::<Vec<_>>();

    chars.windows(4).any(|window| {
        matches!(window[..2], ['1', '9'] | ['2', '0'])
            && window[2..].iter().all(|c| c.is_numeric())
    })
}
