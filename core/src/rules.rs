use indexmap::IndexSet;

/// Leetspeak substitutions, by lowercase letter.
const SUBSTITUTIONS: &[(char, &[char])] = &[
    ('a', &['@', '4']),
    ('e', &['3']),
    ('i', &['1', '!']),
    ('o', &['0']),
    ('s', &['5', '$']),
    ('t', &['7']),
];

/// Suffixes appended to every word, after the numeric ones.
const SUFFIXES: &[&str] = &["123", "!"];

/// The variants of a base word.
/// The base word is always the first variant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutationSet(IndexSet<String>);

impl MutationSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.0.contains(variant)
    }

    pub fn iter(&self) -> indexmap::set::Iter<'_, String> {
        self.0.iter()
    }

    fn insert(&mut self, variant: String) {
        self.0.insert(variant);
    }
}

impl IntoIterator for MutationSet {
    type Item = String;
    type IntoIter = indexmap::set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a MutationSet {
    type Item = &'a String;
    type IntoIter = indexmap::set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Expands a base word into its common password variants.
/// Every rule is applied to the original word, rules are never chained.
#[derive(Copy, Clone, Debug, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Returns all the variants of a word.
    pub fn mutate(&self, word: &str) -> MutationSet {
        let mut variants = MutationSet::default();

        variants.insert(word.to_owned());
        variants.insert(capitalize(word));
        variants.insert(word.to_uppercase());

        let lowercase = word.to_lowercase();
        for &(letter, replacements) in SUBSTITUTIONS {
            if !lowercase.contains(letter) {
                continue;
            }

            let upper_letter = letter.to_ascii_uppercase();
            for &replacement in replacements {
                variants.insert(word.replace(letter, &replacement.to_string()));
                variants.insert(word.replace(upper_letter, &replacement.to_string()));
            }
        }

        for i in 0..100 {
            variants.insert(format!("{word}{i}"));
            if i < 10 {
                variants.insert(format!("{word}0{i}"));
            }
        }

        for i in 0..10 {
            variants.insert(format!("{i}{word}"));
        }

        for suffix in SUFFIXES {
            variants.insert(format!("{word}{suffix}"));
        }

        variants
    }

    /// Returns the number of variants of a word.
    pub fn mutation_count(&self, word: &str) -> usize {
        self.mutate(word).len()
    }
}

/// Uppercases the first character and lowercases the others.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();

    match chars.next() {
        None => String::new(),
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
    }
}
