//! Masks describe the shape of candidates with literals and charset classes.
//!
//! A mask can be read in two ways:
//! - positionally ([`Mask::positions`]), where every token is one position of the candidate,
//!   which is what a mask attack enumerates.
//! - flattened ([`Mask::flatten`]), where all the tokens are merged into a single charset,
//!   which is what a brute force attack enumerates for every length of a range.

use std::{convert::Infallible, fmt::Display, str::FromStr};

use itertools::Itertools;

use crate::error::{AuditError, AuditResult};

/// The lowercase letters, `?l`.
pub const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

/// The uppercase letters, `?u`.
pub const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// The digits, `?d`.
pub const DIGITS: &str = "0123456789";

/// The special characters, `?s`.
pub const SPECIAL: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

/// A group of characters selected by a `?x` token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CharsetClass {
    Lower,
    Upper,
    Digit,
    Special,
    All,
}

impl CharsetClass {
    /// Returns the class of a token character, the `l` in `?l`.
    pub fn from_token(c: char) -> Option<Self> {
        match c {
            'l' => Some(Self::Lower),
            'u' => Some(Self::Upper),
            'd' => Some(Self::Digit),
            's' => Some(Self::Special),
            'a' => Some(Self::All),
            _ => None,
        }
    }

    pub fn token(&self) -> char {
        match self {
            Self::Lower => 'l',
            Self::Upper => 'u',
            Self::Digit => 'd',
            Self::Special => 's',
            Self::All => 'a',
        }
    }

    /// Returns the characters of the class, in a fixed order.
    pub fn chars(&self) -> Vec<char> {
        match self {
            Self::Lower => LOWER.chars().collect(),
            Self::Upper => UPPER.chars().collect(),
            Self::Digit => DIGITS.chars().collect(),
            Self::Special => SPECIAL.chars().collect(),
            Self::All => [LOWER, UPPER, DIGITS, SPECIAL]
                .into_iter()
                .flat_map(str::chars)
                .collect(),
        }
    }
}

/// A token of a mask.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MaskToken {
    Literal(char),
    Class(CharsetClass),
}

impl MaskToken {
    /// Returns the characters this token can take.
    pub fn chars(&self) -> Vec<char> {
        match self {
            Self::Literal(c) => vec![*c],
            Self::Class(class) => class.chars(),
        }
    }
}

/// A parsed mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    tokens: Vec<MaskToken>,
}

impl Mask {
    /// Parses a mask.
    /// A `?` followed by an unknown class character is kept literally,
    /// as is a trailing `?`.
    pub fn parse(mask: &str) -> Self {
        let mut tokens = Vec::new();
        let mut chars = mask.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '?' {
                if let Some(class) = chars.peek().copied().and_then(CharsetClass::from_token) {
                    chars.next();
                    tokens.push(MaskToken::Class(class));
                    continue;
                }
            }

            tokens.push(MaskToken::Literal(c));
        }

        Self { tokens }
    }

    pub fn tokens(&self) -> &[MaskToken] {
        &self.tokens
    }

    /// Returns the number of positions of the mask.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns one charset per position.
    pub fn positions(&self) -> AuditResult<Vec<Vec<char>>> {
        if self.tokens.is_empty() {
            return Err(AuditError::EmptyCharset);
        }

        Ok(self.tokens.iter().map(MaskToken::chars).collect())
    }

    /// Returns the union of all the charsets of the mask, in order of first appearance
    /// and without duplicates.
    pub fn flatten(&self) -> AuditResult<Vec<char>> {
        let charset = self
            .tokens
            .iter()
            .flat_map(MaskToken::chars)
            .unique()
            .collect_vec();

        if charset.is_empty() {
            return Err(AuditError::EmptyCharset);
        }

        Ok(charset)
    }
}

impl FromStr for Mask {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Display for Mask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for token in &self.tokens {
            match token {
                MaskToken::Literal(c) => write!(f, "{c}")?,
                MaskToken::Class(class) => write!(f, "?{}", class.token())?,
            }
        }

        Ok(())
    }
}
