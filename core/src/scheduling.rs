use serde::Serialize;

use crate::{error::AuditResult, keyspace::Keyspace, mask::Mask};

/// A part of a brute force keyspace that can be processed independently.
/// It contains every candidate of `length` characters starting with one of `first_chars`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WorkUnit {
    pub id: usize,
    pub length: usize,
    /// Empty for the unit of the empty candidate.
    pub first_chars: Vec<char>,
}

impl WorkUnit {
    /// Returns the keyspace of the unit, given the charset the split was made on.
    pub fn keyspace(&self, charset: &[char]) -> AuditResult<Keyspace> {
        if self.length == 0 {
            return Keyspace::brute(charset.to_vec(), 0..=0);
        }

        Keyspace::prefixed(self.first_chars.clone(), charset.to_vec(), self.length)
    }
}

/// Splits the brute force keyspace of a mask into work units.
/// For each length, the flattened charset is cut into chunks of first characters,
/// so that each worker gets about one chunk per length.
pub fn split_keyspace(
    mask: &str,
    min_len: usize,
    max_len: usize,
    workers: usize,
) -> AuditResult<Vec<WorkUnit>> {
    // make sure the whole space is valid before splitting it
    let mask = Mask::parse(mask);
    let keyspace = Keyspace::from_mask_flat(&mask, min_len..=max_len)?;
    let charset = mask.flatten()?;
    let chunk_size = (charset.len() / workers.max(1)).max(1);

    let mut units = Vec::new();
    for length in keyspace.lengths() {
        if length == 0 {
            units.push(WorkUnit {
                id: units.len(),
                length,
                first_chars: Vec::new(),
            });
            continue;
        }

        for chunk in charset.chunks(chunk_size) {
            units.push(WorkUnit {
                id: units.len(),
                length,
                first_chars: chunk.to_vec(),
            });
        }
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use itertools::Itertools;

    use crate::{
        error::AuditError,
        keyspace::Keyspace,
        mask::Mask,
        scheduling::{split_keyspace, WorkUnit},
    };

    #[test]
    fn test_units_cover_keyspace() {
        let units = split_keyspace("?d", 1, 3, 4).unwrap();
        let charset = Mask::parse("?d").flatten().unwrap();

        // 10 digits in chunks of 2, for 3 lengths
        assert_eq!(15, units.len());
        assert!(units.iter().map(|unit| unit.id).eq(0..15));

        let mut seen = HashSet::new();
        for unit in &units {
            for candidate in unit.keyspace(&charset).unwrap() {
                assert_eq!(unit.length, candidate.chars().count());
                // units are disjoint
                assert!(seen.insert(candidate));
            }
        }

        let brute = Keyspace::brute(charset, 1..=3).unwrap();
        assert_eq!(brute.len(), seen.len() as u64);
        assert!(brute.iter().all(|candidate| seen.contains(&candidate)));
    }

    #[test]
    fn test_uneven_chunks() {
        let units = split_keyspace("abcde", 2, 2, 2).unwrap();
        let chunks = units
            .iter()
            .map(|unit| unit.first_chars.iter().collect::<String>())
            .collect_vec();

        assert_eq!(vec!["ab", "cd", "e"], chunks);
    }

    #[test]
    fn test_more_workers_than_chars() {
        let units = split_keyspace("ab", 1, 1, 8).unwrap();

        assert_eq!(2, units.len());
        assert_eq!(vec!['a'], units[0].first_chars);
        assert_eq!(vec!['b'], units[1].first_chars);
    }

    #[test]
    fn test_empty_length_unit() {
        let units = split_keyspace("xy", 0, 1, 1).unwrap();

        assert_eq!(2, units.len());
        assert!(units[0].first_chars.is_empty());
        assert_eq!(
            vec![""],
            units[0].keyspace(&['x', 'y']).unwrap().iter().collect_vec()
        );
    }

    #[test]
    fn test_invalid_split() {
        assert!(matches!(
            split_keyspace("?d", 5, 2, 4),
            Err(AuditError::LengthRange { min: 5, max: 2 })
        ));
        assert!(matches!(
            split_keyspace("", 1, 2, 4),
            Err(AuditError::EmptyCharset)
        ));
    }

    #[test]
    fn test_oversized_unit() {
        let unit = WorkUnit {
            id: 0,
            length: usize::MAX,
            first_chars: vec!['a'],
        };

        assert!(matches!(
            unit.keyspace(&['a', 'b']),
            Err(AuditError::Space(_))
        ));
    }
}
