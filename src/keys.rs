//! Key extraction and deterministic partition assignment (§4.D, §6
//! "Record format").

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// The key of a tab-separated record: the substring up to the first tab,
/// or the whole line if it has none.
pub fn key_of(line: &str) -> &str {
    match line.find('\t') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Deterministic (within one process run) assignment of a key to one of
/// `partitions` reducer buckets. Not guaranteed stable across runs or
/// implementations (§9 open question 3).
pub fn partition_of(key: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() as usize) % partitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_of_splits_on_first_tab() {
        assert_eq!(key_of("the\t1"), "the");
        assert_eq!(key_of("nokeyvalue"), "nokeyvalue");
        assert_eq!(key_of("a\tb\tc"), "a");
    }

    #[test]
    fn partition_of_is_deterministic_within_a_run() {
        for _ in 0..100 {
            assert_eq!(partition_of("the", 4), partition_of("the", 4));
        }
    }

    #[test]
    fn partition_of_stays_in_range() {
        for key in ["a", "b", "c", "d", "e", "f"] {
            assert!(partition_of(key, 3) < 3);
        }
    }
}
