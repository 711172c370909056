use std::collections::HashSet;
use std::hash::Hash;

/// Result of reducing a multiset to its distinct values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deduplicated<T> {
    /// Distinct values in first-occurrence order
    pub unique: Vec<T>,
    /// Every non-first occurrence, in order of appearance
    pub duplicates: Vec<T>,
}

impl<T> Deduplicated<T> {
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }
}

/// Split `items` into distinct values and repeated occurrences in one pass.
///
/// A value seen three times contributes two entries to `duplicates`.
pub fn deduplicate<T, I>(items: I) -> Deduplicated<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    let mut duplicates = Vec::new();

    for item in items {
        if seen.insert(item.clone()) {
            unique.push(item);
        } else {
            duplicates.push(item);
        }
    }

    Deduplicated { unique, duplicates }
}
