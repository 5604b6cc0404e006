use std::collections::HashMap;

/// Snapshot of the integers that have at least one source image.
///
/// Built once before a composition pass and never mutated during it, so the
/// pass cannot see composites it produced itself. Lookups are by canonical
/// decimal string, which also keeps leading-zero substrings (e.g. "05") from
/// ever matching.
#[derive(Debug, Clone, Default)]
pub struct AvailabilitySet {
    by_string: HashMap<String, u64>,
}

impl AvailabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: u64) {
        self.by_string.insert(value.to_string(), value);
    }

    pub fn contains(&self, value: u64) -> bool {
        self.by_string.contains_key(value.to_string().as_str())
    }

    pub fn len(&self) -> usize {
        self.by_string.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_string.is_empty()
    }

    fn lookup(&self, chunk: &str) -> Option<u64> {
        self.by_string.get(chunk).copied()
    }
}

impl FromIterator<u64> for AvailabilitySet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut set = Self::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

/// Greedy longest-prefix decomposition of `target`'s decimal string into
/// available integers.
///
/// At each cursor position the longest available prefix wins; there is no
/// backtracking, so a greedy dead-end returns `None` even when a different
/// split would have succeeded. That limitation is deliberate: composed
/// output must match the greedy result exactly, not an optimal segmentation.
pub fn decompose(target: u64, available: &AvailabilitySet) -> Option<Vec<u64>> {
    let digits = target.to_string();
    let mut components = Vec::new();
    let mut pos = 0;

    while pos < digits.len() {
        let mut matched = None;
        for end in (pos + 1..=digits.len()).rev() {
            if let Some(value) = available.lookup(&digits[pos..end]) {
                matched = Some((value, end));
                break;
            }
        }
        let (value, end) = matched?;
        components.push(value);
        pos = end;
    }

    Some(components)
}
