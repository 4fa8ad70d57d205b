//! Sorted, disjoint key ranges and lookups over them.

use super::morton::HashKey;
use serde::{Deserialize, Serialize};

/// Closed interval `[start, end]` of Morton keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashRange {
    pub start: HashKey,
    pub end: HashKey,
}

impl HashRange {
    pub fn new(start: HashKey, end: HashKey) -> Self {
        debug_assert!(start <= end, "range start {} > end {}", start, end);
        Self { start, end }
    }

    pub fn single(key: HashKey) -> Self {
        Self::new(key, key)
    }

    pub fn contains(&self, key: HashKey) -> bool {
        self.start <= key && key <= self.end
    }

    /// Number of keys in the range.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// A range always holds at least one key.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }
}

impl From<HashRange> for [HashKey; 2] {
    fn from(range: HashRange) -> Self {
        [range.start, range.end]
    }
}

impl From<(HashKey, HashKey)> for HashRange {
    fn from((start, end): (HashKey, HashKey)) -> Self {
        HashRange::new(start, end)
    }
}

/// Stable sort on range start.
///
/// Ranges coming out of the quad-tree belong to disjoint cells, so no two
/// share a start and ordering on start alone is total.
pub fn sort_ascending(ranges: &mut [HashRange]) {
    ranges.sort_by_key(|r| r.start);
}

/// Fuses neighbouring ranges of a sorted list in place.
///
/// Two consecutive ranges are fused when the second starts at or before one
/// past the end of the first. Afterwards the list is ascending, disjoint, and
/// no two entries are contiguous.
///
/// # Examples
///
/// ```
/// use geoindex::compute::ranges::{HashRange, merge_adjacent};
///
/// let mut ranges = vec![
///     HashRange::new(0, 3),
///     HashRange::new(4, 7),
///     HashRange::new(9, 9),
///     HashRange::new(10, 12),
/// ];
/// merge_adjacent(&mut ranges);
/// assert_eq!(ranges, vec![HashRange::new(0, 7), HashRange::new(9, 12)]);
/// ```
pub fn merge_adjacent(ranges: &mut Vec<HashRange>) {
    if ranges.len() < 2 {
        return;
    }

    let mut write = 0;
    for read in 1..ranges.len() {
        let next = ranges[read];
        let current = &mut ranges[write];
        if next.start <= current.end.saturating_add(1) {
            current.end = current.end.max(next.end);
        } else {
            write += 1;
            ranges[write] = next;
        }
    }
    ranges.truncate(write + 1);
}

/// Outcome of [`binary_search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMatch {
    /// Index of the range holding the key.
    Found(usize),
    /// No range holds the key. `below` is the last range ending before it,
    /// `above` the first range starting after it.
    Between {
        below: Option<usize>,
        above: Option<usize>,
    },
}

impl RangeMatch {
    pub fn is_found(&self) -> bool {
        matches!(self, RangeMatch::Found(_))
    }

    /// Index at which a range holding the key would be inserted.
    pub fn insertion_point(&self) -> Option<usize> {
        match *self {
            RangeMatch::Found(_) => None,
            RangeMatch::Between { below, .. } => Some(below.map_or(0, |b| b + 1)),
        }
    }
}

/// Looks `key` up in a sorted, disjoint range list in O(log n).
///
/// # Examples
///
/// ```
/// use geoindex::compute::ranges::{HashRange, RangeMatch, binary_search};
///
/// let ranges = [HashRange::new(0, 3), HashRange::new(8, 11)];
/// assert_eq!(binary_search(&ranges, 9), RangeMatch::Found(1));
/// assert_eq!(
///     binary_search(&ranges, 5),
///     RangeMatch::Between { below: Some(0), above: Some(1) }
/// );
/// ```
pub fn binary_search(ranges: &[HashRange], key: HashKey) -> RangeMatch {
    let mut low = 0;
    let mut high = ranges.len();
    while low < high {
        let mid = low + (high - low) / 2;
        let range = ranges[mid];
        if key < range.start {
            high = mid;
        } else if key > range.end {
            low = mid + 1;
        } else {
            return RangeMatch::Found(mid);
        }
    }

    RangeMatch::Between {
        below: low.checked_sub(1),
        above: (low < ranges.len()).then_some(low),
    }
}

/// Normalized range list: ascending, disjoint, no two entries contiguous.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeSet {
    ranges: Vec<HashRange>,
}

impl RangeSet {
    /// Sorts and merges an arbitrary range list.
    pub fn new(mut ranges: Vec<HashRange>) -> Self {
        sort_ascending(&mut ranges);
        merge_adjacent(&mut ranges);
        Self { ranges }
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn as_slice(&self) -> &[HashRange] {
        &self.ranges
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HashRange> {
        self.ranges.iter()
    }

    pub fn search(&self, key: HashKey) -> RangeMatch {
        binary_search(&self.ranges, key)
    }

    pub fn contains(&self, key: HashKey) -> bool {
        self.search(key).is_found()
    }

    /// Total number of keys covered.
    pub fn key_count(&self) -> u64 {
        self.ranges.iter().map(HashRange::len).sum()
    }

    pub fn into_vec(self) -> Vec<HashRange> {
        self.ranges
    }
}

impl FromIterator<HashRange> for RangeSet {
    fn from_iter<I: IntoIterator<Item = HashRange>>(iter: I) -> Self {
        RangeSet::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RangeSet {
    type Item = &'a HashRange;
    type IntoIter = std::slice::Iter<'a, HashRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}
