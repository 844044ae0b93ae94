//! A sorted set of row indices, stored as a minimal list of merged
//! half-open ranges, with the position-translation operations needed to
//! keep a set of indices valid as rows are inserted and removed ahead of
//! them.

use std::ops::Range;

/// A sorted set of `usize` row indices, represented internally as a list of
/// disjoint, non-adjacent, ascending half-open ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSet {
    ranges: Vec<Range<usize>>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of indices held, summed across all ranges.
    pub fn len(&self) -> usize {
        self.ranges.iter().map(|r| r.end - r.start).sum()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn contains(&self, index: usize) -> bool {
        self.find_range(index).is_ok()
    }

    /// Replaces the contents of this set with `other`.
    pub fn set(&mut self, other: IndexSet) {
        self.ranges = other.ranges;
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.ranges.iter().flat_map(|r| r.clone())
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Binary-searches for the range containing `index`. `Ok` gives the
    /// containing range's position; `Err` gives the position a new range
    /// starting at `index` would be inserted at.
    fn find_range(&self, index: usize) -> Result<usize, usize> {
        self.ranges.binary_search_by(|r| {
            if index < r.start {
                std::cmp::Ordering::Greater
            } else if index >= r.end {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        })
    }

    /// Adds a single index to the set, merging with adjacent ranges.
    pub fn add(&mut self, index: usize) {
        self.add_range(index..index + 1);
    }

    /// Adds `range` to the set, merging with any overlapping or adjacent
    /// ranges.
    pub fn add_range(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let start_pos = match self.ranges.binary_search_by_key(&range.start, |r| r.start) {
            Ok(i) => i,
            Err(i) => i,
        };
        // Back up to the first range that might merge with `range`.
        let mut first = start_pos;
        while first > 0 && self.ranges[first - 1].end >= range.start {
            first -= 1;
        }
        let mut last = first;
        let mut merged = range.clone();
        while last < self.ranges.len() && self.ranges[last].start <= merged.end {
            merged.start = merged.start.min(self.ranges[last].start);
            merged.end = merged.end.max(self.ranges[last].end);
            last += 1;
        }
        self.ranges.splice(first..last, [merged]);
    }

    /// Removes a single index from the set. Returns whether it was present.
    pub fn remove(&mut self, index: usize) -> bool {
        let pos = match self.find_range(index) {
            Ok(p) => p,
            Err(_) => return false,
        };
        let r = self.ranges[pos].clone();
        if r.start == index && r.end == index + 1 {
            self.ranges.remove(pos);
        } else if r.start == index {
            self.ranges[pos].start += 1;
        } else if r.end == index + 1 {
            self.ranges[pos].end -= 1;
        } else {
            let tail = (index + 1)..r.end;
            self.ranges[pos].end = index;
            self.ranges.insert(pos + 1, tail);
        }
        true
    }

    /// Translates `index`, understood as a position in the sequence that
    /// existed *before* the insertions represented by this set, into a
    /// position in the sequence that exists *after* them.
    ///
    /// Equivalently: returns `index` plus the number of members of this set
    /// that are `<=` the running, already-shifted position — the
    /// cascading count of insertions that land at or before `index`.
    pub fn shift(&self, index: usize) -> usize {
        let mut running = index;
        for r in &self.ranges {
            if r.start > running {
                break;
            }
            running += r.end - r.start;
        }
        running
    }

    /// The inverse of [`shift`](Self::shift): translates a position in the
    /// post-insertion sequence back to the pre-insertion sequence, treating
    /// any index that is itself a member of this set as having no
    /// pre-image (it collapses to the start of its containing range).
    pub fn unshift(&self, index: usize) -> usize {
        let mut result = index;
        for r in &self.ranges {
            if r.start >= result {
                break;
            }
            if index < r.end {
                return r.start - (result - index);
            }
            result -= r.end - r.start;
        }
        result
    }

    /// Shifts `index` forward by this set's cumulative membership and adds
    /// the resulting position to the set. Used when translating an index
    /// observed in an older coordinate space into the current one while
    /// recording it as changed.
    pub fn add_shifted(&mut self, index: usize) -> usize {
        let shifted = self.shift(index);
        self.add(shifted);
        shifted
    }

    /// Accounts for `count` new rows being inserted at `index`: every
    /// member of this set at or beyond `index` moves up by `count`. Used to
    /// keep a previously-recorded set valid across a later insertion at an
    /// earlier or equal position.
    pub fn shift_for_insert_at(&mut self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        for r in &mut self.ranges {
            if r.start >= index {
                r.start += count;
                r.end += count;
            } else if r.end > index {
                // `index` falls inside this range: split it.
                unreachable!(
                    "shift_for_insert_at must not be called with an index inside an existing range"
                );
            }
        }
    }

    /// Inserts `count` new rows at `index`: existing members at or beyond
    /// `index` shift up by `count`, and `[index, index + count)` is added.
    pub fn insert_at(&mut self, index: usize, count: usize) {
        if count == 0 {
            return;
        }
        // Find the range straddling `index`, if any, and split it before
        // shifting anything, so the shift pass below never has to reason
        // about a partially-split range.
        let split_at = self
            .ranges
            .iter()
            .position(|r| r.start < index && r.end > index);
        if let Some(pos) = split_at {
            let r = self.ranges[pos].clone();
            self.ranges[pos].end = index;
            self.ranges.insert(pos + 1, index..r.end);
        }
        for r in &mut self.ranges {
            if r.start >= index {
                r.start += count;
                r.end += count;
            }
        }
        self.add_range(index..index + count);
    }

    /// Inserts rows at every index named by `positions` (given in ascending,
    /// pre-insertion coordinates), cascading each insertion's effect onto
    /// the positions that follow it.
    pub fn insert_at_many(&mut self, positions: &IndexSet) {
        let mut inserted = 0usize;
        for idx in positions.iter() {
            self.insert_at(idx + inserted, 1);
            inserted += 1;
        }
    }

    /// Removes row `index`, shifting every later member down by one.
    /// Returns whether `index` itself was a member.
    pub fn erase_at(&mut self, index: usize) -> bool {
        let was_present = self.remove(index);
        for r in &mut self.ranges {
            if r.start > index {
                r.start -= 1;
                r.end -= 1;
            }
        }
        was_present
    }

    /// Removes every row named by `positions` (ascending, in the
    /// coordinate space that existed before any of these removals),
    /// cascading each removal's effect onto the positions that follow it.
    pub fn erase_at_many(&mut self, positions: &IndexSet) {
        for idx in positions.iter().collect::<Vec<_>>().into_iter().rev() {
            self.erase_at(idx);
        }
    }

    /// If `index` is a member, removes it and returns `None` (it has no
    /// pre-image after the removal). Otherwise returns `Some` of `index`
    /// shifted down by the number of members strictly less than `index`.
    pub fn erase_or_unshift(&mut self, index: usize) -> Option<usize> {
        if self.remove(index) {
            return None;
        }
        Some(index - self.count_less_than(index))
    }

    /// Number of members strictly less than `index`.
    pub fn count_less_than(&self, index: usize) -> usize {
        self.ranges
            .iter()
            .take_while(|r| r.start < index)
            .map(|r| r.end.min(index) - r.start)
            .sum()
    }

    /// Removes every index named by `other` (in this set's own coordinate
    /// space), cascading the effect of each removal onto the indices that
    /// follow it, as if calling [`erase_at`](Self::erase_at) once per member
    /// of `other` in ascending order.
    pub fn erase_at_set(&mut self, other: &IndexSet) {
        let mut removed = 0usize;
        for idx in other.iter() {
            debug_assert!(idx >= removed, "erase_at_set requires ascending input");
            self.erase_at(idx - removed);
            removed += 1;
        }
    }

    /// Accounts for `other` being inserted, wholesale, as if calling
    /// [`shift_for_insert_at`](Self::shift_for_insert_at) once per
    /// contiguous run in `other`, without adding `other`'s own members to
    /// this set.
    pub fn shift_for_insert_at_set(&mut self, other: &IndexSet) {
        for r in other.ranges() {
            self.shift_for_insert_at(r.start, r.end - r.start);
        }
    }

    /// Adds every member of `other` to this set.
    pub fn add_all(&mut self, other: &IndexSet) {
        for r in other.ranges() {
            self.add_range(r.clone());
        }
    }

    /// Adds `shift(x)` for every `x` in `other` (see
    /// [`add_shifted`](Self::add_shifted)), applied in ascending order so
    /// each addition accounts for the ones before it.
    pub fn add_shifted_set(&mut self, other: &IndexSet) {
        for x in other.iter() {
            self.add_shifted(x);
        }
    }

    /// Combines two successive deletion sets: `self` already holds
    /// deletions made against some original sequence; `other` holds
    /// deletions made against the sequence that results after `shifts`
    /// (typically the insertions accumulated over that same span) were
    /// applied on top of `self`'s view. For each `x` in `other`, removes
    /// the shift contributed by `shifts` to recover `x`'s position in the
    /// original sequence excluding `self`'s own prior members, then adds it
    /// to `self` via `add_shifted` so it lands at the correct position
    /// including them.
    pub fn add_shifted_by(&mut self, shifts: &IndexSet, other: &IndexSet) {
        for x in other.iter() {
            let pre = shifts.unshift(x);
            self.add_shifted(pre);
        }
    }
}

impl FromIterator<usize> for IndexSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut set = IndexSet::new();
        for i in iter {
            set.add(i);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_merges_adjacent_ranges() {
        let mut s = IndexSet::new();
        s.add(2);
        s.add(3);
        s.add(5);
        assert_eq!(s.ranges().to_vec(), vec![2..4, 5..6]);
        s.add(4);
        assert_eq!(s.ranges().to_vec(), vec![2..6]);
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn remove_splits_ranges() {
        let mut s: IndexSet = (2..6).collect();
        assert!(s.remove(3));
        assert_eq!(s.ranges().to_vec(), vec![2..3, 4..6]);
        assert!(!s.remove(3));
    }

    #[test]
    fn shift_accounts_for_cascading_insertions() {
        let s: IndexSet = [2usize, 3].into_iter().collect();
        // Two rows inserted at positions 2 and 3 (post-insertion coords):
        // a pre-insertion index of 0 or 1 is unaffected.
        assert_eq!(s.shift(0), 0);
        assert_eq!(s.shift(1), 1);
        // Index 2 lands at/after the first inserted row, so both inserted
        // rows cascade onto it.
        assert_eq!(s.shift(2), 4);
        assert_eq!(s.shift(10), 12);
    }

    #[test]
    fn unshift_is_left_inverse_of_shift_off_members() {
        let s: IndexSet = [2usize, 5].into_iter().collect();
        for pre in [0usize, 1, 6, 7, 20] {
            let post = s.shift(pre);
            assert_eq!(s.unshift(post), pre, "pre={pre} post={post}");
        }
    }

    #[test]
    fn insert_at_shifts_existing_members() {
        let mut s: IndexSet = [4usize, 5, 6].into_iter().collect();
        s.insert_at(5, 2);
        assert!(s.contains(4));
        assert!(s.contains(5));
        assert!(s.contains(6));
        assert!(s.contains(7));
        assert!(s.contains(8));
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn erase_at_shifts_later_members_down() {
        let mut s: IndexSet = [2usize, 5].into_iter().collect();
        assert!(!s.erase_at(3));
        assert!(s.contains(2));
        assert!(s.contains(4));
        assert!(!s.contains(5));
    }

    #[test]
    fn erase_or_unshift_distinguishes_member_from_nonmember() {
        let mut s: IndexSet = [2usize, 3].into_iter().collect();
        assert_eq!(s.erase_or_unshift(2), None);
        let mut s2: IndexSet = [2usize, 3].into_iter().collect();
        assert_eq!(s2.erase_or_unshift(5), Some(3));
    }
}
