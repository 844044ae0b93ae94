use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::index_set::IndexSet;

use super::{ChangeSet, ColKey, Move};

/// Accumulates insertions, deletions, modifications and moves applied to an
/// ordered row sequence over one advancement window, and produces a
/// finalized [`ChangeSet`] on demand.
///
/// Coordinate spaces, per the data model: `deletions` holds positions in the
/// sequence as it stood at the *start* of the window; `insertions` and
/// `modifications` hold positions in the sequence as it stands *right now*,
/// i.e. after every mutation recorded so far. Moves are tracked as a pending
/// `to -> from` mapping (`move_mapping`) — `from` already translated into
/// the window's starting coordinates — and only materialized into a sorted
/// `Vec<Move>` when the builder is read via [`moves`](Self::moves) or
/// consumed by [`finalize`](Self::finalize).
#[derive(Debug, Clone, Default)]
pub struct ChangeSetBuilder {
    deletions: IndexSet,
    insertions: IndexSet,
    modifications: IndexSet,
    move_mapping: BTreeMap<usize, usize>,
    columns: HashMap<ColKey, IndexSet>,
}

impl ChangeSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a builder directly from a diff's final-form output: the
    /// moves fold straight into `deletions`/`insertions` the same way the
    /// source's constructor does, rather than being replayed through
    /// [`move_row`](Self::move_row).
    pub(crate) fn from_diff(deletions: IndexSet, insertions: IndexSet, moves: Vec<Move>) -> Self {
        let mut move_mapping = BTreeMap::new();
        for m in moves {
            move_mapping.insert(m.to, m.from);
        }
        Self {
            deletions,
            insertions,
            modifications: IndexSet::new(),
            move_mapping,
            columns: HashMap::new(),
        }
    }

    pub fn deletions(&self) -> &IndexSet {
        &self.deletions
    }

    pub fn insertions(&self) -> &IndexSet {
        &self.insertions
    }

    pub fn modifications(&self) -> &IndexSet {
        &self.modifications
    }

    pub fn columns(&self) -> &HashMap<ColKey, IndexSet> {
        &self.columns
    }

    /// Materializes the pending move mapping into a sorted `Vec<Move>`,
    /// dropping any entry whose net displacement is zero. Mirrors the
    /// source's `parse_complete` step.
    pub fn moves(&self) -> Vec<Move> {
        self.move_mapping
            .iter()
            .filter(|(to, from)| *to != *from)
            .map(|(&to, &from)| Move { from, to })
            .collect()
    }

    /// Shifts every tracked index `>= index` upward by `count`. When
    /// `track_moves` is true, also marks `[index, index + count)` as newly
    /// inserted and shifts pending move destinations `>= index`; when
    /// false, only per-row/per-column modification tracking is shifted,
    /// for replaying a mutation whose insertion was already recorded
    /// directly against `insertions`.
    pub fn insert(&mut self, index: usize, count: usize, track_moves: bool) {
        if count == 0 {
            return;
        }
        self.modifications.shift_for_insert_at(index, count);
        for set in self.columns.values_mut() {
            set.shift_for_insert_at(index, count);
        }
        if !track_moves {
            return;
        }
        self.insertions.insert_at(index, count);
        let shifted: BTreeMap<usize, usize> = self
            .move_mapping
            .iter()
            .map(|(&to, &from)| (if to >= index { to + count } else { to }, from))
            .collect();
        self.move_mapping = shifted;
    }

    /// Removes `index` from every tracked set, shifting later indices down
    /// by one. If `index` was itself a pending insertion, the collapse
    /// leaves no deletion record; otherwise the unshifted source position
    /// (with respect to insertions already made this window) is recorded in
    /// `deletions`.
    pub fn erase(&mut self, index: usize) {
        let was_insertion = self.insertions.contains(index);
        let unshifted = if was_insertion {
            None
        } else {
            Some(self.insertions.unshift(index))
        };

        self.insertions.erase_at(index);
        self.modifications.erase_at(index);
        for set in self.columns.values_mut() {
            set.erase_at(index);
        }
        self.erase_move_to(index);

        if let Some(unshifted) = unshifted {
            self.deletions.add_shifted(unshifted);
        }
    }

    /// Removes any pending move keyed at `to == index`, shifting later move
    /// destinations down by one to stay consistent with the index removed
    /// from every other tracked set.
    fn erase_move_to(&mut self, index: usize) {
        self.move_mapping.remove(&index);
        let shifted: BTreeMap<usize, usize> = self
            .move_mapping
            .iter()
            .map(|(&to, &from)| (if to > index { to - 1 } else { to }, from))
            .collect();
        self.move_mapping = shifted;
    }

    /// Replaces all accumulated state with "every one of `old_size` rows
    /// was deleted".
    pub fn clear(&mut self, old_size: usize) {
        self.deletions = IndexSet::new();
        self.deletions.add_range(0..old_size);
        self.insertions = IndexSet::new();
        self.modifications = IndexSet::new();
        self.move_mapping.clear();
        self.columns.clear();
    }

    /// Records that the row currently at `from` should appear at `to` in
    /// the post-change sequence. A chain `(a -> from)` already pending
    /// against `from` is collapsed into `(a -> to)`. Per-column
    /// modifications tracked against `from` are transported to `to`.
    pub fn move_row(&mut self, from: usize, to: usize) {
        if from == to {
            return;
        }
        let origin = self.move_mapping.remove(&from).unwrap_or(from);

        match self.insertions.erase_or_unshift(from) {
            None => {
                // `from` was itself a fresh insertion this window; no
                // delete is generated, it simply relocates.
            }
            Some(unshifted) => {
                self.deletions.add_shifted(unshifted);
            }
        }
        self.insertions.add(to);
        self.move_mapping.insert(to, origin);
        self.transport_row(from, to);
    }

    /// "Swap-and-pop" variant used when a storage engine removes a row by
    /// moving its last row over it. See the `move_over` truth table in the
    /// component design for the case analysis this implements.
    pub fn move_over(&mut self, row: usize, last: usize) {
        if row == last {
            self.erase(row);
            return;
        }
        let row_is_insertion = self.insertions.contains(row);
        let last_is_insertion = self.insertions.contains(last);
        let last_was_moved = self.move_mapping.contains_key(&last);

        match (row_is_insertion, last_is_insertion) {
            (false, false) => {
                let unshifted_row = self.insertions.unshift(row);
                let unshifted_last = self.insertions.unshift(last);
                self.deletions.add(unshifted_row);
                self.move_mapping.insert(row, unshifted_last);
                self.insertions.add(row);
            }
            (true, false) => {
                let unshifted_last = self.insertions.unshift(last);
                self.move_mapping.remove(&row);
                self.move_mapping.insert(row, unshifted_last);
            }
            (false, true) => {
                let unshifted_row = self.insertions.unshift(row);
                self.deletions.add(unshifted_row);
                self.insertions.remove(last);
                self.insertions.add(row);
            }
            (true, true) => {
                self.insertions.remove(last);
                if last_was_moved {
                    if let Some(origin) = self.move_mapping.remove(&last) {
                        self.move_mapping.insert(row, origin);
                    }
                } else {
                    self.move_mapping.remove(&row);
                }
            }
        }
        self.transport_row(last, row);
        // `last` no longer exists as a distinct row after the pop.
        self.modifications.remove(last);
        for set in self.columns.values_mut() {
            set.remove(last);
        }
    }

    /// Moves per-row and per-column modification tracking from `src` to
    /// `dst` (used by both `move_row` and `move_over`).
    fn transport_row(&mut self, src: usize, dst: usize) {
        if self.modifications.remove(src) {
            self.modifications.add(dst);
        }
        for set in self.columns.values_mut() {
            if set.remove(src) {
                set.add(dst);
            }
        }
    }

    /// Exchanges the tracked state of two rows.
    pub fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let a_mod = self.modifications.contains(a);
        let b_mod = self.modifications.contains(b);
        if a_mod != b_mod {
            if a_mod {
                self.modifications.remove(a);
                self.modifications.add(b);
            } else {
                self.modifications.remove(b);
                self.modifications.add(a);
            }
        }
        let a_move = self.move_mapping.remove(&a);
        let b_move = self.move_mapping.remove(&b);
        if let Some(origin) = b_move {
            self.move_mapping.insert(a, origin);
        }
        if let Some(origin) = a_move {
            self.move_mapping.insert(b, origin);
        }
        for set in self.columns.values_mut() {
            let a_in = set.contains(a);
            let b_in = set.contains(b);
            if a_in != b_in {
                if a_in {
                    set.remove(a);
                    set.add(b);
                } else {
                    set.remove(b);
                    set.add(a);
                }
            }
        }
    }

    /// Records that `new` inherits the modification history tracked
    /// against `old`, without otherwise touching insertion/deletion
    /// bookkeeping (used when a row is re-materialized at a different
    /// position by the storage engine, outside the normal insert/erase
    /// path).
    pub fn subsume(&mut self, old: usize, new: usize) {
        self.transport_row(old, new);
    }

    /// Marks `row` as modified, optionally recording a per-column
    /// modification as well.
    pub fn modify(&mut self, row: usize, col: Option<ColKey>) {
        self.modifications.add(row);
        if let Some(col) = col {
            self.columns.entry(col).or_default().add(row);
        }
    }

    /// Composes `next` (a builder covering the window immediately after
    /// this one) onto `self` in place, producing the single builder that
    /// describes both windows together.
    pub fn merge(&mut self, mut next: ChangeSetBuilder) {
        // 1. Update old moves against new moves.
        let old_moves: Vec<(usize, usize)> = self.move_mapping.iter().map(|(&t, &f)| (t, f)).collect();
        self.move_mapping.clear();
        for (b, a) in old_moves {
            if let Some(new_to) = next
                .move_mapping
                .iter()
                .find(|(_, &from)| from == b)
                .map(|(&to, _)| to)
            {
                next.move_mapping.remove(&new_to);
                self.transport_row(b, new_to);
                self.move_mapping.insert(new_to, a);
            } else if next.deletions.contains(b) {
                // destination was deleted in the next window; drop the move.
            } else {
                let new_b = next.insertions.shift(next.deletions.unshift(b));
                self.move_mapping.insert(new_b, a);
            }
        }

        // 2. Drop new moves of previously-inserted rows.
        let pending: Vec<(usize, usize)> = next.move_mapping.iter().map(|(&t, &f)| (t, f)).collect();
        for (to2, from2) in &pending {
            if self.insertions.contains(*from2) {
                next.move_mapping.remove(to2);
            }
        }

        // 3. Transport modifications under remaining new moves.
        for (&to2, &from2) in &next.move_mapping {
            if self.modifications.contains(from2) {
                next.modifications.add(to2);
            }
        }

        // 4. Translate surviving new-move sources into self's coordinates.
        let translated: BTreeMap<usize, usize> = next
            .move_mapping
            .iter()
            .map(|(&to2, &from2)| {
                let translated_from = self.deletions.shift(self.insertions.unshift(from2));
                (to2, translated_from)
            })
            .collect();

        // 5. Concatenate moves.
        self.move_mapping.extend(translated);

        // 6. Combine deletions.
        let self_insertions = self.insertions.clone();
        self.deletions.add_shifted_by(&self_insertions, &next.deletions);

        // 7. Combine insertions.
        self.insertions.erase_at_set(&next.deletions);
        self.insertions.insert_at_many(&next.insertions);

        // 8. Clean up stale moves.
        let stale: Vec<(usize, usize)> = self
            .move_mapping
            .iter()
            .filter(|(&b, &a)| {
                let a_net = a.saturating_sub(self.deletions.count_less_than(a));
                let b_net = b.saturating_sub(self.insertions.count_less_than(b));
                a_net == b_net
            })
            .map(|(&b, &a)| (b, a))
            .collect();
        for (b, a) in stale {
            self.move_mapping.remove(&b);
            self.deletions.remove(a);
            self.insertions.remove(b);
        }

        // 9. Update per-column (and plain) modifications.
        self.modifications.erase_at_set(&next.deletions);
        self.modifications.shift_for_insert_at_set(&next.insertions);
        self.modifications.add_all(&next.modifications);

        let mut columns = std::mem::take(&mut self.columns);
        for (col, mut set) in columns.drain() {
            set.erase_at_set(&next.deletions);
            set.shift_for_insert_at_set(&next.insertions);
            if let Some(next_set) = next.columns.get(&col) {
                set.add_all(next_set);
            }
            self.columns.insert(col, set);
        }
        for (col, next_set) in next.columns {
            self.columns.entry(col).or_default().add_all(&next_set);
        }
    }

    /// Consumes the builder, producing the delivered [`ChangeSet`].
    ///
    /// A plain modified row is translated to pre-change coordinates by
    /// undoing the shift contributed by insertions made this window, then
    /// reapplying the offset contributed by deletions — the same
    /// translation `erase` itself performs when recording a deletion's
    /// source position. A modified row that was also *moved* is the one
    /// exception: its `to` position lands in `insertions` the same way a
    /// fresh insert would, but it has a genuine pre-change position (the
    /// move's `from`), which this uses directly rather than the generic
    /// translation.
    pub fn finalize(self) -> ChangeSet {
        let move_destinations: HashMap<usize, usize> =
            self.move_mapping.iter().map(|(&to, &from)| (to, from)).collect();

        let mut modifications_in_old = IndexSet::new();
        let mut modifications_new = IndexSet::new();
        for row in self.modifications.iter() {
            if let Some(&from) = move_destinations.get(&row) {
                modifications_in_old.add(from);
                modifications_new.add(row);
            } else if self.insertions.contains(row) {
                // Pure fresh insert: no pre-change position to report, and
                // it is not reported as a modification post-change either.
            } else {
                let unshifted = self.insertions.unshift(row);
                modifications_in_old.add(self.deletions.shift(unshifted));
                modifications_new.add(row);
            }
        }

        ChangeSet {
            deletions: self.deletions,
            insertions: self.insertions,
            modifications: modifications_in_old,
            modifications_new,
            moves: self.moves(),
            per_column_modifications: self.columns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_erase_collapses() {
        let mut b = ChangeSetBuilder::new();
        b.insert(1, 1, true);
        b.erase(1);
        let cs = b.finalize();
        assert!(cs.is_empty());
    }

    #[test]
    fn move_then_move_collapses() {
        let mut b = ChangeSetBuilder::new();
        b.move_row(0, 2);
        b.move_row(2, 3);
        let cs = b.finalize();
        assert_eq!(cs.moves, vec![Move { from: 0, to: 3 }]);
        assert!(cs.deletions.contains(0));
        assert!(cs.insertions.contains(3));
    }

    #[test]
    fn modified_row_that_moves_carries_modification() {
        let mut b = ChangeSetBuilder::new();
        b.modify(0, Some(ColKey(0)));
        b.move_row(0, 2);
        let cs = b.finalize();
        assert!(cs.modifications.contains(0));
        assert!(cs.modifications_new.contains(2));
        assert_eq!(cs.moves, vec![Move { from: 0, to: 2 }]);
    }

    // `move_over`'s truth table, one test per `(row_is_insertion,
    // last_is_insertion)` branch, plus the `last_was_moved` sub-case within
    // `(true, true)`.

    #[test]
    fn move_over_neither_row_nor_last_is_a_pending_insertion() {
        let mut b = ChangeSetBuilder::new();
        b.move_over(1, 3);
        let cs = b.finalize();
        assert_eq!(cs.moves, vec![Move { from: 3, to: 1 }]);
        assert!(cs.deletions.contains(1));
        assert!(cs.insertions.contains(1));
    }

    #[test]
    fn move_over_row_is_insertion_last_is_not() {
        let mut b = ChangeSetBuilder::new();
        b.insert(2, 1, true);
        b.move_over(2, 5);
        let cs = b.finalize();
        assert_eq!(cs.moves, vec![Move { from: 4, to: 2 }]);
        assert!(cs.insertions.contains(2));
        assert!(cs.deletions.is_empty());
    }

    #[test]
    fn move_over_last_is_insertion_row_is_not() {
        let mut b = ChangeSetBuilder::new();
        b.insert(5, 1, true);
        b.move_over(2, 5);
        let cs = b.finalize();
        assert!(cs.moves.is_empty());
        assert!(cs.deletions.contains(2));
        assert!(cs.insertions.contains(2));
        assert!(!cs.insertions.contains(5));
    }

    #[test]
    fn move_over_both_insertions_with_no_prior_move_on_last() {
        let mut b = ChangeSetBuilder::new();
        b.insert(2, 1, true);
        b.insert(5, 1, true);
        b.move_over(2, 5);
        let cs = b.finalize();
        assert!(cs.moves.is_empty());
        assert!(cs.insertions.contains(2));
        assert!(!cs.insertions.contains(5));
    }

    #[test]
    fn move_over_both_insertions_with_last_already_a_pending_move_destination() {
        let mut b = ChangeSetBuilder::new();
        b.move_row(10, 5);
        b.insert(8, 1, true);
        b.move_over(8, 5);
        let cs = b.finalize();
        assert_eq!(cs.moves, vec![Move { from: 10, to: 8 }]);
        assert!(cs.deletions.contains(10));
        assert!(cs.insertions.contains(8));
    }

    #[test]
    fn move_over_same_row_and_last_is_a_plain_erase() {
        let mut b = ChangeSetBuilder::new();
        b.move_over(4, 4);
        let cs = b.finalize();
        assert!(cs.deletions.contains(4));
        assert!(cs.moves.is_empty());
    }
}
