//! Computes a minimal change description between two successive snapshots
//! of a query result, expressed as ordered sequences of stable object keys.

mod lcs;
mod unsorted;

use std::collections::HashSet;

use crate::change_set::{ChangeSetBuilder, Move};
use crate::index_set::IndexSet;
use crate::object_change_set::ObjKey;

/// Computes the diff between `prev` and `next`, two orderings of the same
/// kind of row, identified by stable key.
///
/// `prev` carries a sentinel (`None`) at any position whose row was already
/// deleted outright before this diff ever ran; such a position is recorded
/// directly as a deletion rather than entering key-matching at all, per the
/// row-info-table construction in the original's `CollectionChangeBuilder::calculate`
/// (`prev_rows[i] == IndexSet::npos` ⇒ `ret.deletions.add(i)`, skipping that
/// slot when building `old_rows`).
///
/// `row_did_change` is consulted for every row present in both sequences to
/// decide whether it should be reported as modified. `move_candidates`,
/// when given, selects the unsorted/table-order fast path; when absent, the
/// sorted longest-common-subsequence path is used, which additionally
/// requires `next` (and the non-sentinel entries of `prev`) to be ordered
/// by a stable sort key for its minimality guarantee to hold.
pub fn calculate(
    prev: &[Option<ObjKey>],
    next: &[ObjKey],
    row_did_change: impl Fn(ObjKey) -> bool,
    move_candidates: Option<&HashSet<ObjKey>>,
) -> ChangeSetBuilder {
    let mut deletions = IndexSet::new();
    let mut insertions = IndexSet::new();

    // Row-info step 1: sentinel slots are pre-rows already known to be
    // deleted; record them directly and exclude them from key-matching.
    let mut old_keys: Vec<ObjKey> = Vec::with_capacity(prev.len());
    let mut old_positions: Vec<usize> = Vec::with_capacity(prev.len());
    for (i, slot) in prev.iter().enumerate() {
        match slot {
            Some(key) => {
                old_keys.push(*key);
                old_positions.push(i);
            }
            None => deletions.add(i),
        }
    }

    let prev_pos: std::collections::HashMap<ObjKey, usize> =
        old_keys.iter().enumerate().map(|(dense_i, &k)| (k, dense_i)).collect();
    let next_pos: std::collections::HashMap<ObjKey, usize> =
        next.iter().enumerate().map(|(i, &k)| (k, i)).collect();

    for (dense_i, key) in old_keys.iter().enumerate() {
        if !next_pos.contains_key(key) {
            deletions.add(old_positions[dense_i]);
        }
    }
    for (i, key) in next.iter().enumerate() {
        if !prev_pos.contains_key(key) {
            insertions.add(i);
        }
    }

    let moves = match move_candidates {
        Some(candidates) => {
            let dense_moves = unsorted::classify_moves(&old_keys, next, &prev_pos, &next_pos, candidates);
            let moves: Vec<Move> = dense_moves
                .into_iter()
                .map(|m| Move { from: old_positions[m.from], to: m.to })
                .collect();
            for m in &moves {
                deletions.add(m.from);
                insertions.add(m.to);
            }
            moves
        }
        None => {
            let (old_dense_positions, new_positions) =
                lcs::unmatched_shared(&old_keys, next, &prev_pos, &next_pos, &row_did_change);
            for dense_i in old_dense_positions {
                deletions.add(old_positions[dense_i]);
            }
            for i in new_positions {
                insertions.add(i);
            }
            Vec::new()
        }
    };

    let mut builder = ChangeSetBuilder::from_diff(deletions, insertions, moves);

    for (i, key) in next.iter().enumerate() {
        if prev_pos.contains_key(key) && row_did_change(*key) {
            builder.modify(i, None);
        }
    }

    builder
}

/// Debug-mode verification contract: erasing `deletions` from `prev` (in
/// ascending, cascading order) then inserting `next`'s own keys at
/// `insertions`' positions (in ascending order) must reproduce `next`
/// exactly. `prev`'s sentinel slots are treated as already absent.
pub fn verify(prev: &[Option<ObjKey>], next: &[ObjKey], deletions: &IndexSet, insertions: &IndexSet) -> bool {
    let mut result: Vec<Option<ObjKey>> = prev.to_vec();
    let mut removed = 0usize;
    for idx in deletions.iter() {
        result.remove(idx - removed);
        removed += 1;
    }
    let mut result: Vec<ObjKey> = result.into_iter().flatten().collect();
    for idx in insertions.iter() {
        result.insert(idx, next[idx]);
    }
    result == next
}
