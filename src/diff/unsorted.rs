//! Fast move-classification path for results that already follow table
//! order, used when a caller supplies a set of rows that may have moved.

use std::collections::HashMap;
use std::collections::HashSet;

use smallvec::SmallVec;

use crate::change_set::Move;
use crate::object_change_set::ObjKey;

/// Walks `next` in order, tracking the next expected pre-change position
/// for an unmoved matched row. A matched row whose pre-change position is
/// out of step with that expectation is reported as a move only if it is
/// named in `move_candidates`; otherwise it is assumed to merely have
/// shifted as an ordinary side effect of surrounding deletions/insertions.
pub fn classify_moves(
    prev: &[ObjKey],
    next: &[ObjKey],
    prev_pos: &HashMap<ObjKey, usize>,
    next_pos: &HashMap<ObjKey, usize>,
    move_candidates: &HashSet<ObjKey>,
) -> Vec<Move> {
    let removed: HashSet<usize> = prev
        .iter()
        .enumerate()
        .filter(|(_, k)| !next_pos.contains_key(*k))
        .map(|(i, _)| i)
        .collect();

    // Most result sets relocate only a handful of rows per notification
    // round, so this stays on the stack in the common case.
    let mut moves: SmallVec<[Move; 8]> = SmallVec::new();
    let mut expected_old = 0usize;
    for (new_idx, key) in next.iter().enumerate() {
        let Some(&old_idx) = prev_pos.get(key) else {
            // A fresh insertion; does not consume an expected old slot.
            continue;
        };
        while removed.contains(&expected_old) {
            expected_old += 1;
        }
        if old_idx == expected_old {
            expected_old += 1;
            continue;
        }
        if move_candidates.contains(key) {
            moves.push(Move { from: old_idx, to: new_idx });
        }
        expected_old += 1;
    }
    moves.into_vec()
}
