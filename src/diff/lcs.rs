//! Sorted-path row classification via a longest-common-subsequence
//! decomposition.
//!
//! Both sequences are first restricted to keys present in both (a key
//! present in only one side can never participate in a match), then the
//! classic "longest matching block, recurse on both flanks" decomposition
//! is run over that restricted pair. Because keys are unique, the matching
//! step's usual O(N·M) inner search collapses to an O(1) lookup per
//! position via a key-to-position index, making each `longest_match` call
//! O(N) and the whole decomposition O(N log N) typical / O(N²) worst case,
//! matching the complexity contract. The decomposition itself is iterative
//! (an explicit work-list) rather than recursive, to keep stack depth O(1)
//! regardless of how fragmented the match is.
//!
//! On a length tie, the match covering fewer modified rows (per
//! `row_did_change`) is preferred, mirroring
//! `LongestCommonSubsequenceCalculator::Match::modified` in the original's
//! `find_longest_match` (`collection_change_builder.cpp`): "given two
//! equal-length matches, prefer the one with fewer modified rows."
//!
//! Unlike the unsorted path, a shared key that falls outside every matched
//! block is **not** reported as a move here: on the sorted path, rows are
//! ordered by a sort key rather than by stable identity, so a row that
//! changed enough to leave the longest run is reported as a plain
//! delete-then-insert pair. Only the unsorted/table-order path (see
//! `super::unsorted`) attributes such gaps to storage-level moves.

use std::collections::HashMap;

use crate::object_change_set::ObjKey;

/// Returns `(old_positions, new_positions)`: the positions, in `prev` and
/// `next` respectively, of rows whose key is present in both sequences but
/// which fall outside the longest common run and should therefore be
/// reported as an ordinary deletion/insertion pair rather than left
/// untouched.
///
/// `row_did_change` decides, for a key present in `next`, whether it counts
/// as "modified" for the purposes of the tie-break described above.
pub fn unmatched_shared(
    prev: &[ObjKey],
    next: &[ObjKey],
    prev_pos: &HashMap<ObjKey, usize>,
    next_pos: &HashMap<ObjKey, usize>,
    row_did_change: &impl Fn(ObjKey) -> bool,
) -> (Vec<usize>, Vec<usize>) {
    let old_sub: Vec<usize> = prev
        .iter()
        .enumerate()
        .filter(|(_, k)| next_pos.contains_key(k))
        .map(|(i, _)| i)
        .collect();
    let new_sub: Vec<usize> = next
        .iter()
        .enumerate()
        .filter(|(_, k)| prev_pos.contains_key(k))
        .map(|(i, _)| i)
        .collect();

    let old_keys: Vec<ObjKey> = old_sub.iter().map(|&i| prev[i]).collect();
    let new_keys: Vec<ObjKey> = new_sub.iter().map(|&i| next[i]).collect();

    let new_key_pos: HashMap<ObjKey, usize> =
        new_keys.iter().enumerate().map(|(j, &k)| (k, j)).collect();

    // Prefix sum of "is this new-side row modified", so any range
    // `[lo, hi)` of `new_keys` can be queried for its modified-row count in
    // O(1), the way `IndexSet::count` does over `m_modified` in the
    // original.
    let mut modified_prefix: Vec<usize> = Vec::with_capacity(new_keys.len() + 1);
    modified_prefix.push(0);
    for &key in &new_keys {
        let last = *modified_prefix.last().unwrap();
        modified_prefix.push(last + usize::from(row_did_change(key)));
    }

    let mut matched_old = vec![false; old_keys.len()];
    let mut matched_new = vec![false; new_keys.len()];

    let mut stack = vec![(0usize, old_keys.len(), 0usize, new_keys.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = stack.pop() {
        if a_lo >= a_hi || b_lo >= b_hi {
            continue;
        }
        let Some((ma, mb, len, _modified)) =
            longest_match(&old_keys, &new_key_pos, &modified_prefix, a_lo, a_hi, b_lo, b_hi)
        else {
            continue;
        };
        for k in 0..len {
            matched_old[ma + k] = true;
            matched_new[mb + k] = true;
        }
        stack.push((a_lo, ma, b_lo, mb));
        stack.push((ma + len, a_hi, mb + len, b_hi));
    }

    let old_positions = (0..old_keys.len())
        .filter(|&i| !matched_old[i])
        .map(|i| old_sub[i])
        .collect();
    let new_positions = (0..new_keys.len())
        .filter(|&j| !matched_new[j])
        .map(|j| new_sub[j])
        .collect();
    (old_positions, new_positions)
}

/// difflib-style longest matching block between `a[a_lo..a_hi]` and the
/// sub-range `[b_lo, b_hi)` of the array `b_pos` was built from.
///
/// Returns `(start_a, start_b, len, modified)`, where `modified` is the
/// number of rows within `[start_b, start_b + len)` for which
/// `row_did_change` returned true. On a tie in `len`, the match with the
/// smaller `modified` count wins; this is the "given two equal-length
/// matches, prefer the one with fewer modified rows" rule from
/// `find_longest_match`.
fn longest_match(
    a: &[ObjKey],
    b_pos: &HashMap<ObjKey, usize>,
    modified_prefix: &[usize],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> Option<(usize, usize, usize, usize)> {
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    let mut best: Option<(usize, usize, usize, usize)> = None;

    for i in a_lo..a_hi {
        let mut new_j2len: HashMap<usize, usize> = HashMap::new();
        if let Some(&j) = b_pos.get(&a[i]) {
            if j >= b_lo && j < b_hi {
                let prev_len = if j > 0 { j2len.get(&(j - 1)).copied().unwrap_or(0) } else { 0 };
                let k = prev_len + 1;
                new_j2len.insert(j, k);
                let start_a = i + 1 - k;
                let start_b = j + 1 - k;
                let modified = modified_prefix[start_b + k] - modified_prefix[start_b];

                let replace = match best {
                    None => true,
                    Some((_, _, best_len, _)) if k > best_len => true,
                    Some((_, _, best_len, best_modified)) => k == best_len && modified < best_modified,
                };
                if replace {
                    best = Some((start_a, start_b, k, modified));
                }
            }
        }
        j2len = new_j2len;
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_of_two_keys_by_sort_key_is_delete_plus_insert() {
        // prev = [a, b, c, d, e], next = [a, c, b, d, e]
        let prev = [ObjKey(1), ObjKey(2), ObjKey(3), ObjKey(4), ObjKey(5)];
        let next = [ObjKey(1), ObjKey(3), ObjKey(2), ObjKey(4), ObjKey(5)];
        let prev_pos: HashMap<_, _> = prev.iter().enumerate().map(|(i, &k)| (k, i)).collect();
        let next_pos: HashMap<_, _> = next.iter().enumerate().map(|(i, &k)| (k, i)).collect();
        let (old_positions, new_positions) =
            unmatched_shared(&prev, &next, &prev_pos, &next_pos, &|_| false);
        assert_eq!(old_positions, vec![2]);
        assert_eq!(new_positions, vec![1]);
    }

    #[test]
    fn tie_prefers_the_match_covering_fewer_modified_rows() {
        // Two equal-length candidate runs of length 2 exist: [1, 2] and
        // [3, 4]. Marking key 1 as modified should push the decomposition
        // to prefer matching on [3, 4] (0 modified) over [1, 2] (1
        // modified), leaving 1 and 2 reported as unmatched.
        let prev = [ObjKey(1), ObjKey(2), ObjKey(3), ObjKey(4)];
        let next = [ObjKey(3), ObjKey(4), ObjKey(1), ObjKey(2)];
        let prev_pos: HashMap<_, _> = prev.iter().enumerate().map(|(i, &k)| (k, i)).collect();
        let next_pos: HashMap<_, _> = next.iter().enumerate().map(|(i, &k)| (k, i)).collect();
        let (old_positions, new_positions) =
            unmatched_shared(&prev, &next, &prev_pos, &next_pos, &|k| k == ObjKey(1));
        assert_eq!(old_positions, vec![0, 1]);
        assert_eq!(new_positions, vec![2, 3]);
    }
}
