use watchdb::IndexSet;

#[test]
fn ranges_stay_merged_across_interleaved_adds() {
    let mut s = IndexSet::new();
    s.add(5);
    s.add(1);
    s.add(2);
    s.add(4);
    s.add(3);
    assert_eq!(s.ranges().to_vec(), vec![1..6]);
    assert_eq!(s.len(), 5);
}

#[test]
fn insert_at_then_erase_at_round_trips() {
    let mut s = IndexSet::new();
    s.add_range(0..3);
    s.add(10);
    s.insert_at(3, 2);
    assert_eq!(s.iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 12]);
    s.erase_at(3);
    s.erase_at(3);
    assert_eq!(s.iter().collect::<Vec<_>>(), vec![0, 1, 2, 10]);
}

#[test]
fn shift_and_unshift_are_inverse_for_nonmembers() {
    let mut s = IndexSet::new();
    s.add_range(0..3);
    s.add_range(10..12);
    for i in [3usize, 4, 9, 12, 20] {
        let shifted = s.shift(i);
        assert_eq!(s.unshift(shifted), i);
    }
}

#[test]
fn count_less_than_matches_manual_scan() {
    let mut s = IndexSet::new();
    s.add_range(0..3);
    s.add_range(10..15);
    for probe in 0..20 {
        let expected = s.iter().filter(|&x| x < probe).count();
        assert_eq!(s.count_less_than(probe), expected);
    }
}
