use watchdb::{ChangeSetBuilder, ColKey};

#[test]
fn plain_insertions_and_deletions_finalize_unchanged() {
    let mut b = ChangeSetBuilder::new();
    b.erase(2);
    b.insert(0, 1, true);
    let cs = b.finalize();
    assert!(cs.moves.is_empty());
    assert_eq!(cs.insertions.iter().collect::<Vec<_>>(), vec![0]);
    assert_eq!(cs.deletions.iter().collect::<Vec<_>>(), vec![2]);
}

#[test]
fn modify_then_move_row_carries_the_modification_to_its_new_position() {
    let mut b = ChangeSetBuilder::new();
    b.modify(0, Some(ColKey(7)));
    b.move_row(0, 2);
    let cs = b.finalize();
    assert_eq!(cs.moves, vec![watchdb::Move { from: 0, to: 2 }]);
    assert_eq!(cs.modifications.iter().collect::<Vec<_>>(), vec![0]);
    assert_eq!(cs.modifications_new.iter().collect::<Vec<_>>(), vec![2]);
    assert_eq!(
        cs.per_column_modifications
            .get(&ColKey(7))
            .unwrap()
            .iter()
            .collect::<Vec<_>>(),
        vec![2]
    );
}

#[test]
fn move_then_move_again_collapses_to_a_single_move() {
    let mut b = ChangeSetBuilder::new();
    b.move_row(0, 3);
    b.move_row(3, 5);
    let cs = b.finalize();
    assert_eq!(cs.moves, vec![watchdb::Move { from: 0, to: 5 }]);
}

#[test]
fn merging_two_builders_combines_deletions_and_insertions() {
    let mut first = ChangeSetBuilder::new();
    first.erase(1);
    let mut second = ChangeSetBuilder::new();
    second.insert(0, 1, true);
    first.merge(second);
    let cs = first.finalize();
    assert_eq!(cs.deletions.iter().collect::<Vec<_>>(), vec![1]);
    assert_eq!(cs.insertions.iter().collect::<Vec<_>>(), vec![0]);
}
