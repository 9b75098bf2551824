use cow_tree::{Cursor, Shared};

#[derive(Clone, PartialEq, Debug)]
struct Tree {
    value: i32,
    left: Shared<Tree>,
    right: Shared<Tree>,
}

fn leaf(value: i32) -> Shared<Tree> {
    Shared::make(Tree { value, left: Shared::null(), right: Shared::null() })
}

fn node(value: i32, left: Shared<Tree>, right: Shared<Tree>) -> Shared<Tree> {
    Shared::make(Tree { value, left, right })
}

#[test]
fn root_cursor_reads_through_to_the_anchor() {
    let mut root = leaf(1);
    let cursor = Cursor::new(&mut root);
    assert!(cursor.is_set());
    assert_eq!(cursor.get().unwrap().value, 1);
    assert_eq!(cursor.use_count(), 1);
}

#[test]
fn step_fn_chains_build_a_deeper_cursor_by_consuming_the_parent() {
    let mut root = node(1, node(2, leaf(3), leaf(4)), leaf(5));
    let cursor = Cursor::new(&mut root);
    let cursor = cursor.step_fn(|t: &Tree| Some(&t.left));
    let cursor = cursor.step_fn(|t: &Tree| Some(&t.left));
    assert_eq!(cursor.get().unwrap().value, 3);
}

#[test]
fn step_offset_matches_step_fn_for_the_same_field() {
    let mut root = node(1, leaf(2), leaf(3));
    // Capture the field pointer before building any cursor over `root`.
    let offset_field: *const Shared<Tree> = {
        let value = root.read();
        std::ptr::from_ref(&value.right)
    };
    let cursor = Cursor::new(&mut root);
    let field_ref = unsafe { &*offset_field };
    let cursor = cursor.step_offset(field_ref);
    assert_eq!(cursor.get().unwrap().value, 3);
}

#[test]
fn write_propagates_exactly_one_level_up_and_caches_after_first_materialization() {
    let shared_right = leaf(9);
    let mut a = node(1, leaf(2), shared_right.clone());
    let b = a.clone();

    let mut cursor = Cursor::new(&mut a).step_fn(|t: &Tree| Some(&t.right));
    cursor.write().unwrap().value = 90;
    // A second write on the same cursor must not re-clone anything further.
    let addr_before = cursor.get().map(std::ptr::from_ref);
    cursor.write();
    let addr_after = cursor.get().map(std::ptr::from_ref);
    assert_eq!(addr_before, addr_after);

    drop(cursor);
    assert_eq!(a.read().right.read().value, 90);
    assert_eq!(b.read().right.read().value, 9);
    assert_eq!(a.read().left, b.read().left);
}

#[test]
fn deref_reads_the_observed_slots_payload() {
    let mut root = leaf(7);
    let cursor = Cursor::new(&mut root);
    assert_eq!(cursor.value, 7);
}
