use cow_tree::Shared;

#[test]
fn null_handle_reports_zero_use_count() {
    let h: Shared<i32> = Shared::null();
    assert!(!h.is_set());
    assert_eq!(h.use_count(), 0);
    assert_eq!(h.get(), None);
    assert_eq!(h.type_info(), None);
    assert_eq!(h, Shared::null());
}

#[test]
fn make_is_never_null_and_starts_at_one() {
    let i = Shared::make(1);
    assert!(i.is_set());
    assert_eq!(*i.read(), 1);
    assert_eq!(i.use_count(), 1);
}

#[test]
fn clone_shares_and_bumps_refcount() {
    let i = Shared::make(1);
    let j = i.clone();
    assert_eq!(i.use_count(), 2);
    assert_eq!(j.use_count(), 2);
    assert_eq!(i.get(), j.get());
    assert_eq!(i, j);

    {
        let mut k = Shared::null();
        assert!(!k.is_set());
        assert_eq!(k, Shared::null());
        k = i.clone();
        assert!(k.is_set());
        assert_eq!(*k.read(), 1);
        assert_eq!(i.use_count(), 3);
        assert_eq!(j.use_count(), 3);
        assert_eq!(k.use_count(), 3);
        assert_eq!(i, k);
    }

    assert_eq!(i.use_count(), 2);
    assert_eq!(j.use_count(), 2);
}

#[test]
fn write_on_aliased_handle_clones_and_diverges() {
    let a = Shared::make(1);
    let mut b = a.clone();
    assert_eq!(a.use_count(), 2);

    *b.write() = 2;
    assert_eq!(a.use_count(), 1);
    assert_eq!(b.use_count(), 1);
    assert_ne!(a.get(), b.get());
    assert_ne!(a, b);
    assert_eq!(*a.read(), 1);
    assert_eq!(*b.read(), 2);
}

#[test]
fn write_on_unique_handle_does_not_reallocate() {
    let mut a = Shared::make(1);
    let before = a.get().map(std::ptr::from_ref);
    *a.write() = 9;
    let after = a.get().map(std::ptr::from_ref);
    assert_eq!(before, after);
    assert_eq!(*a.read(), 9);
}

#[test]
fn reset_drops_one_reference() {
    let i = Shared::make(1);
    let mut j = i.clone();
    assert_eq!(i.use_count(), 2);
    j.reset();
    assert!(!j.is_set());
    assert_eq!(i.use_count(), 1);
}

#[test]
fn move_transfers_ownership_without_touching_refcount() {
    let i = Shared::make(1);
    let m = i.clone();
    assert!(m.is_set());
    let n = m;
    assert!(n.is_set());
    assert_eq!(i.use_count(), 2);
    assert_eq!(n.use_count(), 2);
}

#[derive(Clone, PartialEq, Debug)]
struct Point2i {
    x: i32,
    y: i32,
}

#[test]
fn struct_payload_field_mutation_through_write() {
    let mut i = Shared::make(Point2i { x: 1, y: 2 });
    let j = i.clone();
    assert_eq!(i, j);

    i.write().x += 10;
    assert_ne!(i, j);
    assert_eq!(i.read().x, 11);
    assert_eq!(i.read().y, 2);
    assert_eq!(j.read().x, 1);
    assert_eq!(j.read().y, 2);
}
