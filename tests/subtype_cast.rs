use cow_tree::{dynamic_cast_shared, static_cast_shared, Shared, Subtype};

#[derive(Clone, Debug, PartialEq)]
#[repr(C)]
struct Shape {
    area: f64,
}

#[derive(Clone, Debug, PartialEq)]
#[repr(C)]
struct Circle {
    base: Shape,
    radius: f64,
}

unsafe impl Subtype<Shape> for Circle {}

#[test]
fn cast_shares_the_refcount_and_views_the_base_prefix() {
    let circle = Shared::make(Circle { base: Shape { area: 3.0 }, radius: 1.0 });
    let shape: Shared<Shape> = circle.cast();
    assert_eq!(circle.use_count(), 2);
    assert_eq!(shape.use_count(), 2);
    assert_eq!(shape.read().area, 3.0);
}

#[test]
fn move_cast_transfers_without_bumping_refcount() {
    let circle = Shared::make(Circle { base: Shape { area: 5.0 }, radius: 2.0 });
    assert_eq!(circle.use_count(), 1);
    let shape: Shared<Shape> = circle.move_cast();
    assert_eq!(shape.use_count(), 1);
    assert_eq!(shape.read().area, 5.0);
}

#[test]
fn dynamic_succeeds_only_for_the_exact_allocated_type() {
    let circle = Shared::make(Circle { base: Shape { area: 7.0 }, radius: 3.0 });
    let shape: Shared<Shape> = circle.cast();

    // The allocation's dynamic type is still `Circle`, even viewed as `Shape`.
    assert_eq!(shape.type_info(), Some(std::any::TypeId::of::<Circle>()));

    let back: Option<Shared<Circle>> = shape.dynamic();
    assert!(back.is_some());
    assert_eq!(back.unwrap().read().radius, 3.0);

    let wrong: Option<Shared<Shape>> = shape.dynamic::<Shape>();
    // `shape`'s own static type is `Shape`, but its dynamic type is `Circle`.
    assert!(wrong.is_none());
}

#[test]
fn move_dynamic_preserves_the_source_on_a_type_mismatch() {
    let circle = Shared::make(Circle { base: Shape { area: 9.0 }, radius: 4.0 });
    let shape: Shared<Shape> = circle.cast();

    match shape.move_dynamic::<Shape>() {
        Ok(_) => panic!("dynamic type is Circle, not Shape"),
        Err(returned) => assert_eq!(returned.type_info(), Some(std::any::TypeId::of::<Circle>())),
    }
}

#[test]
fn free_function_aliases_match_the_methods() {
    let circle = Shared::make(Circle { base: Shape { area: 2.0 }, radius: 1.0 });
    let shape = static_cast_shared::<Shape, _>(&circle);
    assert_eq!(shape.read().area, 2.0);
    let round_trip: Option<Shared<Circle>> = dynamic_cast_shared(&shape);
    assert!(round_trip.is_some());
}
