//! Benchmark: cost of `Shared::write()` on a uniquely-held handle versus
//! an aliased one, and the same comparison one level down a `Trail`.

use cow_tree::{Shared, Trail};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

#[derive(Clone)]
struct Payload {
    data: [u64; 32],
}

fn payload(seed: u64) -> Payload {
    Payload { data: [seed; 32] }
}

fn bench_write_unique(c: &mut Criterion) {
    c.bench_function("write_unique_handle", |b| {
        b.iter(|| {
            let mut h = Shared::make(payload(1));
            h.write().data[0] += 1;
            black_box(&h);
        });
    });
}

fn bench_write_aliased(c: &mut Criterion) {
    c.bench_function("write_aliased_handle", |b| {
        b.iter(|| {
            let a = Shared::make(payload(1));
            let mut b = a.clone();
            b.write().data[0] += 1;
            black_box((&a, &b));
        });
    });
}

#[derive(Clone)]
struct Tree {
    value: u64,
    left: Shared<Tree>,
    right: Shared<Tree>,
}

fn leaf(value: u64) -> Shared<Tree> {
    Shared::make(Tree { value, left: Shared::null(), right: Shared::null() })
}

fn bench_trail_write_unique(c: &mut Criterion) {
    c.bench_function("trail_write_unique_path", |b| {
        b.iter(|| {
            let mut root = Shared::make(Tree { value: 0, left: leaf(1), right: leaf(2) });
            let mut trail = Trail::new(&mut root);
            trail.push_fn(|t: &Tree| Some(&t.left));
            trail.write().unwrap().value += 1;
            black_box(&root);
        });
    });
}

fn bench_trail_write_aliased(c: &mut Criterion) {
    c.bench_function("trail_write_aliased_path", |b| {
        b.iter(|| {
            let mut a = Shared::make(Tree { value: 0, left: leaf(1), right: leaf(2) });
            let b = a.clone();
            {
                let mut trail = Trail::new(&mut a);
                trail.push_fn(|t: &Tree| Some(&t.left));
                trail.write().unwrap().value += 1;
            }
            black_box((&a, &b));
        });
    });
}

criterion_group!(
    name = write_clone;
    config = Criterion::default().sample_size(50);
    targets =
        bench_write_unique,
        bench_write_aliased,
        bench_trail_write_unique,
        bench_trail_write_aliased,
);

criterion_main!(write_clone);
