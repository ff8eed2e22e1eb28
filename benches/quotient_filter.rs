use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use quotient_filter::quotient::QuotientFilter;

fn bench_insert(c: &mut Criterion) {
    let mut initial_items = 0;
    while initial_items < 1024 - 32 {
        c.bench_function(&format!("bench insert {}", initial_items), |b| {
            b.iter_batched_ref(
                || {
                    let mut filter = QuotientFilter::from_fpp(1024, 0.01).unwrap();
                    for i in 0..initial_items {
                        filter.insert(i as u64);
                    }
                    filter
                },
                |filter| filter.insert(0xDEADBEEF),
                BatchSize::PerIteration,
            )
        });
        initial_items += 32;
    }
}

fn bench_may_contain(c: &mut Criterion) {
    let mut filter = QuotientFilter::from_fpp(1 << 16, 0.01).unwrap();
    for i in 0..(1u64 << 15) {
        filter.insert(i);
    }

    c.bench_function("bench may_contain present", |b| {
        b.iter(|| filter.may_contain(1234))
    });
    c.bench_function("bench may_contain absent", |b| {
        b.iter(|| filter.may_contain(0xDEADBEEF))
    });
}

fn bench_remove(c: &mut Criterion) {
    c.bench_function("bench remove", |b| {
        b.iter_batched_ref(
            || {
                let mut filter = QuotientFilter::from_fpp(1024, 0.01).unwrap();
                for i in 0..512u64 {
                    filter.insert(i);
                }
                filter
            },
            |filter| filter.remove(256),
            BatchSize::PerIteration,
        )
    });
}

criterion_group!(benches, bench_insert, bench_may_contain, bench_remove);
criterion_main!(benches);
