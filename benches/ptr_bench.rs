use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use shmptr::{
    make_uptr_in, AllocatorId, AllocatorRegistry, BumpAllocator, Mptr, PoolAllocator,
    SegmentAllocator, SegmentAllocatorExt, TypedPointer,
};
use std::sync::Arc;

fn benchmark_allocate_construct(c: &mut Criterion) {
    let mut group = c.benchmark_group("AllocateConstruct");

    group.bench_function("bump_u64", |b| {
        let memory = Box::leak(vec![0u8; 1024 * 1024].into_boxed_slice());
        let allocator = BumpAllocator::new(AllocatorId(1), memory).unwrap();

        b.iter(|| {
            allocator.reset().unwrap();
            let mut loc = shmptr::OffsetPointer::null();
            for i in 0..100u64 {
                let _ = allocator.allocate_construct::<u64, _>(&mut loc, (i,));
            }
        });
    });

    group.finish();
}

fn benchmark_make_and_drop(c: &mut Criterion) {
    let mut group = c.benchmark_group("MakeAndDrop");

    for block_size in [64, 256].iter() {
        group.bench_with_input(
            BenchmarkId::new("uptr_u64", block_size),
            block_size,
            |b, &block_size| {
                let memory = Box::leak(vec![0u8; 1024 * 1024].into_boxed_slice());
                let allocator: Arc<dyn SegmentAllocator> =
                    Arc::new(PoolAllocator::new(AllocatorId(2), memory, block_size).unwrap());

                b.iter(|| {
                    let ptr = make_uptr_in::<u64, _>(allocator.clone(), (42u64,)).unwrap();
                    assert_eq!(*ptr, 42);
                    // Drop frees the block back to the pool
                });
            },
        );
    }

    group.finish();
}

fn benchmark_serialize_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("SerializeResolve");

    group.bench_function("to_typed", |b| {
        let memory = Box::leak(vec![0u8; 64 * 1024].into_boxed_slice());
        let allocator: Arc<dyn SegmentAllocator> =
            Arc::new(PoolAllocator::new(AllocatorId(3), memory, 64).unwrap());
        let ptr = make_uptr_in::<u64, _>(allocator, (7u64,)).unwrap();

        b.iter(|| {
            let locator: TypedPointer<u64> = ptr.to_typed();
            criterion::black_box(locator);
        });
    });

    group.bench_function("resolve_mptr", |b| {
        let memory = Box::leak(vec![0u8; 64 * 1024].into_boxed_slice());
        let allocator: Arc<dyn SegmentAllocator> =
            Arc::new(PoolAllocator::new(AllocatorId(4), memory, 64).unwrap());

        let registry = AllocatorRegistry::new();
        registry.register(allocator.clone()).unwrap();

        let ptr = make_uptr_in::<u64, _>(allocator, (7u64,)).unwrap();
        let locator = ptr.to_typed();

        b.iter(|| {
            let alias = Mptr::<u64>::from_typed_in(&registry, &locator).unwrap();
            criterion::black_box(*alias);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_allocate_construct,
    benchmark_make_and_drop,
    benchmark_serialize_resolve
);
criterion_main!(benches);
