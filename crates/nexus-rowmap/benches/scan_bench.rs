//! Scan benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nexus_rowmap::{record, Mapper, MappingCache, Record, ResultSet, Value};

record! {
    #[derive(Debug, Default)]
    pub struct Order {
        pub id: i64,
        pub status: String,
        pub total: f64,
        pub customer: Option<Customer>,
    }
}

record! {
    #[derive(Debug, Default)]
    pub struct Customer {
        #[column = "customer_name"]
        pub name: String,
        pub vip: bool,
    }
}

fn orders(count: i64) -> ResultSet {
    let mut result = ResultSet::new(["id", "status", "total", "customer_name", "vip"]);
    for i in 0..count {
        result.push_row([
            Value::Integer(i),
            Value::from("shipped"),
            Value::Float(i as f64 * 1.5),
            Value::from(format!("customer-{}", i % 17)),
            Value::Boolean(i % 5 == 0),
        ]);
    }
    result
}

fn scan_many_benchmark(c: &mut Criterion) {
    let mapper = Mapper::default();
    let result = orders(1000);

    c.bench_function("scan_many_nested_1000", |b| {
        b.iter(|| {
            let mut got: Vec<Order> = Vec::with_capacity(1000);
            mapper
                .scan_many(&mut got, result.clone().into_rows())
                .unwrap();
            black_box(got.len())
        })
    });
}

fn scan_many_leaf_benchmark(c: &mut Criterion) {
    let mapper = Mapper::default();
    let mut result = ResultSet::new(["id"]);
    for i in 0..1000 {
        result.push_row([i]);
    }

    c.bench_function("scan_many_leaf_1000", |b| {
        b.iter(|| {
            let mut got: Vec<i64> = Vec::with_capacity(1000);
            mapper
                .scan_many(&mut got, result.clone().into_rows())
                .unwrap();
            black_box(got.len())
        })
    });
}

fn scan_one_benchmark(c: &mut Criterion) {
    let mapper = Mapper::default();
    let result = orders(1);

    c.bench_function("scan_one_nested", |b| {
        b.iter(|| {
            let mut order = Order::default();
            mapper.scan_one(&mut order, result.clone().into_rows()).unwrap();
            black_box(order.id)
        })
    });
}

fn cache_lookup_benchmark(c: &mut Criterion) {
    let cache = MappingCache::default();
    cache.get_or_build(Order::describe()).unwrap();

    c.bench_function("cache_lookup_1000", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                black_box(cache.get_or_build(Order::describe()).unwrap());
            }
        })
    });
}

criterion_group!(
    benches,
    scan_many_benchmark,
    scan_many_leaf_benchmark,
    scan_one_benchmark,
    cache_lookup_benchmark,
);
criterion_main!(benches);
