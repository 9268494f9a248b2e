use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use mysql_activerecord::{ClauseBuilder, InsertVerb, LikeSide, QueryBuilder, Record};

/// SELECT over `n` columns with `n` equality conditions and a join.
fn compile_select(qb: &mut QueryBuilder, n: usize) -> String {
    qb.from("orders o").join("customers c", "c.id = o.customer_id", "left");
    for i in 0..n {
        qb.select(&format!("o.col{i}"));
        qb.where_eq(&format!("o.col{i}"), i as i64);
    }
    qb.like("c.name", "smith", LikeSide::Both)
        .order_by("o.id DESC")
        .limit(50);
    qb.build_get_from_state().unwrap_or_default()
}

fn bench_select(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/select");

    for n in [1, 5, 10, 50] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut qb = QueryBuilder::new();
            b.iter(|| black_box(compile_select(&mut qb, n)));
        });
    }

    group.finish();
}

fn bench_insert_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/insert_batch");

    for rows in [1, 10, 100, 1000] {
        let records: Vec<Record> = (0..rows)
            .map(|i| {
                Record::new()
                    .with("id", i as i64)
                    .with("name", format!("name-{i}"))
                    .with("note", "it's")
            })
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(rows),
            &records,
            |b, records| {
                let mut qb = QueryBuilder::new();
                b.iter(|| black_box(qb.build_insert_batch(InsertVerb::Insert, "t", records)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_select, bench_insert_batch);
criterion_main!(benches);
