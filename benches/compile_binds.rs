//! Criterion measurements of statement compilation and lazy row decoding.
//! Every iteration reuses the same seeded workload so runs stay comparable.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use sql_compose::prelude::*;
use std::hint::black_box;
use std::sync::LazyLock;

/// Deterministic bind values shared by all benchmark variants.
struct Workload {
    ids: Vec<i64>,
    names: Vec<String>,
}

static WORKLOAD: LazyLock<Workload> = LazyLock::new(|| {
    let count = workload_size();
    let mut ids: Vec<i64> = (1..=count as i64).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(1_234_567_890);
    ids.shuffle(&mut rng);
    let names = ids.iter().map(|id| format!("user-{id}'s")).collect();
    Workload { ids, names }
});

/// Resolve how many statements each iteration compiles.
fn workload_size() -> usize {
    std::env::var("BENCH_ROWS")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(1000)
}

fn bench_positional(c: &mut Criterion) {
    let workload = &*WORKLOAD;
    let mut group = c.benchmark_group("compile_positional");
    group.throughput(Throughput::Elements(workload.ids.len() as u64));

    for dialect in [DatabaseType::Sqlite, DatabaseType::Mysql] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{dialect:?}")),
            &dialect,
            |b, dialect| {
                b.iter(|| {
                    for (id, name) in workload.ids.iter().zip(&workload.names) {
                        let mut query = Query::with_dialect(
                            "SELECT * FROM users WHERE id = ? AND name = ? AND note <> '?'",
                            *dialect,
                        );
                        query.set_binds(vec![RowValues::Int(*id), RowValues::from(name.as_str())]);
                        black_box(query.get_final_statement().len());
                    }
                });
            },
        );
    }
    group.finish();
}

fn bench_named(c: &mut Criterion) {
    let workload = &*WORKLOAD;
    let mut group = c.benchmark_group("compile_named");
    group.throughput(Throughput::Elements(workload.ids.len() as u64));

    group.bench_function("prefix_keys", |b| {
        b.iter(|| {
            for (id, name) in workload.ids.iter().zip(&workload.names) {
                let mut query = Query::with_dialect(
                    "UPDATE users SET name = ':name', nickname = ':name_short' WHERE id = :id",
                    DatabaseType::Postgres,
                );
                query.set_binds(Binds::named([
                    ("id", RowValues::Int(*id)),
                    ("name", RowValues::from(name.as_str())),
                    ("name_short", RowValues::from(&name[..4])),
                ]));
                black_box(query.get_final_statement().len());
            }
        });
    });
    group.finish();
}

fn bench_row_decoding(c: &mut Criterion) {
    let workload = &*WORKLOAD;
    let tuples: Vec<RawTuple> = workload
        .ids
        .iter()
        .map(|id| {
            vec![
                ("id".to_string(), RowValues::Int(*id)),
                ("meta".to_string(), RowValues::Text(format!(r#"{{"id":{id},"tags":["a","b"]}}"#))),
                ("legacy".to_string(), RowValues::Text(format!("a:1:{{s:2:\"id\";i:{id};}}"))),
                ("note".to_string(), RowValues::Text("plain text".to_string())),
            ]
        })
        .collect();
    let rs = ResultSet::from_tuples(tuples);

    let mut group = c.benchmark_group("row_decoding");
    group.throughput(Throughput::Elements(rs.count() as u64));
    for column in ["meta", "legacy", "note"] {
        group.bench_with_input(BenchmarkId::from_parameter(column), &column, |b, column| {
            b.iter(|| {
                for row in &rs {
                    black_box(row.get(column));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_positional, bench_named, bench_row_decoding);
criterion_main!(benches);
