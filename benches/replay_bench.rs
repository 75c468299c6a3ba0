use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sql_replayer::buffer::{Fill, StreamBuffer};
use sql_replayer::classifier::{Classifier, LineClass, SqlDialect};
use std::hint::black_box;

fn generate_dump(num_statements: usize, rows_per_insert: usize) -> Vec<u8> {
    let mut data = Vec::new();

    data.extend_from_slice(b"-- MySQL dump\n--\n");
    data.extend_from_slice(
        b"CREATE TABLE users (\n  id INT PRIMARY KEY,\n  name VARCHAR(255),\n  email VARCHAR(255)\n);\n",
    );

    for i in 0..num_statements {
        data.extend_from_slice(b"INSERT INTO users VALUES\n");
        for r in 0..rows_per_insert {
            let id = i * rows_per_insert + r;
            let sep = if r + 1 == rows_per_insert { ";" } else { "," };
            data.extend_from_slice(
                format!("({}, 'User {}', 'user{}@example.com'){}\n", id, id, id, sep).as_bytes(),
            );
        }
    }

    data
}

/// Runs the boundary scan and classification loop without executing anything.
fn scan(data: &[u8], capacity: usize) -> usize {
    let mut source = data;
    let mut buffer = StreamBuffer::new(capacity, 0);
    let dialect = SqlDialect::MySql;
    let mut statements = 0;

    loop {
        while let Some(boundary) = buffer.next_boundary() {
            match dialect.classify(buffer.candidate(boundary).bytes) {
                LineClass::Incomplete => {}
                LineClass::Execute => {
                    statements += 1;
                    buffer.advance_consumed(boundary + 1);
                }
                LineClass::Skip => buffer.advance_consumed(boundary + 1),
            }
        }
        buffer.reclaim();
        if buffer.fill(&mut source).unwrap() == Fill::EndOfStream {
            break;
        }
    }

    statements
}

fn bench_scan_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_throughput");

    for rows in [1, 100, 10_000] {
        let data = generate_dump(20_000 / rows.min(20_000) + 10, rows);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("rows_per_insert", rows),
            &data,
            |b, data| b.iter(|| scan(black_box(data), 64 * 1024)),
        );
    }

    group.finish();
}

fn bench_initial_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("initial_capacity");
    let data = generate_dump(50, 1_000);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for capacity in [4 * 1024, 64 * 1024, 1024 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &data, |b, data| {
            b.iter(|| scan(black_box(data), capacity))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scan_throughput, bench_initial_capacity);
criterion_main!(benches);
