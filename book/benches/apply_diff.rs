use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kestrel_book::{DiffInput, OrderBook, SnapshotInput};

fn seeded_book() -> OrderBook {
    let mut book = OrderBook::new(50);
    let bids = (0..50)
        .map(|i| ((50000 - i).to_string(), "1.0".to_string()))
        .collect();
    let asks = (0..50)
        .map(|i| ((50100 + i).to_string(), "1.0".to_string()))
        .collect();
    book.apply_snapshot(
        1,
        SnapshotInput {
            bids,
            asks,
            checksum: None,
        },
    )
    .unwrap();
    book
}

fn bench_apply_diff(c: &mut Criterion) {
    c.bench_function("apply_diff/single_level_update", |b| {
        let mut book = seeded_book();
        let mut seq = book.last_seq();
        b.iter(|| {
            seq += 1;
            let diff = DiffInput {
                first_update_id: seq,
                final_update_id: seq,
                bids: vec![("50000".to_string(), "1.5".to_string())],
                asks: vec![],
                checksum: None,
            };
            black_box(book.apply_diff(diff).unwrap());
        });
    });
}

criterion_group!(benches, bench_apply_diff);
criterion_main!(benches);
