//! Codec benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gestura_core::{codec, Category, RegisteredGestureSet};

fn data_message(gestures: usize) -> String {
    let mut elements = vec![serde_json::json!({
        "type": "frame",
        "data": {"id": 1, "hands": [{"x": 0.5, "y": 0.25, "z": 0.1}]}
    })];
    for i in 0..gestures {
        elements.push(serde_json::json!({
            "type": if i % 2 == 0 { "static" } else { "dynamic" },
            "name": format!("gesture-{}", i),
            "data": {"confidence": 0.97}
        }));
    }
    serde_json::json!({"type": "data", "data": elements}).to_string()
}

fn decode_benchmark(c: &mut Criterion) {
    let text = data_message(4);

    c.bench_function("decode_data_message", |b| {
        b.iter(|| black_box(codec::decode_inbound(&text).unwrap()))
    });
}

fn encode_benchmark(c: &mut Criterion) {
    let mut set = RegisteredGestureSet::new();
    set.register(Category::Static, vec!["fist", "palm", "point", "ok"]);
    set.register(Category::Dynamic, vec!["wave", "swipe", "circle"]);
    let ops = set.to_operations();

    c.bench_function("encode_full_sync", |b| {
        b.iter(|| black_box(codec::encode_operations(&ops).unwrap()))
    });
}

criterion_group!(benches, decode_benchmark, encode_benchmark);
criterion_main!(benches);
