use config_qa::chunk::splitter::split_chunk;
use config_qa::chunk::{Chunk, ChunkMetadata, ChunkType, FloorLocation};
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;

fn oversized_detail_chunk() -> Chunk {
    let parameters: Vec<serde_json::Value> = (0..200)
        .map(|i| {
            json!({
                "name": format!("parameter_{i}"),
                "dataType": 1,
                "unit": "C",
                "logType": 3,
                "minVal": [0.0],
                "maxVal": [100.0],
                "description": "x".repeat(400),
            })
        })
        .collect();

    let payload = json!({
        "chunkType": "detail",
        "endpoint": {"uuid": "ep-bench", "name": "Bench device", "category": 0},
        "parameters": parameters,
    });

    Chunk::new(
        &payload,
        ChunkMetadata {
            chunk_type: ChunkType::Detail,
            uuid: Some("ep-bench".to_string()),
            name: Some("Bench device".to_string()),
            floor_location: FloorLocation::First,
            is_first_floor: true,
            ..ChunkMetadata::default()
        },
    )
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let chunk = oversized_detail_chunk();
    c.bench_function("splitting", |b| {
        b.iter(|| split_chunk(black_box(&chunk), black_box(1300), 0))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
