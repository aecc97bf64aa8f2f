use serde_json::json;

use super::*;
use crate::chunk::{ChunkMetadata, ChunkType, FloorLocation};

fn small_chunk(uuid: &str, chunk_type: ChunkType) -> Chunk {
    Chunk::new(
        &json!({"chunkType": chunk_type.to_string(), "endpoint": {"uuid": uuid}}),
        ChunkMetadata {
            chunk_type,
            uuid: Some(uuid.to_string()),
            name: Some(format!("Device {uuid}")),
            ..ChunkMetadata::default()
        },
    )
}

fn oversized_chunk(uuid: &str, parameter_count: usize) -> Chunk {
    let parameters: Vec<serde_json::Value> = (0..parameter_count)
        .map(|i| json!({"name": format!("p_{i}"), "padding": "x".repeat(400)}))
        .collect();
    Chunk::new(
        &json!({"chunkType": "detail", "endpoint": {"uuid": uuid}, "parameters": parameters}),
        ChunkMetadata {
            chunk_type: ChunkType::Detail,
            uuid: Some(uuid.to_string()),
            name: Some(format!("Device {uuid}")),
            visualization_type: Some("WS558".to_string()),
            category: Some(15),
            floor_location: FloorLocation::Second,
            is_second_floor: true,
            partition_names: vec!["Second floor".to_string()],
            ..ChunkMetadata::default()
        },
    )
}

#[test]
fn small_chunks_pass_through_unchanged() {
    let chunks = vec![
        small_chunk("ep-1", ChunkType::Detail),
        small_chunk("ep-1", ChunkType::Summary),
    ];
    let before = chunks.clone();

    let processed = process_chunks(chunks, 1300);

    assert_eq!(processed.chunks, before);
}

#[test]
fn oversized_chunks_are_split_and_keep_location() {
    let chunks = vec![oversized_chunk("ep-big", 8), small_chunk("ep-2", ChunkType::Summary)];

    let processed = process_chunks(chunks, 1000);

    // 1 parent + 8 children + the untouched summary
    assert_eq!(processed.chunks.len(), 10);

    for chunk in processed
        .chunks
        .iter()
        .filter(|c| c.metadata.uuid.as_deref() != Some("ep-2"))
    {
        assert_eq!(chunk.metadata.floor_location, FloorLocation::Second);
        assert!(chunk.metadata.is_second_floor);
        assert_eq!(chunk.metadata.visualization_type.as_deref(), Some("WS558"));
        assert_eq!(chunk.metadata.category, Some(15));
        assert_eq!(
            chunk.metadata.partition_names,
            vec!["Second floor".to_string()]
        );
        assert_eq!(chunk.metadata.chunk_type, ChunkType::Detail);
    }
}

#[test]
fn device_families_group_split_output_with_parent() {
    let chunks = vec![
        oversized_chunk("ep-big", 5),
        small_chunk("ep-2", ChunkType::Detail),
        small_chunk("ep-2", ChunkType::Summary),
    ];

    let processed = process_chunks(chunks, 1000);

    // Children resolve through parent_uuid back to ep-big
    let big_family = processed.family("ep-big");
    assert_eq!(big_family.len(), 6);

    let other_family = processed.family("ep-2");
    assert_eq!(other_family.len(), 2);

    assert!(processed.family("missing").is_empty());
    assert_eq!(processed.device_families.len(), 2);
}

#[test]
fn split_children_share_one_session_with_parent() {
    let processed = process_chunks(vec![oversized_chunk("ep-big", 6)], 1000);

    let parents: Vec<_> = processed
        .chunks
        .iter()
        .filter(|c| c.metadata.is_split_parent())
        .collect();
    assert_eq!(parents.len(), 1);

    let session_id = &parents[0]
        .metadata
        .sequence
        .as_ref()
        .expect("sequence info")
        .session_id;
    for chunk in &processed.chunks {
        let seq = chunk.metadata.sequence.as_ref().expect("sequence info");
        assert_eq!(&seq.session_id, session_id);
    }
}

#[test]
fn orphaned_children_are_kept() {
    // A child chunk whose parent never made it into the list
    let mut orphan = small_chunk("ep-orphan", ChunkType::Detail);
    orphan.metadata.sequence = Some(crate::chunk::SequenceInfo {
        session_id: "split-lost".to_string(),
        chunk_id: 3,
        total_chunks: 5,
        is_parent: false,
    });
    orphan.metadata.chunk_address = Some("0.3".to_string());
    orphan.metadata.parent_uuid = Some("ep-gone".to_string());

    let processed = process_chunks(vec![orphan], 1300);

    // Logged, not dropped
    assert_eq!(processed.chunks.len(), 1);
    assert!(processed.device_families.contains_key("ep-gone"));
}
