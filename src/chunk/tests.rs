use serde_json::json;

use super::*;

#[test]
fn floor_location_from_flags() {
    assert_eq!(FloorLocation::from_flags(true, false), FloorLocation::First);
    assert_eq!(
        FloorLocation::from_flags(false, true),
        FloorLocation::Second
    );
    assert_eq!(FloorLocation::from_flags(true, true), FloorLocation::Both);
    assert_eq!(
        FloorLocation::from_flags(false, false),
        FloorLocation::Unknown
    );
}

#[test]
fn chunk_type_serialization() {
    assert_eq!(
        serde_json::to_string(&ChunkType::Detail).expect("should serialize"),
        "\"detail\""
    );
    let parsed: ChunkType = serde_json::from_str("\"fallback\"").expect("should deserialize");
    assert_eq!(parsed, ChunkType::Fallback);
}

#[test]
fn chunk_round_trip() {
    let metadata = ChunkMetadata {
        chunk_type: ChunkType::Detail,
        uuid: Some("ep-1".to_string()),
        name: Some("Thermostat".to_string()),
        floor_location: FloorLocation::First,
        is_first_floor: true,
        ..ChunkMetadata::default()
    };

    let chunk = Chunk::new(&json!({"chunkType": "detail", "endpoint": {"uuid": "ep-1"}}), metadata);
    let parsed = chunk.parse_content().expect("content should parse");
    assert_eq!(parsed["chunkType"], "detail");
    assert_eq!(chunk.size(), chunk.content.len());
}

#[test]
fn metadata_merge_critical_fields_win() {
    let original = ChunkMetadata {
        chunk_type: ChunkType::Detail,
        floor_location: FloorLocation::First,
        is_first_floor: true,
        partition_names: vec!["First floor".to_string()],
        visualization_type: Some("WS558".to_string()),
        category: Some(15),
        area_name: Some("North area".to_string()),
        ..ChunkMetadata::default()
    };

    let produced = ChunkMetadata {
        chunk_type: ChunkType::Partial,
        floor_location: FloorLocation::Unknown,
        name: Some("line_1".to_string()),
        parameter_name: Some("line_1".to_string()),
        ..ChunkMetadata::default()
    };

    let merged = merge_critical_metadata(&original, produced);

    // Critical fields come from the original
    assert_eq!(merged.floor_location, FloorLocation::First);
    assert!(merged.is_first_floor);
    assert_eq!(merged.partition_names, vec!["First floor".to_string()]);
    assert_eq!(merged.visualization_type.as_deref(), Some("WS558"));
    assert_eq!(merged.category, Some(15));
    assert_eq!(merged.chunk_type, ChunkType::Detail);
    assert_eq!(merged.area_name.as_deref(), Some("North area"));

    // Non-critical produced fields survive
    assert_eq!(merged.name.as_deref(), Some("line_1"));
    assert_eq!(merged.parameter_name.as_deref(), Some("line_1"));
}

#[test]
fn metadata_merge_layers_extension_map() {
    let mut original = ChunkMetadata::default();
    original
        .extra
        .insert("inherited".to_string(), json!("from-original"));
    original.extra.insert("shared".to_string(), json!("old"));

    let mut produced = ChunkMetadata::default();
    produced.extra.insert("shared".to_string(), json!("new"));
    produced.extra.insert("added".to_string(), json!(1));

    let merged = merge_critical_metadata(&original, produced);

    assert_eq!(merged.extra["inherited"], json!("from-original"));
    assert_eq!(merged.extra["shared"], json!("new"));
    assert_eq!(merged.extra["added"], json!(1));
}

#[test]
fn device_key_prefers_parent() {
    let metadata = ChunkMetadata {
        uuid: Some("child-uuid".to_string()),
        parent_uuid: Some("device-uuid".to_string()),
        ..ChunkMetadata::default()
    };
    assert_eq!(metadata.device_key(), Some("device-uuid"));

    let metadata = ChunkMetadata {
        uuid: Some("device-uuid".to_string()),
        ..ChunkMetadata::default()
    };
    assert_eq!(metadata.device_key(), Some("device-uuid"));
}

#[test]
fn metadata_extension_map_round_trip() {
    let mut metadata = ChunkMetadata::default();
    metadata
        .extra
        .insert("customFlag".to_string(), json!(true));

    let serialized = serde_json::to_string(&metadata).expect("should serialize");
    let parsed: ChunkMetadata = serde_json::from_str(&serialized).expect("should deserialize");
    assert_eq!(parsed.extra["customFlag"], json!(true));
    assert_eq!(parsed, metadata);
}
