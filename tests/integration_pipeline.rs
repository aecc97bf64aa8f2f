//! End-to-end tests of the offline core: document loading, chunk building,
//! post-processing/splitting, query classification, adaptive filtering and
//! context formatting. No external services required.

use std::io::Write;

use config_qa::chunk::builder::build_chunks;
use config_qa::chunk::postprocess::process_chunks;
use config_qa::chunk::{ChunkType, FloorLocation};
use config_qa::context::format_context;
use config_qa::loader::{LoadOutcome, load_installation};
use config_qa::query::{analyze_query, filter_documents};
use tempfile::NamedTempFile;

fn installation_json() -> String {
    let many_parameters: Vec<String> = (0..50)
        .map(|i| {
            format!(
                r#"{{"name": "parameter_{i}", "dataType": 1, "unit": "C", "logType": 3,
                    "minVal": [0.0], "maxVal": [100.0],
                    "operation": {{"type": "switch"}},
                    "description": "{}"}}"#,
                "x".repeat(700)
            )
        })
        .collect();

    format!(
        r#"{{
            "metadata": {{"name": "Demo House", "revision": "4", "major": 2, "minor": 0}},
            "endpoints": [
                {{
                    "uuid": "ep-sensor",
                    "name": "Fall sensor",
                    "category": 18,
                    "visualizationType": "VAYYAR_CARE",
                    "partitions": ["p-first"],
                    "parameters": [
                        {{"name": "fall", "dataType": 2, "logType": 4}},
                        {{"name": "presence", "dataType": 2, "logType": 3}}
                    ]
                }},
                {{
                    "uuid": "ep-light",
                    "name": "Smart light controller",
                    "category": 15,
                    "visualizationType": "WS558",
                    "partitions": ["p-second"],
                    "parameters": [
                        {{"name": "line_1", "dataType": 2, "operation": {{"type": "switch"}}}},
                        {{"name": "livello", "dataType": 0, "minVal": [0.0], "maxVal": [100.0]}}
                    ]
                }},
                {{
                    "uuid": "ep-fat",
                    "name": "Big thermostat",
                    "category": 0,
                    "visualizationType": "SMABIT_AV2010_32",
                    "partitions": ["p-first"],
                    "parameters": [{params}]
                }}
            ],
            "areas": [
                {{
                    "uuid": "area-north",
                    "name": "North area",
                    "partitions": [{{"uuid": "p-first", "name": "First floor"}}]
                }},
                {{
                    "uuid": "area-south",
                    "name": "South area",
                    "partitions": [{{"uuid": "p-second", "name": "Second floor"}}]
                }}
            ]
        }}"#,
        params = many_parameters.join(",")
    )
}

fn load_fixture() -> (config_qa::model::Installation, config_qa::loader::PartitionMap) {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(installation_json().as_bytes())
        .expect("write fixture");

    match load_installation(file.path()).expect("fixture loads") {
        LoadOutcome::Loaded {
            installation,
            partition_map,
        } => (installation, partition_map),
        LoadOutcome::Fallback(_) => panic!("fixture should not degrade"),
    }
}

#[test]
fn full_offline_pipeline() {
    let (installation, partition_map) = load_fixture();

    let chunks = build_chunks(&installation, &partition_map, "installation-config.json");
    // 2 areas + 3 details + 3 summaries
    assert_eq!(chunks.len(), 8);

    let processed = process_chunks(chunks, 1300);

    // The oversized thermostat detail chunk became 1 parent + 50 children
    let fat_family = processed.family("ep-fat");
    assert!(fat_family.len() >= 51);

    let parents: Vec<_> = fat_family
        .iter()
        .filter(|c| c.metadata.is_split_parent())
        .collect();
    // Detail split parent plus possibly a summary split parent
    assert!(!parents.is_empty());

    // Every chunk fits the size limit or is explicitly marked
    for chunk in &processed.chunks {
        assert!(
            chunk.size() <= 1300 || chunk.metadata.warning.is_some(),
            "silently oversized chunk: {:?} ({} bytes)",
            chunk.metadata.name,
            chunk.size()
        );
    }

    // Location metadata survived splitting
    for chunk in &fat_family {
        assert_eq!(chunk.metadata.floor_location, FloorLocation::First);
        assert_eq!(
            chunk.metadata.visualization_type.as_deref(),
            Some("SMABIT_AV2010_32")
        );
    }
}

#[test]
fn generic_query_selects_summaries_end_to_end() {
    let (installation, partition_map) = load_fixture();
    let chunks = build_chunks(&installation, &partition_map, "installation-config.json");
    let processed = process_chunks(chunks, 1300);

    let analysis = analyze_query("Show me devices");
    assert!(analysis.is_generic_query);

    let filtered = filter_documents(&analysis, processed.chunks);
    assert!(!filtered.is_empty());
    assert!(
        filtered
            .iter()
            .all(|c| c.metadata.chunk_type == ChunkType::Summary)
    );
}

#[test]
fn first_floor_sensor_query_end_to_end() {
    let (installation, partition_map) = load_fixture();
    let chunks = build_chunks(&installation, &partition_map, "installation-config.json");
    let processed = process_chunks(chunks, 1300);

    let analysis = analyze_query("Show me all the sensors connected to the first floor");
    let filtered = filter_documents(&analysis, processed.chunks);

    assert!(!filtered.is_empty());
    for chunk in &filtered {
        assert_eq!(chunk.metadata.chunk_type, ChunkType::Detail);
        assert_eq!(chunk.metadata.floor_location, FloorLocation::First);
        assert!(
            chunk
                .metadata
                .category
                .is_none_or(|c| analysis.matched_categories.contains(&c))
        );
    }
    // The second-floor light never survives
    assert!(
        filtered
            .iter()
            .all(|c| c.metadata.uuid.as_deref() != Some("ep-light"))
    );
}

#[test]
fn context_renders_filtered_chunks() {
    let (installation, partition_map) = load_fixture();
    let chunks = build_chunks(&installation, &partition_map, "installation-config.json");
    let processed = process_chunks(chunks, 1300);

    let query = "what parameters does the fall sensor have?";
    let analysis = analyze_query(query);
    let filtered = filter_documents(&analysis, processed.chunks);
    let context = format_context(&filtered, query);

    assert!(context.contains("RELEVANT INFORMATION FOR QUERY"));
    assert!(context.contains("Fall sensor"));
    assert!(context.contains("CONTEXT STATISTICS"));
}

#[test]
fn empty_endpoints_yield_single_fallback_chunk() {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(br#"{"endpoints": [], "areas": []}"#)
        .expect("write fixture");

    let outcome = load_installation(file.path()).expect("load succeeds");
    let LoadOutcome::Fallback(chunk) = outcome else {
        panic!("expected fallback");
    };

    assert_eq!(chunk.metadata.chunk_type, ChunkType::Fallback);
    assert!(!chunk.metadata.is_valid);

    // The degraded chunk still flows through post-processing
    let processed = process_chunks(vec![chunk], 1300);
    assert_eq!(processed.chunks.len(), 1);
}

#[test]
fn classifier_union_for_multi_device_query() {
    let analysis = analyze_query("list the uuids of the actuator and the thermostat");

    let mut categories = analysis.matched_categories.clone();
    categories.sort_unstable();
    categories.dedup();
    assert_eq!(categories.len(), analysis.matched_categories.len());
    assert!(analysis.matched_categories.contains(&0));
    assert!(analysis.matched_categories.contains(&11));
}
