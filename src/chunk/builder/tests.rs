use super::*;
use crate::loader::build_partition_map;

fn sample_installation() -> (Installation, PartitionMap) {
    let installation: Installation = serde_json::from_str(
        r#"{
            "endpoints": [
                {
                    "uuid": "ep-sensor",
                    "name": "Fall sensor",
                    "category": 18,
                    "visualizationType": "VAYYAR_CARE",
                    "partitions": ["p-first"],
                    "parameters": [
                        {"name": "fall", "dataType": 2, "logType": 4},
                        {"name": "temperature", "dataType": 1, "unit": "C", "logType": 3},
                        {"name": "monitoring", "dataType": 2, "operation": {"type": "switch"}, "logType": 0}
                    ]
                },
                {
                    "uuid": "ep-light",
                    "name": "Smart light controller",
                    "category": 15,
                    "visualizationType": "WS558",
                    "partitions": ["p-second"],
                    "parameters": [
                        {"name": "line_1", "dataType": 2, "operation": {"type": "switch"}},
                        {"name": "mode", "dataType": 4, "enumerationVal": ["on", "off", "auto"]}
                    ]
                },
                {
                    "uuid": "ep-unplaced",
                    "name": "Meter",
                    "category": 11,
                    "visualizationType": "EASTRON_SDM630",
                    "partitions": ["p-loose"],
                    "parameters": [
                        {"name": "voltage", "dataType": 1, "unit": "V", "logType": 3}
                    ]
                }
            ],
            "areas": [
                {
                    "uuid": "area-north",
                    "name": "North area",
                    "partitions": [{"uuid": "p-first", "name": "First floor"}]
                },
                {
                    "uuid": "area-south",
                    "name": "South area",
                    "partitions": [
                        {"uuid": "p-second", "name": "Second floor"},
                        {"uuid": "p-mixed", "name": "First floor stairwell"}
                    ]
                }
            ]
        }"#,
    )
    .expect("fixture should parse");

    let partition_map = build_partition_map(&installation);
    (installation, partition_map)
}

#[test]
fn builds_three_chunk_families() {
    let (installation, partition_map) = sample_installation();
    let chunks = build_chunks(&installation, &partition_map, "test.json");

    let areas = chunks
        .iter()
        .filter(|c| c.metadata.chunk_type == ChunkType::Area)
        .count();
    let details = chunks
        .iter()
        .filter(|c| c.metadata.chunk_type == ChunkType::Detail)
        .count();
    let summaries = chunks
        .iter()
        .filter(|c| c.metadata.chunk_type == ChunkType::Summary)
        .count();

    assert_eq!(areas, 2);
    assert_eq!(details, 3);
    assert_eq!(summaries, 3);
}

#[test]
fn area_floor_classification() {
    let (installation, partition_map) = sample_installation();
    let chunks = build_chunks(&installation, &partition_map, "test.json");

    let north = chunks
        .iter()
        .find(|c| c.metadata.area_uuid.as_deref() == Some("area-north"))
        .expect("north area chunk should exist");
    assert_eq!(north.metadata.floor_location, FloorLocation::First);
    assert!(north.metadata.is_first_floor);
    assert!(!north.metadata.is_second_floor);

    // South area spans both floors through its partitions
    let south = chunks
        .iter()
        .find(|c| c.metadata.area_uuid.as_deref() == Some("area-south"))
        .expect("south area chunk should exist");
    assert_eq!(south.metadata.floor_location, FloorLocation::Both);
}

#[test]
fn detail_chunk_inherits_area_floor() {
    let (installation, partition_map) = sample_installation();
    let chunks = build_chunks(&installation, &partition_map, "test.json");

    let sensor_detail = chunks
        .iter()
        .find(|c| {
            c.metadata.chunk_type == ChunkType::Detail
                && c.metadata.uuid.as_deref() == Some("ep-sensor")
        })
        .expect("sensor detail chunk should exist");

    assert_eq!(sensor_detail.metadata.floor_location, FloorLocation::First);
    assert_eq!(sensor_detail.metadata.area_name.as_deref(), Some("North area"));
    assert_eq!(
        sensor_detail.metadata.partition_names,
        vec!["First floor".to_string()]
    );

    let payload = sensor_detail.parse_content().expect("payload should parse");
    assert_eq!(payload["chunkType"], "detail");
    assert_eq!(payload["parameters"].as_array().map(Vec::len), Some(3));
    assert_eq!(payload["endpoint"]["associatedArea"]["uuid"], "area-north");
}

#[test]
fn endpoint_without_area_uses_partition_heuristics() {
    let (installation, partition_map) = sample_installation();
    let chunks = build_chunks(&installation, &partition_map, "test.json");

    let meter = chunks
        .iter()
        .find(|c| {
            c.metadata.chunk_type == ChunkType::Detail
                && c.metadata.uuid.as_deref() == Some("ep-unplaced")
        })
        .expect("meter detail chunk should exist");

    // "Partition_p-loose" carries no floor keyword
    assert_eq!(meter.metadata.floor_location, FloorLocation::Unknown);
    assert!(meter.metadata.area_name.is_none());
}

#[test]
fn summary_chunk_aggregates_statistics() {
    let (installation, partition_map) = sample_installation();
    let chunks = build_chunks(&installation, &partition_map, "test.json");

    let sensor_summary = chunks
        .iter()
        .find(|c| {
            c.metadata.chunk_type == ChunkType::Summary
                && c.metadata.uuid.as_deref() == Some("ep-sensor")
        })
        .expect("sensor summary chunk should exist");

    let payload = sensor_summary.parse_content().expect("payload should parse");
    let stats = &payload["parametersStats"];
    assert_eq!(stats["total"], 3);
    assert_eq!(stats["byLogType"]["3"], 1);
    assert_eq!(stats["byLogType"]["4"], 1);
    assert_eq!(stats["byOperationType"]["switch"], 1);
    assert_eq!(stats["byOperationType"]["none"], 2);
    assert_eq!(stats["hasControl"], true);
    assert_eq!(stats["hasMeasurement"], true);
    assert_eq!(stats["hasEnumeration"], false);
    assert_eq!(
        stats["parameterNames"],
        serde_json::json!(["fall", "temperature", "monitoring"])
    );

    // Summary payload never embeds the raw parameter array
    assert!(payload.get("parameters").is_none());
}

#[test]
fn area_without_uuid_is_skipped() {
    let installation: Installation = serde_json::from_str(
        r#"{
            "endpoints": [{"uuid": "ep-1", "name": "Dev", "category": 0, "partitions": []}],
            "areas": [{"name": "Nameless"}, {"uuid": "area-ok", "name": "Ok", "partitions": []}]
        }"#,
    )
    .expect("fixture should parse");
    let partition_map = build_partition_map(&installation);

    let chunks = build_chunks(&installation, &partition_map, "test.json");
    let areas: Vec<_> = chunks
        .iter()
        .filter(|c| c.metadata.chunk_type == ChunkType::Area)
        .collect();
    assert_eq!(areas.len(), 1);
    assert_eq!(areas[0].metadata.area_uuid.as_deref(), Some("area-ok"));
}

#[test]
fn zero_endpoints_yields_no_device_chunks() {
    let installation: Installation = serde_json::from_str(
        r#"{"endpoints": [], "areas": [{"uuid": "a-1", "name": "A", "partitions": []}]}"#,
    )
    .expect("fixture should parse");
    let partition_map = build_partition_map(&installation);

    let chunks = build_chunks(&installation, &partition_map, "test.json");
    assert!(chunks.iter().all(|c| c.metadata.chunk_type == ChunkType::Area));
}

#[test]
fn area_chunk_lists_attached_devices() {
    let (installation, partition_map) = sample_installation();
    let chunks = build_chunks(&installation, &partition_map, "test.json");

    let north = chunks
        .iter()
        .find(|c| c.metadata.area_uuid.as_deref() == Some("area-north"))
        .expect("north area chunk should exist");

    let payload = north.parse_content().expect("payload should parse");
    let devices = payload["devices"].as_array().expect("devices array");
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["uuid"], "ep-sensor");
    assert_eq!(devices[0]["deviceType"], "sensor");
    assert_eq!(north.metadata.extra["devicesCount"], serde_json::json!(1));
}
