// Schema-aware chunk builder
// Turns one installation document into three chunk families: area chunks
// for location queries, detail chunks with the full parameter list, and
// summary chunks with aggregated statistics whose size stays bounded no
// matter how many parameters a device has.

#[cfg(test)]
mod tests;

use itertools::Itertools;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use crate::chunk::{Chunk, ChunkMetadata, ChunkType, FloorLocation};
use crate::loader::PartitionMap;
use crate::model::{Area, Endpoint, Installation, category_name};
use crate::query::device_type_for_category;

/// Build all chunk families for a loaded installation.
#[inline]
pub fn build_chunks(
    installation: &Installation,
    partition_map: &PartitionMap,
    source: &str,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    if installation.areas.is_empty() {
        debug!("no areas in document, skipping area chunks");
    } else {
        let area_chunks = build_area_chunks(installation, partition_map, source);
        info!("created {} area chunks", area_chunks.len());
        chunks.extend(area_chunks);
    }

    if installation.endpoints.is_empty() {
        warn!("no endpoints in document, skipping detail and summary chunks");
        return chunks;
    }

    let detail_chunks = build_detail_chunks(installation, partition_map, source);
    let summary_chunks = build_summary_chunks(installation, partition_map, source);
    info!(
        "created {} detail and {} summary chunks",
        detail_chunks.len(),
        summary_chunks.len()
    );
    chunks.extend(detail_chunks);
    chunks.extend(summary_chunks);

    chunks
}

/// Floor flags for an area, resolved through its member partitions' names.
fn area_floor_flags(area: &Area, partition_map: &PartitionMap) -> (bool, bool) {
    let mut is_first = false;
    let mut is_second = false;

    for partition in &area.partitions {
        let name = partition
            .name()
            .map(str::to_string)
            .or_else(|| partition_map.get(partition.uuid()).map(str::to_string));
        if let Some(name) = name {
            let (first, second) = floor_flags_from_name(&name);
            is_first |= first;
            is_second |= second;
        }
    }

    (is_first, is_second)
}

/// Keyword heuristics on a partition display name.
fn floor_flags_from_name(name: &str) -> (bool, bool) {
    let lower = name.to_lowercase();
    let is_first = lower.contains("first") || lower.contains("primo");
    let is_second = lower.contains("second") || lower.contains("secondo");
    (is_first, is_second)
}

/// First area sharing at least one partition with the endpoint.
fn area_for_endpoint<'a>(endpoint: &Endpoint, areas: &'a [Area]) -> Option<&'a Area> {
    areas.iter().find(|area| {
        area.partitions
            .iter()
            .any(|p| endpoint.partitions.iter().any(|uuid| uuid == p.uuid()))
    })
}

/// Floor flags for an endpoint: inherit the associated area's
/// classification, fall back to per-partition name heuristics.
fn endpoint_floor_flags(
    endpoint: &Endpoint,
    areas: &[Area],
    partition_map: &PartitionMap,
) -> (bool, bool) {
    if let Some(area) = area_for_endpoint(endpoint, areas) {
        return area_floor_flags(area, partition_map);
    }

    let mut is_first = false;
    let mut is_second = false;
    for uuid in &endpoint.partitions {
        if let Some(name) = partition_map.get(uuid) {
            let (first, second) = floor_flags_from_name(name);
            is_first |= first;
            is_second |= second;
        }
    }
    (is_first, is_second)
}

fn build_area_chunks(
    installation: &Installation,
    partition_map: &PartitionMap,
    source: &str,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for (index, area) in installation.areas.iter().enumerate() {
        let Some(area_uuid) = area.uuid.as_deref() else {
            warn!("skipping invalid area at index {index}: missing uuid");
            continue;
        };

        let (is_first, is_second) = area_floor_flags(area, partition_map);
        let floor_location = FloorLocation::from_flags(is_first, is_second);

        let partition_entries: Vec<Value> = area
            .partitions
            .iter()
            .map(|p| {
                let uuid = p.uuid();
                let name = p
                    .name()
                    .map(str::to_string)
                    .or_else(|| partition_map.get(uuid).map(str::to_string))
                    .unwrap_or_else(|| {
                        format!("Partition_{}", uuid.chars().take(8).collect::<String>())
                    });
                json!({"uuid": uuid, "name": name})
            })
            .collect();

        let partition_names: Vec<String> = partition_entries
            .iter()
            .filter_map(|p| p["name"].as_str().map(str::to_string))
            .filter(|name| !name.starts_with("Partition_"))
            .collect();

        let area_partition_uuids: Vec<&str> =
            area.partitions.iter().map(|p| p.uuid()).collect();
        let attached: Vec<&Endpoint> = installation
            .endpoints
            .iter()
            .filter(|ep| {
                ep.partitions
                    .iter()
                    .any(|uuid| area_partition_uuids.contains(&uuid.as_str()))
            })
            .collect();

        let devices: Vec<Value> = attached
            .iter()
            .map(|ep| {
                let main_parameters: Vec<Value> = ep
                    .parameters
                    .iter()
                    .take(3)
                    .map(|param| {
                        json!({
                            "name": &param.name,
                            "dataType": param.data_type,
                            "unit": &param.unit,
                            "operation": param.operation.as_ref().map(|op| op.kind.clone()),
                        })
                    })
                    .collect();
                json!({
                    "uuid": &ep.uuid,
                    "name": ep.display_name(),
                    "id": ep.id,
                    "category": ep.category,
                    "categoryName": ep.category.map(category_name),
                    "visualizationType": &ep.visualization_type,
                    "deviceType": ep.category.map(device_type_for_category),
                    "parametersCount": ep.parameters.len(),
                    "defaultParameter": &ep.default_parameter,
                    "mainParameters": main_parameters,
                })
            })
            .collect();

        let payload = json!({
            "type": "installation-config",
            "chunkType": "area",
            "area": {
                "uuid": area_uuid,
                "name": &area.name,
                "id": area.id,
                "longitude": area.longitude,
                "latitude": area.latitude,
                "partitions": partition_entries,
            },
            "devices": devices,
            "searchableText": area_searchable_text(area, &attached),
        });

        let device_types: Vec<String> = attached
            .iter()
            .filter_map(|ep| ep.category.map(device_type_for_category))
            .unique()
            .collect();
        let device_categories: Vec<i64> = attached
            .iter()
            .filter_map(|ep| ep.category)
            .unique()
            .collect();

        let mut metadata = ChunkMetadata {
            source: source.to_string(),
            chunk_type: ChunkType::Area,
            uuid: Some(area_uuid.to_string()),
            name: area.name.clone(),
            area_name: area.name.clone(),
            area_uuid: Some(area_uuid.to_string()),
            floor_location,
            is_first_floor: is_first,
            is_second_floor: is_second,
            partition_names,
            category: attached.first().and_then(|ep| ep.category),
            visualization_type: attached
                .first()
                .and_then(|ep| ep.visualization_type.clone()),
            parameters_count: attached
                .iter()
                .map(|ep| ep.parameters.len() as u32)
                .sum(),
            has_control_params: attached.iter().any(|ep| ep.has_control_params()),
            ..ChunkMetadata::default()
        };
        metadata.extra.insert("areaIndex".to_string(), json!(index));
        metadata
            .extra
            .insert("devicesCount".to_string(), json!(attached.len()));
        metadata
            .extra
            .insert("deviceTypes".to_string(), json!(device_types));
        metadata
            .extra
            .insert("deviceCategories".to_string(), json!(device_categories));
        metadata.extra.insert("hasAreaInfo".to_string(), json!(true));

        chunks.push(Chunk::new(&payload, metadata));
    }

    chunks
}

/// Metadata shared by the detail and summary chunk of one endpoint.
fn endpoint_common_metadata(
    endpoint: &Endpoint,
    installation: &Installation,
    partition_map: &PartitionMap,
    source: &str,
) -> ChunkMetadata {
    let (is_first, is_second) =
        endpoint_floor_flags(endpoint, &installation.areas, partition_map);
    let partition_names = partition_map.resolve_names(&endpoint.partitions);
    let associated_area = area_for_endpoint(endpoint, &installation.areas);

    let mut metadata = ChunkMetadata {
        source: source.to_string(),
        uuid: endpoint.uuid.clone(),
        name: Some(endpoint.display_name()),
        category: endpoint.category,
        category_name: endpoint.category.map(category_name),
        device_type: endpoint.category.map(device_type_for_category),
        visualization_type: endpoint.visualization_type.clone(),
        floor_location: FloorLocation::from_flags(is_first, is_second),
        is_first_floor: is_first,
        is_second_floor: is_second,
        partition_names,
        area_name: associated_area.and_then(|a| a.name.clone()),
        area_uuid: associated_area.and_then(|a| a.uuid.clone()),
        parameters_count: endpoint.parameters.len() as u32,
        has_control_params: endpoint.has_control_params(),
        has_measurement_params: endpoint.has_measurement_params(),
        has_enumeration_params: endpoint.has_enumeration_params(),
        has_config_params: endpoint.has_config_params(),
        parameter_units: endpoint.parameter_units(),
        ..ChunkMetadata::default()
    };
    metadata.extra.insert(
        "partitions".to_string(),
        json!(&endpoint.partitions),
    );
    metadata.extra.insert(
        "hasAreaInfo".to_string(),
        json!(associated_area.is_some() || !endpoint.partitions.is_empty()),
    );
    metadata.extra.insert(
        "parameterDataTypes".to_string(),
        json!(endpoint.parameter_data_types()),
    );
    metadata
}

fn endpoint_identity(
    endpoint: &Endpoint,
    installation: &Installation,
    partition_map: &PartitionMap,
) -> Value {
    let associated_area = area_for_endpoint(endpoint, &installation.areas);
    json!({
        "uuid": &endpoint.uuid,
        "name": endpoint.display_name(),
        "id": endpoint.id,
        "category": endpoint.category,
        "categoryName": endpoint.category.map(category_name),
        "visualizationType": &endpoint.visualization_type,
        "deviceType": endpoint.category.map(device_type_for_category),
        "partitions": &endpoint.partitions,
        "partitionNames": partition_map.resolve_names(&endpoint.partitions),
        "associatedArea": associated_area
            .map(|a| json!({"name": &a.name, "uuid": &a.uuid})),
    })
}

fn build_detail_chunks(
    installation: &Installation,
    partition_map: &PartitionMap,
    source: &str,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for (index, endpoint) in installation.endpoints.iter().enumerate() {
        if endpoint.uuid.is_none() {
            warn!("invalid endpoint at index {index}, skipping");
            continue;
        }

        let payload = json!({
            "chunkType": "detail",
            "endpoint": endpoint_identity(endpoint, installation, partition_map),
            "parameters": &endpoint.parameters,
            "searchableText": endpoint_searchable_text(endpoint),
        });

        let mut metadata =
            endpoint_common_metadata(endpoint, installation, partition_map, source);
        metadata.chunk_type = ChunkType::Detail;
        metadata
            .extra
            .insert("isEndpointDetail".to_string(), json!(true));

        chunks.push(Chunk::new(&payload, metadata));
    }

    chunks
}

fn build_summary_chunks(
    installation: &Installation,
    partition_map: &PartitionMap,
    source: &str,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for endpoint in &installation.endpoints {
        if endpoint.uuid.is_none() {
            continue;
        }

        let mut by_log_type = Map::new();
        let mut by_operation = Map::new();
        for param in &endpoint.parameters {
            let log_key = param
                .log_type
                .map_or_else(|| "unknown".to_string(), |t| t.to_string());
            let entry = by_log_type.entry(log_key).or_insert(json!(0));
            *entry = json!(entry.as_i64().unwrap_or(0) + 1);

            let op_key = param
                .operation
                .as_ref()
                .map_or_else(|| "none".to_string(), |op| op.kind.clone());
            let entry = by_operation.entry(op_key).or_insert(json!(0));
            *entry = json!(entry.as_i64().unwrap_or(0) + 1);
        }

        let parameter_names: Vec<&str> = endpoint
            .parameters
            .iter()
            .filter_map(|p| p.name.as_deref())
            .collect();

        let payload = json!({
            "chunkType": "summary",
            "endpoint": endpoint_identity(endpoint, installation, partition_map),
            "parametersStats": {
                "total": endpoint.parameters.len(),
                "byLogType": by_log_type,
                "byOperationType": by_operation,
                "parameterNames": parameter_names,
                "availableUnits": endpoint.parameter_units(),
                "hasControl": endpoint.has_control_params(),
                "hasMeasurement": endpoint.has_measurement_params(),
                "hasEnumeration": endpoint.has_enumeration_params(),
            },
            "searchableText": endpoint_summary_searchable_text(endpoint),
        });

        let mut metadata =
            endpoint_common_metadata(endpoint, installation, partition_map, source);
        metadata.chunk_type = ChunkType::Summary;
        metadata
            .extra
            .insert("isEndpointSummary".to_string(), json!(true));
        metadata
            .extra
            .insert("hasEndpoints".to_string(), json!(true));

        chunks.push(Chunk::new(&payload, metadata));
    }

    chunks
}

fn area_searchable_text(area: &Area, endpoints: &[&Endpoint]) -> String {
    let mut parts = vec![
        format!("Area: {}", area.name.as_deref().unwrap_or("Unnamed Area")),
        format!("UUID: {}", area.uuid.as_deref().unwrap_or("N/A")),
    ];

    if !area.partitions.is_empty() {
        let names: Vec<&str> = area
            .partitions
            .iter()
            .map(|p| p.name().unwrap_or_else(|| p.uuid()))
            .collect();
        parts.push(format!("Partitions: {}", names.join(", ")));
    }

    if !endpoints.is_empty() {
        parts.push(format!("Devices ({}):", endpoints.len()));
        for (index, endpoint) in endpoints.iter().enumerate() {
            let mut info = vec![endpoint.display_name()];
            if let Some(category) = endpoint.category {
                info.push(category_name(category));
            }
            if let Some(viz) = endpoint.visualization_type.as_deref() {
                info.push(viz.to_string());
            }
            parts.push(format!("  {}. {}", index + 1, info.join(" - ")));
        }
    }

    if let (Some(longitude), Some(latitude)) = (area.longitude, area.latitude) {
        parts.push(format!("Coordinates: {longitude}, {latitude}"));
    }

    parts.join("\n")
}

fn endpoint_searchable_text(endpoint: &Endpoint) -> String {
    let category = endpoint
        .category
        .map_or_else(|| "unknown".to_string(), |c| c.to_string());
    let mut parts = vec![
        format!("Device: {}", endpoint.display_name()),
        format!("UUID: {}", endpoint.uuid.as_deref().unwrap_or("N/A")),
        format!(
            "Category: {} ({category})",
            endpoint.category.map_or_else(|| "Unknown".to_string(), category_name)
        ),
        format!(
            "Type: {}",
            endpoint.visualization_type.as_deref().unwrap_or("Unknown")
        ),
    ];

    if !endpoint.parameters.is_empty() {
        parts.push(format!("Parameters ({}):", endpoint.parameters.len()));
        for (index, param) in endpoint.parameters.iter().enumerate() {
            let mut desc = vec![param
                .name
                .clone()
                .unwrap_or_else(|| "Unnamed parameter".to_string())];
            if let Some(unit) = param.unit.as_deref() {
                desc.push(format!("({unit})"));
            }
            if let Some(data_type) = param.data_type {
                desc.push(format!("Type: {data_type}"));
            }
            parts.push(format!("  {}. {}", index + 1, desc.join(" ")));
        }
    }

    if !endpoint.partitions.is_empty() {
        parts.push(format!("Partitions: {}", endpoint.partitions.join(", ")));
    }

    parts.join("\n")
}

/// Compact pipe-delimited text for summary chunks: identity, parameter
/// names and capabilities, no per-parameter detail.
fn endpoint_summary_searchable_text(endpoint: &Endpoint) -> String {
    let mut parts = vec![
        format!("Device: {}", endpoint.display_name()),
        format!("UUID: {}", endpoint.uuid.as_deref().unwrap_or("N/A")),
        format!(
            "Category: {}",
            endpoint.category.map_or_else(|| "Unknown".to_string(), category_name)
        ),
        format!(
            "Type: {}",
            endpoint.visualization_type.as_deref().unwrap_or("Unknown")
        ),
        format!("Parameters: {}", endpoint.parameters.len()),
    ];

    let names: Vec<&str> = endpoint
        .parameters
        .iter()
        .filter_map(|p| p.name.as_deref())
        .collect();
    if !names.is_empty() {
        parts.push(format!("Available parameters: {}", names.join(", ")));
    }

    let mut capabilities = Vec::new();
    if endpoint.has_control_params() {
        capabilities.push("controllable");
    }
    if endpoint.has_measurement_params() {
        capabilities.push("has measurements");
    }
    if endpoint.has_enumeration_params() {
        capabilities.push("has enumerations");
    }
    if !capabilities.is_empty() {
        parts.push(format!("Capabilities: {}", capabilities.join(", ")));
    }

    parts.join(" | ")
}
