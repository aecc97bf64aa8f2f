// Hierarchical splitter
// Breaks an oversized chunk into a compact parent header plus one child per
// array element, keeping every child linked to its parent through a session
// id and a 0 / 0.1 / 0.2 address scheme. Falls back to property splitting,
// then truncation; an error never escapes this module.


use anyhow::{Context, Result};
use serde_json::{Map, Value, json};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::chunk::{
    Chunk, ChunkMetadata, ChunkType, FloorLocation, SequenceInfo,
};

/// Recursion guard: no split goes deeper than this.
pub const MAX_SPLIT_DEPTH: u8 = 5;

/// Top-level arrays eligible for element-wise splitting, in priority order.
const ARRAY_FIELDS: &[&str] = &["area", "partitions", "endpoints", "devices", "parameters"];

/// Properties used by the fallback split when no array qualifies.
const PROPERTY_FIELDS: &[&str] = &["area", "endpoints", "metadata", "configurations"];

/// Split one oversized chunk. Always returns at least one chunk; any chunk
/// that still exceeds `max_size` carries a warning marker.
#[inline]
pub fn split_chunk(chunk: &Chunk, max_size: usize, depth: u8) -> Vec<Chunk> {
    let mut chunks = if depth > MAX_SPLIT_DEPTH {
        warn!("max split depth reached for {:?}, truncating", chunk.metadata.name);
        let mut metadata = chunk.metadata.clone();
        metadata.warning = Some("Max depth reached - truncated".to_string());
        metadata.error = Some("Structural splitting failed".to_string());
        vec![Chunk {
            content: truncate_content(&chunk.content, max_size),
            metadata,
        }]
    } else {
        match try_split(chunk, max_size, depth) {
            Ok(chunks) => chunks,
            Err(e) => {
                error!("splitting failed for {:?}: {e:#}", chunk.metadata.name);
                let mut metadata = chunk.metadata.clone();
                metadata.error = Some(format!("Splitting error: {e}"));
                vec![Chunk {
                    content: truncate_content(&chunk.content, max_size),
                    metadata,
                }]
            }
        }
    };

    // Nothing oversized leaves this function unmarked
    for produced in &mut chunks {
        if produced.size() > max_size && produced.metadata.warning.is_none() {
            produced.metadata.warning =
                Some("chunk exceeds size limit after split".to_string());
        }
    }

    chunks
}

fn try_split(chunk: &Chunk, max_size: usize, depth: u8) -> Result<Vec<Chunk>> {
    let value = chunk
        .parse_content()
        .context("chunk content is not valid JSON")?;

    let critical = critical_metadata(&chunk.metadata);

    // Summary payloads have a fixed two-field shape, split deterministically
    if critical.chunk_type == ChunkType::Summary
        && (value.get("endpoint").is_some() || value.get("parametersStats").is_some())
    {
        return Ok(split_summary(&value, max_size, &critical, depth));
    }

    // Element data may sit under a wrapper object
    let target = value
        .get("parameterData")
        .filter(|v| v.is_object())
        .or_else(|| value.get("data").filter(|v| v.is_object()))
        .unwrap_or(&value);

    let Some((field, items)) = first_array_field(target) else {
        debug!("no splittable array found, attempting property-based split");
        return Ok(split_by_properties(&value, max_size, &critical));
    };

    let session_id = format!("split-{}", short_id());
    let total_chunks = 1 + items.len() as u32;

    let mut chunks = vec![parent_chunk(&critical, &session_id, total_chunks)];
    let mut chunk_index: u32 = 1;

    for (index, item) in items.iter().enumerate() {
        let metadata = child_metadata(
            &critical,
            &session_id,
            chunk_index,
            total_chunks,
            field,
            index,
            item,
        );
        let payload = json!({
            "type": "parameter",
            "seqInfo": {
                "sessionId": &session_id,
                "chunkId": chunk_index,
                "parentChunkId": 0,
                "parameterIndex": index,
            },
            "parameterData": item,
        });
        let child = Chunk::new(&payload, metadata);

        if child.size() <= max_size {
            chunks.push(child);
        } else {
            debug!("recursing into oversized {field} item {index}");
            chunks.extend(split_chunk(&child, max_size, depth + 1));
        }
        chunk_index += 1;
    }

    debug!(
        "split {:?} into {} chunks over field {field}",
        critical.name,
        chunks.len()
    );
    Ok(chunks)
}

/// First non-empty top-level array among the priority fields.
fn first_array_field(target: &Value) -> Option<(&'static str, &Vec<Value>)> {
    ARRAY_FIELDS.iter().find_map(|field| {
        target
            .get(field)
            .and_then(Value::as_array)
            .filter(|items| !items.is_empty())
            .map(|items| (*field, items))
    })
}

/// Clone the metadata that must survive the split, normalizing the floor
/// classification from the raw flags when it was never resolved.
fn critical_metadata(metadata: &ChunkMetadata) -> ChunkMetadata {
    let mut critical = metadata.clone();
    if critical.floor_location == FloorLocation::Unknown {
        critical.floor_location =
            FloorLocation::from_flags(critical.is_first_floor, critical.is_second_floor);
    }
    critical
        .extra
        .insert("splitAttempted".to_string(), json!(true));
    critical
}

fn parent_chunk(critical: &ChunkMetadata, session_id: &str, total_chunks: u32) -> Chunk {
    let payload = json!({
        "type": "parent",
        "seqHeader": {
            "sessionId": session_id,
            "chunkId": 0,
            "totalChunks": total_chunks,
            "message": format!(
                "This device has {} parameter chunks. Refer to chunks 1-{} for details.",
                total_chunks - 1,
                total_chunks - 1
            ),
            "chunkType": critical.chunk_type.to_string(),
        },
        "deviceInfo": {
            "name": &critical.name,
            "uuid": &critical.uuid,
            "category": critical.category,
        },
    });

    let mut metadata = critical.clone();
    metadata.sequence = Some(SequenceInfo {
        session_id: session_id.to_string(),
        chunk_id: 0,
        total_chunks,
        is_parent: true,
    });
    metadata.chunk_address = Some("0".to_string());

    Chunk::new(&payload, metadata)
}

fn child_metadata(
    critical: &ChunkMetadata,
    session_id: &str,
    chunk_index: u32,
    total_chunks: u32,
    field: &str,
    index: usize,
    item: &Value,
) -> ChunkMetadata {
    let item_uuid = item
        .get("uuid")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| item.get("id").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("{field}-{index}"));
    let item_name = item
        .get("name")
        .and_then(Value::as_str)
        .map_or_else(|| format!("{field} {}", index + 1), str::to_string);

    let mut metadata = critical.clone();
    metadata.sequence = Some(SequenceInfo {
        session_id: session_id.to_string(),
        chunk_id: chunk_index,
        total_chunks,
        is_parent: false,
    });
    metadata.chunk_address = Some(format!("0.{}", index + 1));
    metadata.parent_chunk_address = Some("0".to_string());
    metadata.source_array = Some(field.to_string());
    metadata.array_index = Some(index as u32);
    metadata.parent_uuid = critical.uuid.clone();
    metadata.parent_name = critical.name.clone();
    metadata.uuid = Some(item_uuid.clone());
    metadata.name = Some(item_name);
    metadata.parameter_name = item.get("name").and_then(Value::as_str).map(str::to_string);
    metadata.extra.insert("isSubChunk".to_string(), json!(true));
    metadata.extra.insert(
        "uniqueChunkId".to_string(),
        json!(format!(
            "{}-params-{index}-{field}",
            critical.uuid.as_deref().unwrap_or("unknown")
        )),
    );

    metadata
}

/// Fallback: one `partial` chunk per named top-level property.
fn split_by_properties(value: &Value, max_size: usize, critical: &ChunkMetadata) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for property in PROPERTY_FIELDS {
        let Some(prop_value) = value.get(property) else {
            continue;
        };
        if !prop_value.is_object() && !prop_value.is_array() {
            continue;
        }

        let mut payload = Map::new();
        payload.insert("type".to_string(), json!(property));
        payload.insert((*property).to_string(), prop_value.clone());
        let serialized = Value::Object(payload).to_string();
        if serialized.len() <= max_size {
            let mut metadata = critical.clone();
            metadata.chunk_type = ChunkType::Partial;
            metadata.split_property = Some((*property).to_string());
            chunks.push(Chunk {
                content: serialized,
                metadata,
            });
        }
    }

    if !chunks.is_empty() {
        debug!("property-based split produced {} chunks", chunks.len());
        return chunks;
    }

    // Terminal fallback: truncation always succeeds
    let serialized = value.to_string();
    let mut metadata = critical.clone();
    metadata.warning = Some("Fallback truncation".to_string());
    metadata
        .extra
        .insert("originalSize".to_string(), json!(serialized.len()));
    vec![Chunk {
        content: truncate_content(&serialized, max_size),
        metadata,
    }]
}

/// Deterministic three-part split for summary payloads: parent header,
/// endpoint overview, parameter statistics.
fn split_summary(
    value: &Value,
    max_size: usize,
    critical: &ChunkMetadata,
    depth: u8,
) -> Vec<Chunk> {
    let session_id = format!("summary-split-{}", short_id());
    let total_chunks = 3;

    let parent_payload = json!({
        "type": "parent",
        "seqHeader": {
            "sessionId": &session_id,
            "chunkId": 0,
            "totalChunks": total_chunks,
            "chunkType": "summary",
        },
        "summaryInfo": {
            "name": &critical.name,
            "uuid": &critical.uuid,
            "category": critical.category,
            "visualizationType": &critical.visualization_type,
        },
    });
    let mut parent_metadata = critical.clone();
    parent_metadata.sequence = Some(SequenceInfo {
        session_id: session_id.clone(),
        chunk_id: 0,
        total_chunks,
        is_parent: true,
    });
    parent_metadata.chunk_address = Some("0".to_string());

    let mut chunks = vec![Chunk::new(&parent_payload, parent_metadata)];
    let mut chunk_index = 1;

    if let Some(endpoint) = value.get("endpoint") {
        let payload = json!({
            "type": "summary-endpoint",
            "endpoint": endpoint,
            "searchableText": value.get("searchableText"),
        });
        let sub = summary_sub_chunk(
            &payload,
            critical,
            &session_id,
            chunk_index,
            total_chunks,
            "endpoint-overview",
            "Endpoint overview",
        );
        if sub.size() <= max_size {
            chunks.push(sub);
        } else {
            chunks.extend(split_chunk(&sub, max_size, depth + 1));
        }
        chunk_index += 1;
    }

    if let Some(stats) = value.get("parametersStats") {
        let payload = json!({
            "type": "summary-stats",
            "parametersStats": stats,
            "endpointUuid": value.pointer("/endpoint/uuid"),
        });
        let sub = summary_sub_chunk(
            &payload,
            critical,
            &session_id,
            chunk_index,
            total_chunks,
            "parameters-stats",
            "Parameters statistics",
        );
        if sub.size() <= max_size {
            chunks.push(sub);
        } else {
            chunks.extend(split_by_properties(&payload, max_size, &sub.metadata));
        }
    }

    debug!("summary chunk split into {} hierarchical chunks", chunks.len());
    chunks
}

fn summary_sub_chunk(
    payload: &Value,
    critical: &ChunkMetadata,
    session_id: &str,
    chunk_id: u32,
    total_chunks: u32,
    sub_type: &str,
    label: &str,
) -> Chunk {
    let base_uuid = critical.uuid.as_deref().unwrap_or("unknown");
    let base_name = critical.name.as_deref().unwrap_or("Unnamed Device");

    let mut metadata = critical.clone();
    metadata.sequence = Some(SequenceInfo {
        session_id: session_id.to_string(),
        chunk_id,
        total_chunks,
        is_parent: false,
    });
    metadata.chunk_address = Some(format!("0.{chunk_id}"));
    metadata.parent_chunk_address = Some("0".to_string());
    metadata.parent_uuid = critical.uuid.clone();
    metadata.parent_name = critical.name.clone();
    metadata.uuid = Some(format!("{base_uuid}-{sub_type}"));
    metadata.name = Some(format!("{base_name} - {label}"));
    metadata.array_index = Some(chunk_id - 1);
    metadata.parameter_name = Some(label.to_string());
    metadata.extra.insert("isSubChunk".to_string(), json!(true));
    metadata
        .extra
        .insert("subChunkType".to_string(), json!(sub_type));

    Chunk::new(payload, metadata)
}

/// Truncate serialized content to the size limit, never mid-character.
fn truncate_content(content: &str, max_size: usize) -> String {
    if content.len() <= max_size {
        return content.to_string();
    }
    let mut truncated = String::with_capacity(max_size);
    for ch in content.chars() {
        if truncated.len() + ch.len_utf8() > max_size {
            break;
        }
        truncated.push(ch);
    }
    truncated
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string().chars().take(12).collect()
}
