// Document loading
// Fail-fast validation at the load boundary: unreadable files and malformed
// JSON abort the run, while a document with no endpoints degrades to a
// single fallback chunk so the pipeline can still answer.


use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::Utc;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunk::{Chunk, ChunkMetadata, ChunkType};
use crate::model::{Installation, PartitionRef};
use crate::{QaError, Result};

/// Global partition map: partition UUID to display name. Built once per
/// document, consulted read-only by every downstream component.
#[derive(Debug, Clone, Default)]
pub struct PartitionMap {
    map: BTreeMap<String, String>,
}

impl PartitionMap {
    #[inline]
    pub fn get(&self, uuid: &str) -> Option<&str> {
        self.map.get(uuid).map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Resolve a list of partition UUIDs to the display names that exist.
    #[inline]
    pub fn resolve_names(&self, uuids: &[String]) -> Vec<String> {
        uuids
            .iter()
            .filter_map(|uuid| self.get(uuid).map(str::to_string))
            .collect()
    }
}

/// Outcome of loading an installation document.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Loaded {
        installation: Installation,
        partition_map: PartitionMap,
    },
    /// The document parsed but contains no endpoints: a single degraded
    /// chunk stands in for the whole installation.
    Fallback(Chunk),
}

/// Load and validate the installation-config document at `path`.
#[inline]
pub fn load_installation(path: &Path) -> Result<LoadOutcome> {
    let raw = fs::read_to_string(path).map_err(|e| {
        QaError::Document(format!(
            "installation config not readable at {}: {e}",
            path.display()
        ))
    })?;

    if raw.trim().is_empty() {
        return Err(QaError::Document(format!(
            "installation config at {} is empty",
            path.display()
        )));
    }

    let value: Value = serde_json::from_str(&raw)
        .map_err(|e| QaError::Document(format!("invalid JSON in installation config: {e}")))?;

    if !value.is_object() {
        return Err(QaError::Document(
            "invalid installation config: root must be an object".to_string(),
        ));
    }

    let installation: Installation = serde_json::from_value(value)
        .map_err(|e| QaError::Document(format!("installation config has unexpected shape: {e}")))?;

    let source = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

    if installation.endpoints.is_empty() {
        warn!("no endpoints found in {}, degrading to fallback chunk", source);
        return Ok(LoadOutcome::Fallback(fallback_chunk(
            &source,
            "No valid endpoints in configuration",
        )));
    }

    let partition_map = build_partition_map(&installation);
    info!(
        "loaded {}: {} endpoints, {} areas, {} partitions",
        source,
        installation.endpoints.len(),
        installation.areas.len(),
        partition_map.len()
    );

    Ok(LoadOutcome::Loaded {
        installation,
        partition_map,
    })
}

/// Build the global partition map. Partitions declared as objects inside
/// areas are authoritative; bare UUID references get a deduced name so every
/// partition UUID seen anywhere in the document resolves to something.
#[inline]
pub fn build_partition_map(installation: &Installation) -> PartitionMap {
    let mut map = BTreeMap::new();

    for area in &installation.areas {
        for partition in &area.partitions {
            match partition {
                PartitionRef::Entry { uuid, name, .. } => {
                    let name = name
                        .clone()
                        .unwrap_or_else(|| deduced_partition_name(uuid, area.name.as_deref()));
                    map.insert(uuid.clone(), name);
                }
                PartitionRef::Uuid(uuid) => {
                    map.entry(uuid.clone())
                        .or_insert_with(|| deduced_partition_name(uuid, area.name.as_deref()));
                }
            }
        }
    }

    // Endpoints can reference partitions no area declares
    for endpoint in &installation.endpoints {
        for uuid in &endpoint.partitions {
            if !map.contains_key(uuid) {
                let name = deduced_partition_name(uuid, None);
                debug!("partition {} only referenced by endpoints, deduced name {}", uuid, name);
                map.insert(uuid.clone(), name);
            }
        }
    }

    PartitionMap { map }
}

fn deduced_partition_name(uuid: &str, area_name: Option<&str>) -> String {
    area_name.map_or_else(
        || format!("Partition_{}", uuid.chars().take(8).collect::<String>()),
        |area| format!("{area}_Partition"),
    )
}

/// Build the single degraded chunk that stands in for an unusable document.
#[inline]
pub fn fallback_chunk(source: &str, message: &str) -> Chunk {
    let payload = json!({
        "error": "Failed to load document",
        "message": message,
        "fallbackType": "empty_system",
    });

    let mut metadata = ChunkMetadata {
        source: source.to_string(),
        is_valid: false,
        chunk_type: ChunkType::Fallback,
        uuid: Some(format!(
            "fallback-{}",
            Uuid::new_v4().simple().to_string().chars().take(8).collect::<String>()
        )),
        name: Some("Fallback Document".to_string()),
        category: Some(-1),
        visualization_type: Some("N/A".to_string()),
        device_type: Some("other".to_string()),
        ..ChunkMetadata::default()
    };
    metadata
        .extra
        .insert("timestamp".to_string(), json!(Utc::now().to_rfc3339()));

    Chunk::new(&payload, metadata)
}
