// Chunk model
// A chunk is one unit of retrievable content: a JSON payload plus a typed
// metadata record. Metadata keeps a fixed set of well-known fields and an
// open extension map instead of a fully untyped bag.

pub mod builder;
pub mod postprocess;
pub mod splitter;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a chunk's payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Summary,
    Detail,
    Area,
    Fallback,
    Partial,
}

impl fmt::Display for ChunkType {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChunkType::Summary => "summary",
            ChunkType::Detail => "detail",
            ChunkType::Area => "area",
            ChunkType::Fallback => "fallback",
            ChunkType::Partial => "partial",
        };
        f.write_str(name)
    }
}

/// Coarse vertical placement derived from partition/area name heuristics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FloorLocation {
    First,
    Second,
    Both,
    #[default]
    Unknown,
}

impl FloorLocation {
    /// Combine the raw per-floor flags into a single classification.
    #[inline]
    pub fn from_flags(is_first: bool, is_second: bool) -> Self {
        match (is_first, is_second) {
            (true, true) => FloorLocation::Both,
            (true, false) => FloorLocation::First,
            (false, true) => FloorLocation::Second,
            (false, false) => FloorLocation::Unknown,
        }
    }
}

impl fmt::Display for FloorLocation {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FloorLocation::First => "first",
            FloorLocation::Second => "second",
            FloorLocation::Both => "both",
            FloorLocation::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Correlation data linking a parent chunk to the chunks split from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceInfo {
    pub session_id: String,
    /// 0 for the parent, the child ordinal (1-based) otherwise.
    pub chunk_id: u32,
    pub total_chunks: u32,
    pub is_parent: bool,
}

/// Per-chunk attribute record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkMetadata {
    pub source: String,
    pub is_valid: bool,
    pub chunk_type: ChunkType,

    // Device identity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visualization_type: Option<String>,

    // Location
    pub floor_location: FloorLocation,
    pub is_first_floor: bool,
    pub is_second_floor: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub partition_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_uuid: Option<String>,

    // Parameter capabilities
    pub parameters_count: u32,
    pub has_control_params: bool,
    pub has_measurement_params: bool,
    pub has_enumeration_params: bool,
    pub has_config_params: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameter_units: Vec<String>,

    // Hierarchy, present only on split output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<SequenceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_chunk_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_array: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_property: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_name: Option<String>,

    // Degradation markers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Open extension map for fields with no dedicated slot.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for ChunkMetadata {
    #[inline]
    fn default() -> Self {
        Self {
            source: String::new(),
            is_valid: true,
            chunk_type: ChunkType::Summary,
            uuid: None,
            name: None,
            category: None,
            category_name: None,
            device_type: None,
            visualization_type: None,
            floor_location: FloorLocation::Unknown,
            is_first_floor: false,
            is_second_floor: false,
            partition_names: Vec::new(),
            area_name: None,
            area_uuid: None,
            parameters_count: 0,
            has_control_params: false,
            has_measurement_params: false,
            has_enumeration_params: false,
            has_config_params: false,
            parameter_units: Vec::new(),
            sequence: None,
            chunk_address: None,
            parent_chunk_address: None,
            parent_uuid: None,
            parent_name: None,
            source_array: None,
            array_index: None,
            split_property: None,
            parameter_name: None,
            warning: None,
            error: None,
            extra: BTreeMap::new(),
        }
    }
}

impl ChunkMetadata {
    /// Whether this chunk was produced by splitting (parent or child).
    #[inline]
    pub fn is_split_chunk(&self) -> bool {
        self.sequence.is_some()
    }

    #[inline]
    pub fn is_split_parent(&self) -> bool {
        self.sequence.as_ref().is_some_and(|seq| seq.is_parent)
    }

    #[inline]
    pub fn is_split_child(&self) -> bool {
        self.sequence
            .as_ref()
            .is_some_and(|seq| !seq.is_parent && seq.chunk_id > 0)
    }

    /// Key used to group a chunk into its owning device family.
    #[inline]
    pub fn device_key(&self) -> Option<&str> {
        self.parent_uuid.as_deref().or(self.uuid.as_deref())
    }
}

/// One unit of retrievable content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// JSON serialization of the chunk payload. Deserializes to an object
    /// matching `metadata.chunk_type`.
    pub content: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    #[inline]
    pub fn new(payload: &Value, metadata: ChunkMetadata) -> Self {
        Self {
            content: payload.to_string(),
            metadata,
        }
    }

    /// Parse the payload back into structured form.
    #[inline]
    pub fn parse_content(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.content)
    }

    /// Serialized payload size in bytes, the quantity the splitter bounds.
    #[inline]
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Merge metadata produced by a transformation over the chunk it came from.
///
/// Precedence, in one place instead of scattered spreads: the produced
/// metadata is the base, but the original's critical fields (floor flags and
/// classification, partition names, area identity, visualization type,
/// category, chunk type) always win, so a transformation can never drop the
/// location/device-identity information retrieval depends on. Extension maps
/// are layered, original first, never removing keys.
#[inline]
pub fn merge_critical_metadata(original: &ChunkMetadata, produced: ChunkMetadata) -> ChunkMetadata {
    let mut merged = produced;

    merged.floor_location = original.floor_location;
    merged.is_first_floor = original.is_first_floor;
    merged.is_second_floor = original.is_second_floor;
    merged.partition_names = original.partition_names.clone();
    merged.area_name = original.area_name.clone();
    merged.area_uuid = original.area_uuid.clone();
    merged.visualization_type = original.visualization_type.clone();
    merged.category = original.category;
    merged.chunk_type = original.chunk_type;

    let mut extra = original.extra.clone();
    extra.extend(merged.extra);
    merged.extra = extra;

    merged
}
