// Context formatting
// Renders the final filtered chunks into the grouped, human-readable text
// block handed to the language model: summary overviews, detailed devices
// with numbered parameters, split devices reassembled by session, and a
// trailing statistics block. Degrades per chunk, never fails as a whole.


use std::collections::BTreeSet;

use serde_json::Value;
use tracing::warn;

use crate::chunk::{Chunk, ChunkType, FloorLocation};
use crate::model::category_name;

const SECTION_RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Assemble the prompt context from the filtered chunks.
#[inline]
pub fn format_context(docs: &[Chunk], query: &str) -> String {
    if docs.is_empty() {
        warn!("no documents available for context preparation");
        return "No relevant information found for the query.".to_string();
    }

    let summary_chunks: Vec<&Chunk> = docs
        .iter()
        .filter(|d| d.metadata.chunk_type == ChunkType::Summary)
        .collect();
    let detail_chunks: Vec<&Chunk> = docs
        .iter()
        .filter(|d| d.metadata.chunk_type == ChunkType::Detail)
        .collect();
    let area_chunks: Vec<&Chunk> = docs
        .iter()
        .filter(|d| d.metadata.chunk_type == ChunkType::Area)
        .collect();

    let (sequence_details, standard_details): (Vec<&Chunk>, Vec<&Chunk>) = detail_chunks
        .iter()
        .copied()
        .partition(|d| d.metadata.sequence.is_some());

    let mut parts = vec![
        format!("=== RELEVANT INFORMATION FOR QUERY: \"{query}\" ===\n"),
        format!("Found {} relevant information chunks\n", docs.len()),
    ];

    if !summary_chunks.is_empty() {
        parts.push(format_summary_chunks(&summary_chunks));
    }
    if !standard_details.is_empty() {
        parts.push(format_standard_detail_chunks(&standard_details));
    }
    if !sequence_details.is_empty() {
        parts.push(format_sequence_detail_chunks(&sequence_details));
    }
    parts.push(format_statistics(
        docs,
        summary_chunks.len(),
        standard_details.len(),
        &sequence_details,
        area_chunks.len(),
    ));

    parts.join("\n\n")
}

fn section_header(title: &str) -> Vec<String> {
    vec![
        SECTION_RULE.to_string(),
        format!(" {title}"),
        format!("{SECTION_RULE}\n"),
    ]
}

/// String field from the payload, falling back to chunk metadata.
fn field<'a>(content: &'a Value, pointer: &str, fallback: Option<&'a str>) -> Option<&'a str> {
    content.pointer(pointer).and_then(Value::as_str).or(fallback)
}

fn push_location_lines(parts: &mut Vec<String>, chunk: &Chunk, content: &Value, indent: &str) {
    match chunk.metadata.floor_location {
        FloorLocation::First => parts.push(format!("{indent}Location: First Floor")),
        FloorLocation::Second => parts.push(format!("{indent}Location: Second Floor")),
        FloorLocation::Both => parts.push(format!("{indent}Location: Both floors")),
        FloorLocation::Unknown => {}
    }

    if let Some(names) = content
        .pointer("/endpoint/partitionNames")
        .and_then(Value::as_array)
    {
        let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
        if !names.is_empty() {
            parts.push(format!("{indent}Partitions: {}", names.join(", ")));
        }
    } else if !chunk.metadata.partition_names.is_empty() {
        parts.push(format!(
            "{indent}Partitions: {}",
            chunk.metadata.partition_names.join(", ")
        ));
    }

    if let Some(area) = field(content, "/endpoint/associatedArea/name", None) {
        parts.push(format!("{indent}Area: {area}"));
    }
}

fn format_summary_chunks(chunks: &[&Chunk]) -> String {
    let mut parts = section_header("DEVICE OVERVIEW (Summary Information)");

    for (index, chunk) in chunks.iter().enumerate() {
        let Ok(content) = chunk.parse_content() else {
            warn!("error parsing summary chunk {index}");
            parts.push(format!(
                "{}. {} (parsing error)",
                index + 1,
                chunk.metadata.name.as_deref().unwrap_or("Device")
            ));
            parts.push(String::new());
            continue;
        };

        let name = field(&content, "/endpoint/name", chunk.metadata.name.as_deref())
            .unwrap_or("Unnamed Device");
        parts.push(format!("{}. Device: {name}", index + 1));
        if let Some(uuid) = field(&content, "/endpoint/uuid", chunk.metadata.uuid.as_deref()) {
            parts.push(format!("   UUID: {uuid}"));
        }
        if let Some(category) =
            field(&content, "/endpoint/categoryName", chunk.metadata.category_name.as_deref())
        {
            parts.push(format!("   Category: {category}"));
        }
        if let Some(viz) = field(
            &content,
            "/endpoint/visualizationType",
            chunk.metadata.visualization_type.as_deref(),
        ) {
            parts.push(format!("   Type: {viz}"));
        }
        if let Some(device_type) =
            field(&content, "/endpoint/deviceType", chunk.metadata.device_type.as_deref())
        {
            parts.push(format!("   Device Type: {device_type}"));
        }

        push_location_lines(&mut parts, chunk, &content, "   ");

        if let Some(stats) = content.get("parametersStats") {
            if let Some(total) = stats.get("total").and_then(Value::as_u64) {
                parts.push(format!("   Parameters: {total} total"));
            }
            if stats.get("hasControl").and_then(Value::as_bool) == Some(true) {
                parts.push("   - Has control capabilities (can be controlled)".to_string());
            }
            if stats.get("hasMeasurement").and_then(Value::as_bool) == Some(true) {
                parts.push("   - Has measurement capabilities (monitors values)".to_string());
            }
            if stats.get("hasEnumeration").and_then(Value::as_bool) == Some(true) {
                parts.push(
                    "   - Has enumeration parameters (multiple preset values)".to_string(),
                );
            }
            if let Some(names) = stats.get("parameterNames").and_then(Value::as_array) {
                let names: Vec<&str> = names.iter().filter_map(Value::as_str).collect();
                if !names.is_empty() {
                    let shown = names.iter().take(5).copied().collect::<Vec<_>>().join(", ");
                    let rest = names.len().saturating_sub(5);
                    let suffix = if rest > 0 {
                        format!(" and {rest} more")
                    } else {
                        String::new()
                    };
                    parts.push(format!("   Available parameters: {shown}{suffix}"));
                }
            }
            if let Some(units) = stats.get("availableUnits").and_then(Value::as_array) {
                let units: Vec<&str> = units.iter().filter_map(Value::as_str).collect();
                if !units.is_empty() {
                    parts.push(format!("   Measurement units: {}", units.join(", ")));
                }
            }
        }

        parts.push(String::new());
    }

    parts.join("\n")
}

fn format_standard_detail_chunks(chunks: &[&Chunk]) -> String {
    let mut parts = section_header("DETAILED DEVICE INFORMATION");

    for (index, chunk) in chunks.iter().enumerate() {
        let Ok(content) = chunk.parse_content() else {
            warn!("error parsing detail chunk {index}");
            parts.push(format!(
                "{}. {} (parsing error)\n",
                index + 1,
                chunk.metadata.name.as_deref().unwrap_or("Device")
            ));
            continue;
        };

        let name = field(&content, "/endpoint/name", chunk.metadata.name.as_deref())
            .unwrap_or("Unnamed Device");
        parts.push(format!("{}. Device: {name}", index + 1));
        if let Some(uuid) = field(&content, "/endpoint/uuid", chunk.metadata.uuid.as_deref()) {
            parts.push(format!("   UUID: {uuid}"));
        }
        if let Some(category) =
            field(&content, "/endpoint/categoryName", chunk.metadata.category_name.as_deref())
        {
            parts.push(format!("   Category: {category}"));
        }
        if let Some(viz) = field(
            &content,
            "/endpoint/visualizationType",
            chunk.metadata.visualization_type.as_deref(),
        ) {
            parts.push(format!("   Type: {viz}"));
        }

        push_location_lines(&mut parts, chunk, &content, "   ");

        if let Some(parameters) = content.get("parameters").and_then(Value::as_array) {
            if parameters.is_empty() {
                parts.push(
                    "\n   (This device chunk has no parameters array - possibly a parent chunk)"
                        .to_string(),
                );
            } else {
                parts.push(format!("\n    PARAMETERS ({} total):", parameters.len()));
                for (param_index, param) in parameters.iter().enumerate() {
                    push_parameter_lines(&mut parts, param, param_index, "   ");
                }
            }
        } else {
            parts.push(
                "\n   (This device chunk has no parameters array - possibly a parent chunk)"
                    .to_string(),
            );
        }

        parts.push(format!("\n{}\n", "─".repeat(60)));
    }

    parts.join("\n")
}

fn push_parameter_lines(parts: &mut Vec<String>, param: &Value, index: usize, indent: &str) {
    let name = param
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unnamed Parameter");
    parts.push(format!("\n{indent}{}. {name}", index + 1));

    let unit = param.get("unit").and_then(Value::as_str);

    if let Some(value) = param.get("value").filter(|v| !v.is_null()) {
        let mut line = format!("{indent}   Current value: {}", render_scalar(value));
        if let Some(unit) = unit {
            line.push_str(&format!(" {unit}"));
        }
        parts.push(line);
    }

    if let Some(data_type) = param.get("dataType").and_then(Value::as_i64) {
        parts.push(format!(
            "{indent}   Data type: {}",
            data_type_name(data_type)
        ));
    }

    let min = param.get("minVal").filter(|v| has_range_value(v));
    let max = param.get("maxVal").filter(|v| has_range_value(v));
    if min.is_some() || max.is_some() {
        let mut line = format!("{indent}   Range: ");
        if let Some(min) = min {
            line.push_str(&format!("min {}", render_scalar(min)));
        }
        if min.is_some() && max.is_some() {
            line.push_str(" - ");
        }
        if let Some(max) = max {
            line.push_str(&format!("max {}", render_scalar(max)));
        }
        if let Some(unit) = unit {
            line.push_str(&format!(" {unit}"));
        }
        parts.push(line);
    }

    if let Some(operation) = param.pointer("/operation/type").and_then(Value::as_str) {
        let capability = match operation {
            "switch" => "switched on/off",
            "button" => "triggered",
            _ => "controlled",
        };
        parts.push(format!(
            "{indent}   Operation: {operation} (can be {capability})"
        ));
    }

    if let Some(log_type) = param.get("logType").and_then(Value::as_i64) {
        parts.push(format!(
            "{indent}   Logging: {}",
            log_type_description(log_type)
        ));
    }

    if let Some(values) = param.get("enumerationVal").and_then(Value::as_array) {
        if !values.is_empty() {
            let rendered: Vec<String> = values.iter().map(render_scalar).collect();
            parts.push(format!(
                "{indent}   Possible values: {}",
                rendered.join(", ")
            ));
        }
    }

    if let Some(prefix) = param.get("unitPrefix").and_then(Value::as_str) {
        parts.push(format!("{indent}   Unit prefix: {prefix}"));
    }
}

/// A min/max bound counts only when it actually holds a value.
fn has_range_value(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_scalar)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn format_sequence_detail_chunks(chunks: &[&Chunk]) -> String {
    let mut parts = section_header("DEVICES WITH PARAMETERS (Hierarchical Structure)");

    // Group by session id, first-seen order
    let mut sessions: Vec<(String, Vec<&Chunk>)> = Vec::new();
    for chunk in chunks.iter().copied() {
        let Some(seq) = chunk.metadata.sequence.as_ref() else {
            continue;
        };
        if let Some(entry) = sessions.iter_mut().find(|(id, _)| *id == seq.session_id) {
            entry.1.push(chunk);
        } else {
            sessions.push((seq.session_id.clone(), vec![chunk]));
        }
    }

    for (session_id, session_chunks) in &sessions {
        let parent = session_chunks
            .iter()
            .find(|c| c.metadata.is_split_parent());
        let mut children: Vec<&&Chunk> = session_chunks
            .iter()
            .filter(|c| c.metadata.is_split_child())
            .collect();
        children.sort_by_key(|c| {
            c.metadata
                .sequence
                .as_ref()
                .map_or(0, |seq| seq.chunk_id)
        });

        let Some(parent) = parent else {
            warn!(
                "session {session_id} has no parent chunk ({} orphaned children)",
                children.len()
            );
            if !children.is_empty() {
                let parent_name = children[0]
                    .metadata
                    .parent_name
                    .as_deref()
                    .unwrap_or("Unknown");
                parts.push(format!("• Device: {parent_name} (parent chunk missing)"));
                parts.push(format!("  Parameters ({} orphaned):\n", children.len()));
                for (index, child) in children.iter().enumerate() {
                    let label = child
                        .metadata
                        .parameter_name
                        .as_deref()
                        .or(child.metadata.name.as_deref())
                        .unwrap_or("Parameter");
                    parts.push(format!("    {}. {label}", index + 1));
                }
                parts.push(format!("\n{}\n", "─".repeat(60)));
            }
            continue;
        };

        match parent.parse_content() {
            Ok(parent_content) => {
                let name = field(
                    &parent_content,
                    "/deviceInfo/name",
                    parent.metadata.name.as_deref(),
                )
                .unwrap_or("Unnamed Device");
                parts.push(format!("• Device: {name}"));
                let uuid = field(
                    &parent_content,
                    "/deviceInfo/uuid",
                    parent.metadata.uuid.as_deref(),
                )
                .unwrap_or("N/A");
                parts.push(format!("  UUID: {uuid}"));
                if let Some(category) = parent.metadata.category {
                    parts.push(format!("  Category: {}", category_name(category)));
                }
                if let Some(viz) = parent.metadata.visualization_type.as_deref() {
                    parts.push(format!("  Type: {viz}"));
                }

                push_location_lines(&mut parts, parent, &parent_content, "  ");

                if children.is_empty() {
                    parts.push("  (No parameter chunks found for this device)".to_string());
                } else {
                    parts.push(format!("\n  Parameters ({} total):\n", children.len()));
                    for (index, child) in children.iter().enumerate() {
                        match child.parse_content() {
                            Ok(child_content) => {
                                let label = child
                                    .metadata
                                    .parameter_name
                                    .as_deref()
                                    .or_else(|| {
                                        child_content
                                            .pointer("/parameterData/name")
                                            .and_then(Value::as_str)
                                    })
                                    .or(child.metadata.name.as_deref())
                                    .unwrap_or("Parameter");
                                parts.push(format!("    {}. {label}", index + 1));

                                if let Some(param) = child_content.get("parameterData") {
                                    push_child_parameter_lines(&mut parts, param);
                                }
                                parts.push(String::new());
                            }
                            Err(_) => {
                                warn!("error parsing child chunk in session {session_id}");
                                parts.push(format!(
                                    "    {}. {} (parsing error)",
                                    index + 1,
                                    child.metadata.name.as_deref().unwrap_or("Parameter")
                                ));
                            }
                        }
                    }
                }

                parts.push(format!("\n{}\n", "─".repeat(60)));
            }
            Err(_) => {
                warn!("error parsing parent chunk in session {session_id}");
                parts.push(format!(
                    "• {} (parsing error)",
                    parent.metadata.name.as_deref().unwrap_or("Device")
                ));
                parts.push(String::new());
            }
        }
    }

    parts.join("\n")
}

fn push_child_parameter_lines(parts: &mut Vec<String>, param: &Value) {
    let unit = param.get("unit").and_then(Value::as_str);

    if let Some(value) = param.get("value").filter(|v| !v.is_null()) {
        let mut line = format!("       Value: {}", render_scalar(value));
        if let Some(unit) = unit {
            line.push_str(&format!(" {unit}"));
        }
        parts.push(line);
    }

    if let Some(data_type) = param.get("dataType").and_then(Value::as_i64) {
        parts.push(format!("       Data type: {}", data_type_name(data_type)));
    }

    if let Some(operation) = param.pointer("/operation/type").and_then(Value::as_str) {
        parts.push(format!("       Operation: {operation}"));
    }

    let min = param.get("minVal").filter(|v| has_range_value(v));
    let max = param.get("maxVal").filter(|v| has_range_value(v));
    if min.is_some() || max.is_some() {
        let mut line = "       Range: ".to_string();
        if let Some(min) = min {
            line.push_str(&format!("min {}", render_scalar(min)));
        }
        if min.is_some() && max.is_some() {
            line.push_str(" - ");
        }
        if let Some(max) = max {
            line.push_str(&format!("max {}", render_scalar(max)));
        }
        if let Some(unit) = unit {
            line.push_str(&format!(" {unit}"));
        }
        parts.push(line);
    }
}

fn format_statistics(
    all_docs: &[Chunk],
    summary_count: usize,
    standard_detail_count: usize,
    sequence_details: &[&Chunk],
    area_count: usize,
) -> String {
    let mut parts = vec![
        SECTION_RULE.to_string(),
        " CONTEXT STATISTICS".to_string(),
        SECTION_RULE.to_string(),
    ];

    parts.push(format!("Total chunks provided: {}", all_docs.len()));
    parts.push(format!(
        "  • Summary chunks: {summary_count} (overview information)"
    ));
    parts.push(format!(
        "  • Standard detail chunks: {standard_detail_count} (complete device info with parameters)"
    ));
    parts.push(format!(
        "  • Sequence detail chunks: {} (hierarchical parent + children)",
        sequence_details.len()
    ));
    parts.push(format!(
        "  • Area chunks: {area_count} (location information)"
    ));

    let parent_count = sequence_details
        .iter()
        .filter(|c| c.metadata.is_split_parent())
        .count();
    let child_count = sequence_details
        .iter()
        .filter(|c| c.metadata.is_split_child())
        .count();
    if !sequence_details.is_empty() {
        parts.push(format!(
            "    ↳ {parent_count} parent devices, {child_count} parameter chunks"
        ));
    }

    let unique_devices: BTreeSet<&str> = all_docs
        .iter()
        .filter_map(|d| d.metadata.device_key())
        .collect();
    parts.push(format!(
        "\nUnique devices in context: {}",
        unique_devices.len()
    ));

    parts.join("\n")
}

/// Human name for a parameter data type code.
fn data_type_name(code: i64) -> &'static str {
    match code {
        0 => "number",
        1 => "decimal",
        2 => "boolean",
        3 => "string",
        4 => "enumeration",
        5 => "integer",
        _ => "unknown",
    }
}

/// Human description for a parameter log type code.
fn log_type_description(code: i64) -> String {
    match code {
        0 => "configuration parameter (not logged)".to_string(),
        1 => "logged on change".to_string(),
        2 => "logged periodically".to_string(),
        3 => "measurement (continuous logging)".to_string(),
        4 => "event-based logging".to_string(),
        other => format!("log type {other}"),
    }
}
