// Adaptive retrieval filter
// Narrows the similarity-search candidates down to the chunks worth placing
// in the context window. A device-vocabulary pre-filter runs first, then one
// strategy picked by fixed priority: location, automation, generic,
// specific. A pure predicate pass: survivors keep their input order.


use tracing::debug;

use crate::chunk::{Chunk, ChunkMetadata, ChunkType, FloorLocation};
use crate::query::intent::QueryAnalysis;

/// Filter retrieved candidate chunks according to the query analysis.
#[inline]
pub fn filter_documents(analysis: &QueryAnalysis, docs: Vec<Chunk>) -> Vec<Chunk> {
    let candidate_count = docs.len();

    let mut results: Vec<Chunk> = docs
        .into_iter()
        .filter(|doc| matches_device_filter(analysis, &doc.metadata))
        .collect();
    debug!(
        "device pre-filter kept {}/{candidate_count} candidates",
        results.len()
    );

    if analysis.is_first_floor_query || analysis.is_second_floor_query {
        let target = analysis.target_floor.unwrap_or(FloorLocation::First);
        debug!("location strategy, target floor {target}");
        results.retain(|doc| location_predicate(&doc.metadata, target));
    } else if analysis.is_automation_query {
        debug!("automation strategy, control-capable detail chunks only");
        results.retain(|doc| {
            doc.metadata.chunk_type == ChunkType::Detail
                && (doc.metadata.has_control_params || doc.metadata.parameters_count > 0)
        });
    } else if analysis.is_generic_query {
        debug!("generic strategy, summary chunks only");
        results.retain(|doc| doc.metadata.chunk_type == ChunkType::Summary);
    } else if analysis.is_specific_query {
        debug!("specific strategy, detail and summary chunks");
        results.retain(|doc| {
            matches!(
                doc.metadata.chunk_type,
                ChunkType::Detail | ChunkType::Summary
            )
        });
    } else {
        debug!("no dominant strategy, keeping pre-filtered candidates");
    }

    debug!("filter kept {}/{candidate_count} documents", results.len());
    results
}

/// Membership test against the detected device vocabulary: a document
/// survives when its category/visualization type is absent, or is one of
/// the matched values.
fn matches_device_filter(analysis: &QueryAnalysis, metadata: &ChunkMetadata) -> bool {
    let visualization_ok = analysis.matched_visualization_types.is_empty()
        || metadata
            .visualization_type
            .as_deref()
            .is_none_or(|viz| analysis.matched_visualization_types.iter().any(|m| m == viz));

    let category_ok = analysis.matched_categories.is_empty()
        || metadata
            .category
            .is_none_or(|category| analysis.matched_categories.contains(&category));

    visualization_ok && category_ok
}

/// Location strategy: floor-specific detail chunks only. Chunks seen on
/// both floors are ambiguous/global and excluded.
fn location_predicate(metadata: &ChunkMetadata, target: FloorLocation) -> bool {
    if metadata.chunk_type != ChunkType::Detail {
        return false;
    }

    if metadata.is_first_floor && metadata.is_second_floor {
        debug!("skipping multi-floor document {:?}", metadata.name);
        return false;
    }

    if metadata.floor_location == target {
        return true;
    }

    // Flag fallback when the classification was never resolved
    if metadata.floor_location == FloorLocation::Unknown {
        return match target {
            FloorLocation::First => metadata.is_first_floor,
            FloorLocation::Second => metadata.is_second_floor,
            FloorLocation::Both | FloorLocation::Unknown => false,
        };
    }

    false
}
