// Chunk post-processing
// Drives the splitter over every oversized chunk, re-merges the critical
// metadata the split must not lose, groups the result into device families
// and validates parent/child integrity.

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::chunk::splitter::split_chunk;
use crate::chunk::{Chunk, merge_critical_metadata};

/// Output of the post-processing pass.
#[derive(Debug, Default)]
pub struct ProcessedChunks {
    pub chunks: Vec<Chunk>,
    /// Owning-device key (parent uuid, else own uuid) to the indices of all
    /// chunks belonging to that device.
    pub device_families: BTreeMap<String, Vec<usize>>,
}

impl ProcessedChunks {
    /// All chunks of one device family.
    #[inline]
    pub fn family(&self, device_key: &str) -> Vec<&Chunk> {
        self.device_families
            .get(device_key)
            .map(|indices| indices.iter().map(|&i| &self.chunks[i]).collect())
            .unwrap_or_default()
    }
}

/// Split every chunk above `max_size` and reattach the metadata retrieval
/// depends on.
#[inline]
pub fn process_chunks(chunks: Vec<Chunk>, max_size: usize) -> ProcessedChunks {
    let original_count = chunks.len();
    let mut chunks_split = 0usize;
    let mut final_chunks = Vec::with_capacity(chunks.len());

    for chunk in chunks {
        if chunk.size() <= max_size {
            final_chunks.push(chunk);
            continue;
        }

        debug!(
            "chunk {:?} oversized ({} > {max_size}), applying secondary splitting",
            chunk.metadata.name,
            chunk.size()
        );
        chunks_split += 1;

        let produced = split_chunk(&chunk, max_size, 0);
        for piece in produced {
            // Splitting never silently drops location/device identity
            let metadata = merge_critical_metadata(&chunk.metadata, piece.metadata);
            final_chunks.push(Chunk {
                content: piece.content,
                metadata,
            });
        }
    }

    validate_sessions(&final_chunks);

    let mut device_families: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, chunk) in final_chunks.iter().enumerate() {
        if let Some(key) = chunk.metadata.device_key() {
            device_families.entry(key.to_string()).or_default().push(index);
        } else {
            warn!("chunk {index} has no device key, left out of families");
        }
    }

    let mut type_counts: BTreeMap<String, usize> = BTreeMap::new();
    for chunk in &final_chunks {
        *type_counts
            .entry(chunk.metadata.chunk_type.to_string())
            .or_default() += 1;
    }
    info!(
        "chunk processing: {original_count} chunks in, {} out, {chunks_split} split, {} device families, types {:?}",
        final_chunks.len(),
        device_families.len(),
        type_counts
    );

    ProcessedChunks {
        chunks: final_chunks,
        device_families,
    }
}

/// Every child chunk must resolve to a parent within its session. Orphans
/// are logged, never dropped.
fn validate_sessions(chunks: &[Chunk]) {
    let mut sessions: BTreeMap<&str, (usize, Vec<&Chunk>)> = BTreeMap::new();

    for chunk in chunks {
        let Some(seq) = chunk.metadata.sequence.as_ref() else {
            continue;
        };
        let entry = sessions.entry(seq.session_id.as_str()).or_default();
        if seq.is_parent {
            entry.0 += 1;
        } else {
            entry.1.push(chunk);
        }
    }

    for (session_id, (parent_count, children)) in &sessions {
        if *parent_count == 0 {
            for child in children {
                warn!(
                    "orphaned child {:?} ({:?}) in session {session_id}",
                    child.metadata.name, child.metadata.chunk_address
                );
            }
        } else if *parent_count > 1 {
            warn!("session {session_id} has {parent_count} parent chunks");
        }
    }
}
