//! Graph assembler.
//!
//! The single point where node and edge streams meet. Edges are deduplicated
//! on `(from_id, to_id, reason)`, dangling edges are dropped, and the
//! remaining edges are sorted so serialization is deterministic.

use crate::error::IngestError;
use crate::graph::{Edge, Graph, Node};
use std::collections::{BTreeMap, BTreeSet};

/// Build the immutable graph from normalized nodes and resolver output.
///
/// A duplicate node id here means the normalizer let a collision through and
/// is reported as [`IngestError::Assembly`].
pub fn assemble(
    nodes: impl IntoIterator<Item = Node>,
    edges: impl IntoIterator<Item = Edge>,
) -> Result<Graph, IngestError> {
    let mut arena: BTreeMap<String, Node> = BTreeMap::new();
    for node in nodes {
        if arena.contains_key(&node.id) {
            return Err(IngestError::Assembly(format!(
                "duplicate node id {} reached the assembler",
                node.id
            )));
        }
        arena.insert(node.id.clone(), node);
    }

    let mut unique: BTreeSet<Edge> = BTreeSet::new();
    let mut dangling = 0usize;
    for edge in edges {
        if !arena.contains_key(&edge.from_id) || !arena.contains_key(&edge.to_id) {
            log::warn!(
                "Dropping dangling {} edge {} -> {}",
                edge.reason,
                edge.from_id,
                edge.to_id
            );
            dangling += 1;
            continue;
        }
        unique.insert(edge);
    }

    log::debug!(
        "Assembled graph with {} nodes, {} edges ({} dangling dropped)",
        arena.len(),
        unique.len(),
        dangling
    );
    Ok(Graph::from_parts(arena, unique.into_iter().collect()))
}
