use crate::{
    error::InternalError,
    graph::{ChunkGraph, ChunkKey, ChunkMeta, ChunkNode, ChunkOp, fingerprint},
    groupby::ChunkRef,
};
use std::collections::HashMap;

///
/// GraphBuilder
///
/// Append-only graph under construction. Nodes must be added after their
/// inputs, so insertion order is a topological order. Adding a node whose
/// key already exists is a no-op returning the existing key.
///

#[derive(Clone, Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<ChunkNode>,
    positions: HashMap<ChunkKey, usize>,
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an input chunk under its own key.
    pub fn add_source(&mut self, chunk: &ChunkRef) -> ChunkKey {
        let meta = ChunkMeta::at(chunk.position).with_rows(chunk.rows);
        self.insert(chunk.key.clone(), ChunkOp::Source, Vec::new(), meta);

        chunk.key.clone()
    }

    /// Add a planned node keyed by its content fingerprint.
    pub fn add(
        &mut self,
        op: ChunkOp,
        inputs: Vec<ChunkKey>,
        meta: ChunkMeta,
    ) -> Result<ChunkKey, InternalError> {
        if let Some(missing) = inputs.iter().find(|input| !self.contains(input)) {
            return Err(InternalError::planner_invariant(format!(
                "{} node reads chunk '{missing}' before it is planned",
                op.stage_label(),
            )));
        }

        let key = fingerprint::chunk_key(&op, &inputs, meta.position);
        self.insert(key.clone(), op, inputs, meta);

        Ok(key)
    }

    #[must_use]
    pub fn contains(&self, key: &ChunkKey) -> bool {
        self.positions.contains_key(key)
    }

    #[must_use]
    pub fn node(&self, key: &ChunkKey) -> Option<&ChunkNode> {
        self.positions.get(key).map(|&pos| &self.nodes[pos])
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Graph of everything planned so far, ending at `results`.
    pub fn snapshot(&self, results: Vec<ChunkKey>) -> Result<ChunkGraph, InternalError> {
        self.clone().finish(results)
    }

    pub fn finish(self, results: Vec<ChunkKey>) -> Result<ChunkGraph, InternalError> {
        if let Some(missing) = results.iter().find(|key| !self.contains(key)) {
            return Err(InternalError::planner_invariant(format!(
                "result chunk '{missing}' is not part of the graph",
            )));
        }

        Ok(ChunkGraph {
            nodes: self.nodes,
            positions: self.positions,
            results,
        })
    }

    fn insert(&mut self, key: ChunkKey, op: ChunkOp, inputs: Vec<ChunkKey>, meta: ChunkMeta) {
        if self.positions.contains_key(&key) {
            return;
        }

        self.positions.insert(key.clone(), self.nodes.len());
        self.nodes.push(ChunkNode {
            key,
            op,
            inputs,
            meta,
        });
    }
}
