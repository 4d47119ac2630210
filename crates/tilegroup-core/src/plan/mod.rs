//! Module: plan
//! Responsibility: turn a group-by request into a chunk graph, choosing
//! between tree combine and sample-sort shuffle.
//! Does not own: node execution or the probe runtime.
//! Boundary: synchronous except for the explicit auto probe hand-off.

mod auto;
mod mock;
mod shuffle;
mod tree;


pub use auto::{PendingTiling, ProbeResults};
pub use mock::SchemaInference;

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    graph::{ChunkGraph, ChunkKey, ChunkMeta, ChunkOp, GraphBuilder},
    groupby::{AggregationOperand, ChunkRef, GroupByRequest, OperandParts, OutputSchema},
    reduce::{DefaultReductionCompiler, ReductionCompiler},
    runtime::{ExecutionContext, SizeRecorderHandle},
};
use log::debug;
use std::{path::Path, sync::Arc};
use tilegroup_config::{AggregationConfig, TilingMethod};

///
/// GroupByPlanner
///
/// Plans group-by aggregations under one configuration and one reduction
/// compiler.
///

#[derive(Clone, Debug)]
pub struct GroupByPlanner<C = DefaultReductionCompiler> {
    config: AggregationConfig,
    compiler: C,
}

impl GroupByPlanner {
    #[must_use]
    pub fn new(config: AggregationConfig) -> Self {
        Self::with_compiler(config, DefaultReductionCompiler::default())
    }

    /// Planner configured by the `[groupby]` table of a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, InternalError> {
        Ok(Self::new(AggregationConfig::from_toml_str(source)?))
    }

    /// Planner configured by the `[groupby]` table of a TOML file.
    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self, InternalError> {
        Ok(Self::new(AggregationConfig::from_path(path)?))
    }
}

impl<C: ReductionCompiler> GroupByPlanner<C> {
    #[must_use]
    pub const fn with_compiler(config: AggregationConfig, compiler: C) -> Self {
        Self { config, compiler }
    }

    #[must_use]
    pub const fn config(&self) -> &AggregationConfig {
        &self.config
    }

    #[must_use]
    pub const fn compiler(&self) -> &C {
        &self.compiler
    }

    /// Infer the output schema by running map and agg over a synthetic sample.
    pub fn infer_schema(&self, request: &GroupByRequest) -> Result<SchemaInference, InternalError> {
        mock::infer(request, &self.compiler, &self.config)
    }

    /// Plan `request`. Auto planning over more than `combine_size` chunks
    /// returns the probe stage; execute its graph, collect the results and
    /// call [`Self::finish_plan`].
    pub fn plan(
        &self,
        request: &GroupByRequest,
        ctx: &dyn ExecutionContext,
    ) -> Result<Tiling, InternalError> {
        request.params.validate()?;
        if request.input.chunks.is_empty() {
            return Err(InternalError::planner_invalid(format!(
                "input '{}' has no chunks",
                request.input.id,
            )));
        }

        let inference = self.infer_schema(request)?;
        let staging = Staging::new(request, &inference, &self.config);
        let chunk_count = request.input.chunks.len();

        let plan = match self.config.method() {
            TilingMethod::Tree => {
                debug!("groupby '{}': tree method requested", request.input.id);
                tree::plan(staging)?
            }
            TilingMethod::Shuffle => {
                debug!("groupby '{}': shuffle method requested", request.input.id);
                shuffle::plan(staging)?
            }
            TilingMethod::Auto if chunk_count <= self.config.combine_size() => {
                debug!(
                    "groupby '{}': auto chose tree for {chunk_count} chunks without probing",
                    request.input.id,
                );
                tree::plan(staging)?
            }
            TilingMethod::Auto => return Ok(Tiling::Probe(auto::probe(staging, ctx)?)),
        };

        Ok(Tiling::Complete(plan))
    }

    /// Complete an auto plan from the sizes its probe chunks recorded.
    pub fn finish_plan(
        &self,
        pending: PendingTiling,
        results: &ProbeResults,
    ) -> Result<AggregationPlan, InternalError> {
        auto::finish(pending, results)
    }
}

///
/// Tiling
///

#[derive(Debug)]
pub enum Tiling {
    Complete(AggregationPlan),
    Probe(PendingTiling),
}

///
/// AggregationPlan
///
/// Finished chunk graph. `method` is the strategy actually built, never
/// `Auto`.
///

#[derive(Clone, Debug)]
pub struct AggregationPlan {
    method: TilingMethod,
    graph: ChunkGraph,
    operand: AggregationOperand,
}

impl AggregationPlan {
    #[must_use]
    pub const fn method(&self) -> TilingMethod {
        self.method
    }

    #[must_use]
    pub const fn graph(&self) -> &ChunkGraph {
        &self.graph
    }

    #[must_use]
    pub fn into_graph(self) -> ChunkGraph {
        self.graph
    }

    /// Operand every stage was derived from.
    #[must_use]
    pub const fn operand(&self) -> &AggregationOperand {
        &self.operand
    }

    #[must_use]
    pub fn schema(&self) -> &OutputSchema {
        self.operand.schema()
    }
}

///
/// Staging
///
/// Graph under construction together with the facts every stage needs.
///

#[derive(Clone, Debug)]
struct Staging {
    request: GroupByRequest,
    operand: AggregationOperand,
    schema: Arc<OutputSchema>,
    config: AggregationConfig,
    builder: GraphBuilder,
}

impl Staging {
    fn new(request: &GroupByRequest, inference: &SchemaInference, config: &AggregationConfig) -> Self {
        let operand = AggregationOperand::new(
            OperandParts {
                params: inference.params.clone(),
                raw_params: request.params.clone(),
                steps: Arc::clone(&inference.steps),
                schema: Arc::clone(&inference.schema),
                index_levels: inference.index_levels,
                reset_output_index: inference.reset_output_index,
            },
            config,
        );

        Self {
            request: request.clone(),
            operand,
            schema: Arc::clone(&inference.schema),
            config: config.clone(),
            builder: GraphBuilder::new(),
        }
    }

    fn input_chunks(&self) -> Vec<ChunkRef> {
        self.request
            .input
            .ordered_chunks()
            .into_iter()
            .cloned()
            .collect()
    }

    /// One map node per input chunk, each bound to the matching chunk of
    /// every external key series.
    fn map_chunks(
        &mut self,
        chunks: &[ChunkRef],
        recorder: Option<&SizeRecorderHandle>,
    ) -> Result<Vec<ChunkKey>, InternalError> {
        let mut keys = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let mut inputs = vec![self.builder.add_source(chunk)];

            let mut series_chunks = Vec::new();
            let params = self.operand.params().bind_series_chunks(|id| {
                let series = self.request.key_series(id)?;
                let part = series
                    .chunks
                    .iter()
                    .find(|part| part.position == chunk.position)
                    .ok_or_else(|| {
                        InternalError::new(
                            ErrorClass::NotFound,
                            ErrorOrigin::Planner,
                            format!(
                                "key series '{id}' has no chunk at position {}",
                                chunk.position,
                            ),
                        )
                    })?;
                series_chunks.push(part.clone());

                Ok(part.key.clone())
            })?;
            for part in &series_chunks {
                inputs.push(self.builder.add_source(part));
            }

            let mut operand = self.operand.for_map(params);
            if let Some(recorder) = recorder {
                operand = operand.with_size_recorder(recorder.clone());
            }
            keys.push(self.builder.add(
                ChunkOp::Aggregate(operand),
                inputs,
                ChunkMeta::at(chunk.position),
            )?);
        }

        Ok(keys)
    }

    /// Final agg node over one keyed input.
    fn agg_chunk(&mut self, input: ChunkKey, position: usize) -> Result<ChunkKey, InternalError> {
        let meta = ChunkMeta::at(position).with_schema(Arc::clone(&self.schema));

        self.builder.add(
            ChunkOp::Aggregate(self.operand.for_agg()),
            vec![input],
            meta,
        )
    }

    fn finish(
        self,
        method: TilingMethod,
        results: Vec<ChunkKey>,
    ) -> Result<AggregationPlan, InternalError> {
        let graph = self.builder.finish(results)?;
        debug!(
            "groupby '{}': planned {} nodes with {method} method",
            self.request.input.id,
            graph.len(),
        );

        Ok(AggregationPlan {
            method,
            graph,
            operand: self.operand,
        })
    }
}
