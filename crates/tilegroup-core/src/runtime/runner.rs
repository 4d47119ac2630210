use crate::{
    error::InternalError,
    exec::execute_node,
    frame::Frame,
    graph::{ChunkGraph, ChunkOp},
    groupby::GroupByRequest,
    plan::{AggregationPlan, GroupByPlanner, PendingTiling, ProbeResults, Tiling},
    reduce::ReductionCompiler,
    runtime::ExecutionContext,
};
use log::{debug, trace};

///
/// LocalRunner
///
/// Executes chunk graphs sequentially against one context. Nodes whose key
/// is already stored are skipped; source chunks must be stored up front.
///

#[derive(Clone, Copy)]
pub struct LocalRunner<'a> {
    ctx: &'a dyn ExecutionContext,
}

impl<'a> LocalRunner<'a> {
    #[must_use]
    pub const fn new(ctx: &'a dyn ExecutionContext) -> Self {
        Self { ctx }
    }

    /// Execute every missing node of `graph`. Returns the number of nodes
    /// computed by this call.
    pub fn run(&self, graph: &ChunkGraph) -> Result<usize, InternalError> {
        let mut computed = 0;
        for node in graph.nodes() {
            if self.ctx.contains(node.key()) && !node.records_sizes() {
                trace!("skip {} node {}, already stored", node.stage_label(), node.key());
                continue;
            }
            if matches!(node.op(), ChunkOp::Source) {
                return Err(InternalError::chunk_not_found(node.key()));
            }

            let data = execute_node(node, self.ctx)?;
            self.ctx.set(node.key().clone(), data);
            computed += 1;
        }

        Ok(computed)
    }

    /// Result frames of an executed graph, in result order.
    pub fn results(&self, graph: &ChunkGraph) -> Result<Vec<Frame>, InternalError> {
        graph
            .results()
            .iter()
            .map(|key| self.ctx.fetch(key)?.as_frame().cloned())
            .collect()
    }

    /// Plan, probe if needed, and execute `request` to completion.
    pub fn aggregate<C: ReductionCompiler>(
        &self,
        planner: &GroupByPlanner<C>,
        request: &GroupByRequest,
    ) -> Result<LocalRun, InternalError> {
        let (plan, probe_chunks) = match planner.plan(request, self.ctx)? {
            Tiling::Complete(plan) => (plan, 0),
            Tiling::Probe(pending) => {
                let (probed, results) = match self.probe(&pending) {
                    Ok(probe) => probe,
                    Err(err) => {
                        self.ctx.destroy_size_recorder(pending.recorder_name());
                        return Err(err);
                    }
                };
                debug!(
                    "groupby '{}': probe computed {probed} chunks, {} size records",
                    request.input.id,
                    results.len(),
                );

                (planner.finish_plan(pending, &results)?, probed)
            }
        };

        self.run(plan.graph())?;
        let frames = self.results(plan.graph())?;

        Ok(LocalRun {
            plan,
            probe_chunks,
            frames,
        })
    }

    /// Run the probe graph and read its recorder.
    fn probe(&self, pending: &PendingTiling) -> Result<(usize, ProbeResults), InternalError> {
        let probed = self.run(pending.probe_graph())?;
        let results = pending.collect_results(self.ctx)?;

        Ok((probed, results))
    }
}

///
/// LocalRun
///
/// Finished aggregation: the plan that ran, how many chunks its probe
/// computed, and one frame per result chunk.
///

#[derive(Clone, Debug)]
pub struct LocalRun {
    pub plan: AggregationPlan,
    pub probe_chunks: usize,
    pub frames: Vec<Frame>,
}

impl LocalRun {
    /// All result chunks stacked in chunk order.
    pub fn combined(&self) -> Result<Frame, InternalError> {
        Ok(Frame::concat_rows(&self.frames)?)
    }
}
