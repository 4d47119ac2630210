//! Module: plan::auto
//! Responsibility: two-phase auto tiling. Probe a prefix of the input, then
//! pick tree or shuffle from the recorded sizes.
//! Does not own: running the probe graph (the caller's runtime does).
//! Boundary: the recorder is created here and destroyed by
//! `PendingTiling::collect_results`.

use crate::{
    error::{ErrorClass, ErrorOrigin, InternalError},
    graph::ChunkGraph,
    plan::{
        AggregationPlan, Staging, shuffle,
        tree::{self, TreeBudget},
    },
    runtime::{ExecutionContext, SizeRecord},
};
use log::debug;
use tilegroup_config::TilingMethod;
use ulid::Ulid;

///
/// PendingTiling
///
/// Auto plan suspended on its probe. `probe_graph` computes one map chunk per
/// probed input with the size recorder attached; probe map keys equal the
/// final plan's map keys, so runners that skip computed chunks reuse them.
///

#[derive(Clone, Debug)]
pub struct PendingTiling {
    staging: Staging,
    probe: ChunkGraph,
    recorder: String,
}

impl PendingTiling {
    #[must_use]
    pub const fn probe_graph(&self) -> &ChunkGraph {
        &self.probe
    }

    #[must_use]
    pub fn recorder_name(&self) -> &str {
        &self.recorder
    }

    /// Number of probed input chunks.
    #[must_use]
    pub fn probe_count(&self) -> usize {
        self.probe.results().len()
    }

    /// Read and destroy the probe recorder. Fails without destroying it while
    /// fewer records than probes have arrived.
    pub fn collect_results(&self, ctx: &dyn ExecutionContext) -> Result<ProbeResults, InternalError> {
        let recorder = ctx.size_recorder(&self.recorder).ok_or_else(|| {
            InternalError::new(
                ErrorClass::NotFound,
                ErrorOrigin::Runtime,
                format!("size recorder '{}' not found", self.recorder),
            )
        })?;

        let records = recorder.snapshot();
        if records.len() < self.probe_count() {
            return Err(InternalError::new(
                ErrorClass::InvariantViolation,
                ErrorOrigin::Runtime,
                format!(
                    "size recorder '{}' holds {} of {} probe records",
                    self.recorder,
                    records.len(),
                    self.probe_count(),
                ),
            ));
        }
        ctx.destroy_size_recorder(&self.recorder);

        Ok(ProbeResults::new(records))
    }
}

///
/// ProbeResults
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProbeResults {
    records: Vec<SizeRecord>,
}

impl ProbeResults {
    #[must_use]
    pub const fn new(records: Vec<SizeRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[SizeRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> SizeRecord {
        self.records.iter().copied().sum()
    }

    /// Mean partial-tuple size of one probed map chunk.
    #[must_use]
    pub fn mean_aggregated_bytes(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }

        self.total().aggregated_bytes as f64 / self.records.len() as f64
    }
}

/// Phase 1: map the first `combine_size` chunks with a fresh recorder.
pub(super) fn probe(
    staging: Staging,
    ctx: &dyn ExecutionContext,
) -> Result<PendingTiling, InternalError> {
    let name = Ulid::new().to_string();
    let recorder = ctx.create_size_recorder(&name)?;

    let mut probing = staging.clone();
    let inputs = probing.input_chunks();
    let count = probing.config.combine_size().min(inputs.len());
    let maps = probing.map_chunks(&inputs[..count], Some(&recorder))?;
    let probe = probing.builder.snapshot(maps)?;

    debug!(
        "groupby '{}': auto probing {count} of {} chunks with recorder {name}",
        staging.request.input.id,
        inputs.len(),
    );

    Ok(PendingTiling {
        staging,
        probe,
        recorder: name,
    })
}

/// Phase 2: combine under the probed budget, escalating to shuffle when the
/// projected merged chunk would exceed it.
pub(super) fn finish(
    pending: PendingTiling,
    results: &ProbeResults,
) -> Result<AggregationPlan, InternalError> {
    if results.is_empty() {
        return Err(InternalError::planner_invalid(format!(
            "no probe sizes recorded by '{}'",
            pending.recorder,
        )));
    }

    let mut staging = pending.staging;
    let inputs = staging.input_chunks();
    let maps = staging.map_chunks(&inputs, None)?;

    let budget = TreeBudget {
        estimate: results.mean_aggregated_bytes(),
        ceiling: staging.config.tree_budget_bytes(),
    };
    debug!(
        "groupby '{}': probe mean {:.0} bytes over {} chunks, tree ceiling {:.0} bytes",
        staging.request.input.id,
        budget.estimate,
        results.len(),
        budget.ceiling,
    );

    let (survivors, estimate) = tree::combine_rounds(&mut staging, maps, Some(budget))?;
    let merged = estimate.unwrap_or(budget.estimate);

    if merged <= budget.ceiling {
        debug!(
            "groupby '{}': auto chose tree, merged estimate {merged:.0} bytes",
            staging.request.input.id,
        );
        let result = tree::finish(&mut staging, survivors)?;

        staging.finish(TilingMethod::Tree, vec![result])
    } else {
        debug!(
            "groupby '{}': auto escalated to shuffle over {} chunks, merged estimate {merged:.0} bytes",
            staging.request.input.id,
            survivors.len(),
        );
        let results = shuffle::shuffle_chunks(&mut staging, survivors, inputs.len())?;

        staging.finish(TilingMethod::Shuffle, results)
    }
}
