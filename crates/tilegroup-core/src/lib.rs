//! Physical planning and staged execution for chunk-parallel GROUP-BY
//! aggregation: schema inference by mock execution, tree or sample-sort
//! shuffle tiling, and the map / combine / agg stages that run the graph.
#![warn(unreachable_pub)]

pub mod error;
pub mod exec;
pub mod frame;
pub mod graph;
pub mod groupby;
pub mod plan;
pub mod reduce;
pub mod runtime;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

pub use tilegroup_config::{AggregationConfig, ConfigError, TilingMethod};

///
/// Prelude
///
/// Request vocabulary and the planner entry points.
///

pub mod prelude {
    pub use crate::{
        error::InternalError,
        frame::{ColumnLabel, Frame},
        groupby::{ByKey, ChunkRef, FuncSpec, GroupByParams, GroupByRequest, InputSchema, Tileable},
        plan::{AggregationPlan, GroupByPlanner, Tiling},
        runtime::{ExecutionContext, LocalRunner, MemoryContext},
        value::{DType, Value},
    };
    pub use tilegroup_config::{AggregationConfig, TilingMethod};
}
