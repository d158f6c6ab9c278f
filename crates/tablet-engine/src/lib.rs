//! The per-partition execution engine: a SQL+fn compile cache sitting in
//! front of a small scan/project/merge/limit operator DAG, driving the
//! block IR builder's compiled functions over rows read through the row
//! codec.

mod compile;
mod error;
mod metrics;
mod parser;
mod partition;
mod plan;
mod session;
mod value;

pub use compile::{CompileInfo, Engine};
pub use error::{EngineError, SqlError};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use parser::{CmpOp, Literal, MiniParser, ParsedQuery, ParsedSource, SelectItem, SourceParser, WherePred, WindowSpec};
pub use partition::{MemPartition, PartitionStore};
pub use plan::{Plan, PlanNode};
pub use session::run;
pub use value::RowValue;
