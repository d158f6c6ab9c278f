use tracing::instrument;

use crate::compile::Engine;
use crate::error::EngineError;
use crate::parser::SourceParser;
use crate::partition::PartitionStore;
use crate::plan::execute;
use crate::value::RowValue;

/// Ties the compile cache to a concrete partition: fetches (or builds) the
/// plan for `sql`, scans `store`, and runs the plan to completion.
#[instrument(skip(engine, parser, store), fields(db, sql))]
pub fn run(
    engine: &Engine,
    db: &str,
    sql: &str,
    parser: &dyn SourceParser,
    store: &dyn PartitionStore,
) -> Result<Vec<Vec<RowValue>>, EngineError> {
    let info = engine.get(db, sql, parser, &|_table| Some(store.schema().clone()))?;
    engine.metrics.record_run();
    let rows = store.full_scan();
    execute(&info.plan, &info.schema, rows, &info.module, &|item| info.agg_fn_for(item))
}
