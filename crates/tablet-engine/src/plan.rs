//! The operator DAG: `Scan -> [Filter] -> Project [windowed] -> [Limit]`.
//! Nodes are evaluated eagerly into `Vec<RowValue>` row buffers rather than
//! a pull-based iterator chain — adequate for the in-memory, single-sink
//! pipelines this engine drives, and easy to reason about for windowed
//! materialization, which already needs a fully materialized partition.

use std::collections::HashMap;

use tablet_irgen::{InterpSink, Module, RtValue};
use tablet_row::{RowView, Schema};

use crate::error::EngineError;
use crate::parser::{CmpOp, Literal, ParsedQuery, SelectItem, WherePred};
use crate::value::RowValue;

#[derive(Debug, Clone)]
pub enum PlanNode {
    Scan { table: String },
    Filter { pred: WherePred },
    Project { items: Vec<SelectItem>, window: Option<(String, String)> },
    Limit { n: u32 },
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub nodes: Vec<PlanNode>,
}

impl Plan {
    pub fn from_query(query: &ParsedQuery) -> Plan {
        let mut nodes = vec![PlanNode::Scan { table: query.table.clone() }];
        if let Some(pred) = &query.filter {
            nodes.push(PlanNode::Filter { pred: pred.clone() });
        }
        let window = query.window.as_ref().map(|w| (w.partition_by.clone(), w.order_by.clone()));
        nodes.push(PlanNode::Project { items: query.select.clone(), window });
        if let Some(n) = query.limit {
            nodes.push(PlanNode::Limit { n });
        }
        Plan { nodes }
    }
}

/// Runs a compiled plan against one partition's rows. `module` holds every
/// user-defined and auto-synthesized function the plan's `Project` nodes
/// may call; `agg_fn_of` maps a windowed select item to the name of its
/// synthesized aggregate function in `module`.
pub fn execute(
    plan: &Plan,
    schema: &Schema,
    rows: Vec<Vec<u8>>,
    module: &Module,
    agg_fn_of: &dyn Fn(&SelectItem) -> Option<String>,
) -> Result<Vec<Vec<RowValue>>, EngineError> {
    let sink = InterpSink::default();
    let mut buf: Vec<Vec<u8>> = rows;
    let mut out: Option<Vec<Vec<RowValue>>> = None;

    for node in &plan.nodes {
        match node {
            PlanNode::Scan { .. } => {
                // Rows already supplied by the caller's `full_scan`; nothing to do.
            }
            PlanNode::Filter { pred } => {
                buf = filter_rows(schema, buf, pred)?;
            }
            PlanNode::Project { items, window } => {
                out = Some(project(schema, &buf, items, window.as_ref(), module, &sink, agg_fn_of)?);
            }
            PlanNode::Limit { n } => {
                if let Some(rows) = &mut out {
                    rows.truncate(*n as usize);
                } else {
                    buf.truncate(*n as usize);
                }
            }
        }
    }

    Ok(out.unwrap_or_default())
}

fn filter_rows(schema: &Schema, rows: Vec<Vec<u8>>, pred: &WherePred) -> Result<Vec<Vec<u8>>, EngineError> {
    let idx = schema.index_of(&pred.column).ok_or_else(|| EngineError::UnknownColumn(pred.column.clone()))?;
    let ty = schema.column(idx).unwrap().ty;
    let mut kept = Vec::new();
    for row in rows {
        let view = RowView::new(schema, &row)?;
        let Some(value) = RowValue::read(&view, idx, ty) else { continue };
        if matches_pred(&value, pred) {
            kept.push(row);
        }
    }
    Ok(kept)
}

fn matches_pred(value: &RowValue, pred: &WherePred) -> bool {
    let literal = match &pred.literal {
        Literal::Int(v) => RowValue::I64(*v),
        Literal::Float(v) => RowValue::F64(*v),
        Literal::Str(v) => RowValue::Varchar(v.clone().into_bytes()),
    };
    let Some(ord) = value.partial_cmp(&coerce_like(&literal, value)) else { return false };
    match pred.op {
        CmpOp::Eq => ord == std::cmp::Ordering::Equal,
        CmpOp::Ne => ord != std::cmp::Ordering::Equal,
        CmpOp::Lt => ord == std::cmp::Ordering::Less,
        CmpOp::Le => ord != std::cmp::Ordering::Greater,
        CmpOp::Gt => ord == std::cmp::Ordering::Greater,
        CmpOp::Ge => ord != std::cmp::Ordering::Less,
    }
}

/// Widens an integer literal to match the column's concrete integer width
/// so `partial_cmp`'s same-variant requirement is satisfied.
fn coerce_like(literal: &RowValue, like: &RowValue) -> RowValue {
    match (like, literal) {
        (RowValue::I16(_), RowValue::I64(v)) => RowValue::I16(*v as i16),
        (RowValue::I32(_), RowValue::I64(v)) => RowValue::I32(*v as i32),
        (RowValue::F32(_), RowValue::F64(v)) => RowValue::F32(*v as f32),
        _ => literal.clone(),
    }
}

#[allow(clippy::too_many_arguments)]
fn project(
    schema: &Schema,
    rows: &[Vec<u8>],
    items: &[SelectItem],
    window: Option<&(String, String)>,
    module: &Module,
    sink: &InterpSink,
    agg_fn_of: &dyn Fn(&SelectItem) -> Option<String>,
) -> Result<Vec<Vec<RowValue>>, EngineError> {
    let groups = match window {
        Some((partition_by, order_by)) => Some(build_partitions(schema, rows, partition_by, order_by)?),
        None => None,
    };

    let mut out = Vec::with_capacity(rows.len());
    for (row_idx, row) in rows.iter().enumerate() {
        let view = RowView::new(schema, row)?;
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            let v = match item {
                SelectItem::Column(name) => {
                    let idx = schema.index_of(name).ok_or_else(|| EngineError::UnknownColumn(name.clone()))?;
                    RowValue::read(&view, idx, schema.column(idx).unwrap().ty).unwrap_or(RowValue::Null)
                }
                SelectItem::Call { name, args } => {
                    let arg_values: Vec<RtValue> = args
                        .iter()
                        .map(|a| eval_scalar_item(schema, &view, a))
                        .collect::<Result<Vec<_>, _>>()?;
                    let func = module.find(name).ok_or_else(|| EngineError::UnknownColumn(name.clone()))?;
                    rt_to_row_value(sink.call(func, &arg_values))
                }
                SelectItem::WindowedAgg { column, .. } => {
                    let groups = groups.as_ref().expect("windowed select item without a WINDOW clause");
                    let fn_name = agg_fn_of(item).expect("agg function synthesized at compile time");
                    let func = module.find(&fn_name).ok_or_else(|| EngineError::UnknownColumn(fn_name.clone()))?;
                    let window_values = groups.window_for_row(row_idx);
                    let col_idx = schema.index_of(column).ok_or_else(|| EngineError::UnknownColumn(column.clone()))?;
                    let ty = schema.column(col_idx).unwrap().ty;
                    let list: Vec<RtValue> = window_values
                        .iter()
                        .map(|r| RowView::new(schema, r).ok().and_then(|v| RowValue::read(&v, col_idx, ty)).map(|rv| rv.to_rt()).unwrap_or(RtValue::I64(0)))
                        .collect();
                    rt_to_row_value(sink.call(func, &[RtValue::List(std::sync::Arc::new(list))]))
                }
            };
            values.push(v);
        }
        out.push(values);
    }
    Ok(out)
}

fn eval_scalar_item(schema: &Schema, view: &RowView<'_>, item: &SelectItem) -> Result<RtValue, EngineError> {
    match item {
        SelectItem::Column(name) => {
            let idx = schema.index_of(name).ok_or_else(|| EngineError::UnknownColumn(name.clone()))?;
            Ok(RowValue::read(view, idx, schema.column(idx).unwrap().ty).unwrap_or(RowValue::Null).to_rt())
        }
        other => Err(EngineError::UnknownColumn(format!("{other:?} is not a valid UDF argument"))),
    }
}

fn rt_to_row_value(v: RtValue) -> RowValue {
    match v {
        RtValue::Bool(v) => RowValue::Bool(v),
        RtValue::I16(v) => RowValue::I16(v),
        RtValue::I32(v) => RowValue::I32(v),
        RtValue::I64(v) => RowValue::I64(v),
        RtValue::F32(v) => RowValue::F32(v),
        RtValue::F64(v) => RowValue::F64(v),
        RtValue::List(_) => RowValue::Null,
    }
}

/// Per-row windows: the bytes of every row sharing the current row's
/// partition key, in `order_by` order. Built once per `Project(windowed)`
/// invocation over the whole scanned set, per the "window equal to the
/// matching partition" rule.
struct Partitions {
    groups: HashMap<String, Vec<Vec<u8>>>,
    row_key: Vec<String>,
}

impl Partitions {
    fn window_for_row(&self, row_idx: usize) -> &[Vec<u8>] {
        self.groups.get(&self.row_key[row_idx]).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn build_partitions(
    schema: &Schema,
    rows: &[Vec<u8>],
    partition_by: &str,
    order_by: &str,
) -> Result<Partitions, EngineError> {
    let partition_by_idx = schema.index_of(partition_by).ok_or_else(|| EngineError::UnknownColumn(partition_by.to_string()))?;
    let order_by_idx = schema.index_of(order_by).ok_or_else(|| EngineError::UnknownColumn(order_by.to_string()))?;
    let pty = schema.column(partition_by_idx).unwrap().ty;
    let oty = schema.column(order_by_idx).unwrap().ty;

    let mut row_key = Vec::with_capacity(rows.len());
    let mut groups: HashMap<String, Vec<Vec<u8>>> = HashMap::new();
    for row in rows {
        let view = RowView::new(schema, row)?;
        let key = RowValue::read(&view, partition_by_idx, pty).unwrap_or(RowValue::Null).to_string();
        row_key.push(key.clone());
        groups.entry(key).or_default().push(row.clone());
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| {
            let va = RowView::new(schema, a).ok().and_then(|v| RowValue::read(&v, order_by_idx, oty));
            let vb = RowView::new(schema, b).ok().and_then(|v| RowValue::read(&v, order_by_idx, oty));
            va.partial_cmp(&vb).unwrap_or(std::cmp::Ordering::Equal)
        });
    }
    Ok(Partitions { groups, row_key })
}
