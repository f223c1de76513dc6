//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

// Plan executor: validates a plan, compiles each op to a stage of polars
// expressions and appends the stages to a lazy frame.

use std::fmt;

use polars::prelude::{self as pl, IdxSize, LazyFrame, SortMultipleOptions};

use super::expr::{compile_expr, compile_named};
use super::ir::{Op, Plan};
use super::typecheck;
use super::validate::validate;
use super::PlanError;
use crate::engine::Relation;

/// One compiled op, ready to be appended to a lazy frame.
#[derive(Debug, Clone)]
pub enum Stage {
    Select(Vec<pl::Expr>),
    WithColumns(Vec<pl::Expr>),
    Filter(pl::Expr),
    Sort {
        by: Vec<pl::Expr>,
        options: SortMultipleOptions,
    },
    Limit(IdxSize),
    GroupBy {
        keys: Vec<pl::Expr>,
        aggs: Vec<pl::Expr>,
        maintain_order: bool,
    },
}

impl Stage {
    /// Append this stage to `lf`. Nothing runs until the frame is collected.
    pub fn apply(self, lf: LazyFrame) -> LazyFrame {
        match self {
            Stage::Select(exprs) => lf.select(exprs),
            Stage::WithColumns(exprs) => lf.with_columns(exprs),
            Stage::Filter(predicate) => lf.filter(predicate),
            Stage::Sort { by, .. } if by.is_empty() => lf,
            Stage::Sort { by, options } => lf.sort_by_exprs(by, options),
            Stage::Limit(n) => lf.limit(n),
            Stage::GroupBy {
                keys,
                aggs,
                maintain_order: true,
            } => lf.group_by_stable(keys).agg(aggs),
            Stage::GroupBy { keys, aggs, .. } => lf.group_by(keys).agg(aggs),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Select(exprs) => write!(f, "SELECT {exprs:?}"),
            Stage::WithColumns(exprs) => write!(f, "WITH_COLUMNS {exprs:?}"),
            Stage::Filter(predicate) => write!(f, "FILTER {predicate:?}"),
            Stage::Sort { by, options } => write!(
                f,
                "SORT BY {by:?} descending={:?} nulls_last={:?}",
                options.descending, options.nulls_last
            ),
            Stage::Limit(n) => write!(f, "LIMIT {n}"),
            Stage::GroupBy {
                keys,
                aggs,
                maintain_order,
            } => write!(
                f,
                "GROUP BY {keys:?} AGG {aggs:?} maintain_order={maintain_order}"
            ),
        }
    }
}

/// Compile one op into a stage.
pub fn compile_op(op: &Op) -> Result<Stage, PlanError> {
    match op {
        Op::Select(select) => {
            let exprs = select
                .exprs
                .iter()
                .map(compile_named)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Stage::Select(exprs))
        }
        Op::WithColumns(with) => {
            let exprs = with
                .exprs
                .iter()
                .map(compile_named)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Stage::WithColumns(exprs))
        }
        Op::Filter(filter) => Ok(Stage::Filter(compile_expr(&filter.predicate)?)),
        Op::Sort(sort) => {
            let by = sort
                .by
                .iter()
                .map(|key| compile_expr(&key.expr))
                .collect::<Result<Vec<_>, _>>()?;
            // Stable, so equal keys keep their input order.
            let options = SortMultipleOptions::default()
                .with_order_descending_multi(sort.by.iter().map(|key| key.descending))
                .with_nulls_last_multi(sort.by.iter().map(|key| key.nulls_last))
                .with_maintain_order(true);
            Ok(Stage::Sort { by, options })
        }
        Op::Limit(limit) => {
            let n = IdxSize::try_from(limit.n).map_err(|_| {
                PlanError::validation("limit.n", format!("limit out of range: {}", limit.n))
            })?;
            Ok(Stage::Limit(n))
        }
        Op::GroupByAgg(group) => {
            // Keys: `by` under their default names, then `named_by` under the map keys.
            let mut keys: Vec<pl::Expr> = group.by.iter().map(compile_expr).collect::<Result<_, _>>()?;
            for (name, key) in &group.named_by {
                keys.push(compile_expr(key)?.alias(name.as_str()));
            }
            let mut aggs: Vec<pl::Expr> = group.aggs.iter().map(compile_named).collect::<Result<_, _>>()?;
            for (name, agg) in &group.named_aggs {
                aggs.push(compile_expr(agg)?.alias(name.as_str()));
            }
            Ok(Stage::GroupBy {
                keys,
                aggs,
                maintain_order: group.maintain_order,
            })
        }
    }
}

/// Validate `plan` and compile every op. Fails before any stage is produced
/// if any part of the plan is rejected.
pub fn compile_plan(plan: &Plan) -> Result<Vec<Stage>, PlanError> {
    validate(plan)?;
    plan.ops
        .iter()
        .enumerate()
        .map(|(i, op)| {
            let stage = compile_op(op)?;
            tracing::debug!(op = i, kind = op.name(), "compiled {stage}");
            Ok(stage)
        })
        .collect()
}

/// Apply `plan` to `source`, returning a lazy frame. Nothing is materialized.
///
/// `source` may be a [`DataFrame`](pl::DataFrame) or an existing
/// [`LazyFrame`]; an existing pipeline is kept and the plan's stages follow.
/// Conditional branches, `when` conditions, filter predicates and string
/// function arguments are checked against the resolved input schema of
/// each op before it is appended.
pub fn execute(source: impl Relation, plan: &Plan) -> Result<LazyFrame, PlanError> {
    let stages = compile_plan(plan)?;
    let mut lf = source.into_lazy_frame();
    for (i, (op, stage)) in plan.ops.iter().zip(stages).enumerate() {
        typecheck::check_op(&lf, op).inspect_err(|err| {
            tracing::debug!(op = i, kind = op.name(), "type check failed: {err}");
        })?;
        lf = stage.apply(lf);
    }
    Ok(lf)
}

/// [`execute`] for a plan in its JSON value form.
pub fn execute_value(source: impl Relation, plan: &serde_json::Value) -> Result<LazyFrame, PlanError> {
    let plan = Plan::from_value(plan)?;
    execute(source, &plan)
}

/// [`execute`] for a plan in JSON text form.
pub fn execute_json(source: impl Relation, plan: &str) -> Result<LazyFrame, PlanError> {
    let plan = Plan::from_json(plan)?;
    execute(source, &plan)
}

/// Execute and collect in one step.
pub fn run(source: impl Relation, plan: &Plan) -> Result<pl::DataFrame, PlanError> {
    Ok(execute(source, plan)?.collect()?)
}
