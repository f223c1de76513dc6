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

//! Structural checks run over a whole plan before anything is compiled.

use std::collections::HashMap;

use super::ir::{Expr, GroupByAgg, NamedExpr, Op, Plan};
use super::PlanError;

/// Validate every op of `plan`. The first violation rejects the plan.
pub fn validate(plan: &Plan) -> Result<(), PlanError> {
    for (i, op) in plan.ops.iter().enumerate() {
        validate_op(op, &format!("ops[{i}]"))?;
    }
    Ok(())
}

/// Tracks output names of one op and where each was first produced.
#[derive(Default)]
struct OutputNames<'a> {
    seen: HashMap<&'a str, String>,
}

impl<'a> OutputNames<'a> {
    fn insert(&mut self, name: &'a str, path: String) -> Result<(), PlanError> {
        if let Some(first) = self.seen.get(name) {
            return Err(PlanError::validation(
                path,
                format!("duplicate output name `{name}` (first produced at {first})"),
            ));
        }
        self.seen.insert(name, path);
        Ok(())
    }
}

fn validate_op(op: &Op, path: &str) -> Result<(), PlanError> {
    match op {
        Op::Select(select) => validate_named_list(&select.exprs, &format!("{path}.exprs")),
        Op::WithColumns(with) => validate_named_list(&with.exprs, &format!("{path}.exprs")),
        Op::Filter(filter) => validate_expr(&filter.predicate, &format!("{path}.predicate")),
        Op::Sort(sort) => {
            for (i, key) in sort.by.iter().enumerate() {
                validate_expr(&key.expr, &format!("{path}.by[{i}].expr"))?;
            }
            Ok(())
        }
        Op::Limit(limit) if limit.n < 0 => Err(PlanError::validation(
            format!("{path}.n"),
            format!("limit must be non-negative, got {}", limit.n),
        )),
        Op::Limit(_) => Ok(()),
        Op::GroupByAgg(group) => validate_group_by(group, path),
    }
}

fn validate_named_list(exprs: &[NamedExpr], path: &str) -> Result<(), PlanError> {
    let mut names = OutputNames::default();
    for (i, named) in exprs.iter().enumerate() {
        validate_expr(&named.expr, &format!("{path}[{i}].expr"))?;
        names.insert(named.output_name(), format!("{path}[{i}]"))?;
    }
    Ok(())
}

fn validate_group_by(group: &GroupByAgg, path: &str) -> Result<(), PlanError> {
    if group.by.is_empty() && group.named_by.is_empty() {
        return Err(PlanError::validation(
            path,
            "groupby_agg needs at least one key in by or named_by",
        ));
    }
    let mut names = OutputNames::default();
    for (i, key) in group.by.iter().enumerate() {
        let key_path = format!("{path}.by[{i}]");
        validate_expr(key, &key_path)?;
        names.insert(key.default_name(), key_path)?;
    }
    for (name, key) in &group.named_by {
        let key_path = format!("{path}.named_by.{name}");
        validate_expr(key, &key_path)?;
        if let Some(i) = group.by.iter().position(|b| b == key) {
            return Err(PlanError::validation(
                key_path,
                format!("grouping key is already listed at {path}.by[{i}]"),
            ));
        }
        names.insert(name, key_path)?;
    }
    for (i, agg) in group.aggs.iter().enumerate() {
        validate_expr(&agg.expr, &format!("{path}.aggs[{i}].expr"))?;
        names.insert(agg.output_name(), format!("{path}.aggs[{i}]"))?;
    }
    for (name, agg) in &group.named_aggs {
        let agg_path = format!("{path}.named_aggs.{name}");
        validate_expr(agg, &agg_path)?;
        names.insert(name, agg_path)?;
    }
    Ok(())
}

fn validate_expr(expr: &Expr, path: &str) -> Result<(), PlanError> {
    match expr {
        Expr::Col { .. } | Expr::Lit { .. } => Ok(()),
        Expr::Unary { expr, .. } => validate_expr(expr, &format!("{path}.expr")),
        Expr::Binary { left, right, .. } => {
            validate_expr(left, &format!("{path}.left"))?;
            validate_expr(right, &format!("{path}.right"))
        }
        Expr::Func { args, .. } => {
            for (i, arg) in args.iter().enumerate() {
                validate_expr(arg, &format!("{path}.args[{i}]"))?;
            }
            Ok(())
        }
        Expr::TopK { expr, k } | Expr::BottomK { expr, k } => {
            if *k < 1 {
                return Err(PlanError::validation(
                    format!("{path}.k"),
                    format!("k must be at least 1, got {k}"),
                ));
            }
            validate_expr(expr, &format!("{path}.expr"))
        }
        Expr::WhenThenOtherwise {
            branches,
            otherwise,
        } => {
            if branches.is_empty() {
                return Err(PlanError::validation(
                    format!("{path}.branches"),
                    "when_then_otherwise requires at least one branch",
                ));
            }
            for (i, (cond, then)) in branches.iter().enumerate() {
                validate_expr(cond, &format!("{path}.branches[{i}][0]"))?;
                validate_expr(then, &format!("{path}.branches[{i}][1]"))?;
            }
            match otherwise {
                Some(e) => validate_expr(e, &format!("{path}.otherwise")),
                None => Ok(()),
            }
        }
    }
}
