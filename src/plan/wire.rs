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

// Pre-pass over decoded JSON that classifies discriminator errors before
// typed deserialization. serde would report an unknown `op` or operator as a
// generic "unknown variant"; here those become UnsupportedOperation with a
// path, unknown expression kinds become Validation errors. Anything this pass
// does not understand is left for serde to reject.

use serde_json::Value;

use super::ir::{BinaryOp, Op, UnaryOp};
use super::PlanError;

const EXPR_KINDS: [&str; 8] = [
    "col",
    "lit",
    "unary",
    "binary",
    "func",
    "topk",
    "bottomk",
    "when_then_otherwise",
];

pub(crate) fn check_plan(value: &Value) -> Result<(), PlanError> {
    let obj = value
        .as_object()
        .ok_or_else(|| PlanError::validation("plan", "expected an object with an `ops` array"))?;
    for (i, op) in items(obj.get("ops")) {
        check_op(op, &format!("ops[{i}]"))?;
    }
    Ok(())
}

fn items(value: Option<&Value>) -> impl Iterator<Item = (usize, &Value)> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
}

fn entries(value: Option<&Value>) -> impl Iterator<Item = (&String, &Value)> {
    value.and_then(Value::as_object).into_iter().flatten()
}

fn check_op(op: &Value, path: &str) -> Result<(), PlanError> {
    let Some(name) = op.get("op").and_then(Value::as_str) else {
        return Ok(());
    };
    match name {
        "select" | "with_columns" => check_named_list(op.get("exprs"), &format!("{path}.exprs")),
        "filter" => check_expr(op.get("predicate"), &format!("{path}.predicate")),
        "sort" => {
            for (i, key) in items(op.get("by")) {
                check_expr(key.get("expr"), &format!("{path}.by[{i}].expr"))?;
            }
            Ok(())
        }
        "limit" => Ok(()),
        "groupby_agg" => {
            for (i, key) in items(op.get("by")) {
                check_expr(Some(key), &format!("{path}.by[{i}]"))?;
            }
            for (name, key) in entries(op.get("named_by")) {
                check_expr(Some(key), &format!("{path}.named_by.{name}"))?;
            }
            check_named_list(op.get("aggs"), &format!("{path}.aggs"))?;
            for (name, agg) in entries(op.get("named_aggs")) {
                check_expr(Some(agg), &format!("{path}.named_aggs.{name}"))?;
            }
            Ok(())
        }
        other => {
            Err(PlanError::UnsupportedOperation(format!(
                "unknown op `{other}` at {path} (expected one of: {})",
                Op::NAMES.join(", ")
            )))
        }
    }
}

fn check_named_list(list: Option<&Value>, path: &str) -> Result<(), PlanError> {
    for (i, item) in items(list) {
        check_expr(item.get("expr"), &format!("{path}[{i}].expr"))?;
    }
    Ok(())
}

fn check_expr(expr: Option<&Value>, path: &str) -> Result<(), PlanError> {
    let Some(expr) = expr else {
        return Ok(());
    };
    let Some(kind) = expr.get("kind").and_then(Value::as_str) else {
        return Ok(());
    };
    match kind {
        "col" | "lit" => Ok(()),
        "unary" => {
            if let Some(op) = expr.get("op").and_then(Value::as_str) {
                if !UnaryOp::ALL.iter().any(|u| u.as_str() == op) {
                    return Err(PlanError::UnsupportedOperation(format!(
                        "unknown unary operator `{op}` at {path}.op"
                    )));
                }
            }
            check_expr(expr.get("expr"), &format!("{path}.expr"))
        }
        "binary" => {
            if let Some(op) = expr.get("op").and_then(Value::as_str) {
                if !BinaryOp::ALL.iter().any(|b| b.as_str() == op) {
                    return Err(PlanError::UnsupportedOperation(format!(
                        "unknown binary operator `{op}` at {path}.op"
                    )));
                }
            }
            check_expr(expr.get("left"), &format!("{path}.left"))?;
            check_expr(expr.get("right"), &format!("{path}.right"))
        }
        "func" => {
            for (i, arg) in items(expr.get("args")) {
                check_expr(Some(arg), &format!("{path}.args[{i}]"))?;
            }
            Ok(())
        }
        "topk" | "bottomk" => check_expr(expr.get("expr"), &format!("{path}.expr")),
        "when_then_otherwise" => {
            for (i, branch) in items(expr.get("branches")) {
                check_expr(branch.get(0), &format!("{path}.branches[{i}][0]"))?;
                check_expr(branch.get(1), &format!("{path}.branches[{i}][1]"))?;
            }
            check_expr(expr.get("otherwise"), &format!("{path}.otherwise"))
        }
        other => {
            Err(PlanError::validation(
                format!("{path}.kind"),
                format!(
                    "unknown expression kind `{other}` (expected one of: {})",
                    EXPR_KINDS.join(", ")
                ),
            ))
        }
    }
}
