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

// Expression compiler: lowers plan `Expr` trees into polars expressions.
//
// Compilation never looks at a schema. Column references resolve when the
// pipeline is collected.

use polars::prelude::{self as pl, DataType, SortOptions};

use super::functions::lower_call;
use super::ir::{BinaryOp, Expr, Literal, NamedExpr, UnaryOp};
use super::PlanError;

/// Recursively compile an expression into a polars expression.
pub fn compile_expr(expr: &Expr) -> Result<pl::Expr, PlanError> {
    match expr {
        Expr::Col { name } => Ok(pl::col(name.as_str())),

        Expr::Lit { value } => Ok(literal(value)),

        Expr::Unary { op, expr: inner } => {
            let e = compile_expr(inner)?;
            Ok(match op {
                UnaryOp::Not => e.not(),
                // Multiplying keeps the operand's name and integer width.
                UnaryOp::Neg => e * pl::lit(-1i64),
            })
        }

        Expr::Binary { op, left, right } => {
            Ok(binary(*op, compile_expr(left)?, compile_expr(right)?))
        }

        Expr::Func { name, args } => {
            let args = args.iter().map(compile_expr).collect::<Result<Vec<_>, _>>()?;
            lower_call(name, args)
        }

        Expr::TopK { expr: inner, k } => ranked(compile_expr(inner)?, *k, true),
        Expr::BottomK { expr: inner, k } => ranked(compile_expr(inner)?, *k, false),

        // when(c1).then(v1).when(c2).then(v2).otherwise(o) nests right to left:
        // when(c1).then(v1).otherwise(when(c2).then(v2).otherwise(o))
        Expr::WhenThenOtherwise {
            branches,
            otherwise,
        } => {
            if branches.is_empty() {
                return Err(PlanError::validation(
                    "when_then_otherwise.branches",
                    "when_then_otherwise requires at least one branch",
                ));
            }
            let tail = match otherwise {
                Some(e) => compile_expr(e)?,
                None => pl::lit(pl::Null {}),
            };
            branches.iter().rev().try_fold(tail, |acc, (cond, then)| {
                Ok(pl::when(compile_expr(cond)?)
                    .then(compile_expr(then)?)
                    .otherwise(acc))
            })
        }
    }
}

/// Compile a named expression, applying its alias when set.
pub fn compile_named(named: &NamedExpr) -> Result<pl::Expr, PlanError> {
    let expr = compile_expr(&named.expr)?;
    Ok(match named.alias.as_deref() {
        Some(alias) if !alias.is_empty() => expr.alias(alias),
        _ => expr,
    })
}

fn literal(value: &Literal) -> pl::Expr {
    match value {
        Literal::Null => pl::lit(pl::Null {}),
        Literal::Bool(b) => pl::lit(*b),
        Literal::Int(i) => pl::lit(*i),
        Literal::Float(f) => pl::lit(*f),
        Literal::Str(s) => pl::lit(s.as_str()),
    }
}

fn binary(op: BinaryOp, l: pl::Expr, r: pl::Expr) -> pl::Expr {
    match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        // True division, also for integer operands.
        BinaryOp::Div => l.cast(DataType::Float64) / r.cast(DataType::Float64),
        BinaryOp::Eq => l.eq(r),
        BinaryOp::Neq => l.neq(r),
        BinaryOp::Lt => l.lt(r),
        BinaryOp::Lte => l.lt_eq(r),
        BinaryOp::Gt => l.gt(r),
        BinaryOp::Gte => l.gt_eq(r),
        BinaryOp::And => l.and(r),
        BinaryOp::Or => l.or(r),
    }
}

/// Up to `k` values, largest (`descending`) or smallest first. Nulls sort
/// after every value and ties keep input order.
fn ranked(e: pl::Expr, k: i64, descending: bool) -> Result<pl::Expr, PlanError> {
    let k = usize::try_from(k)
        .ok()
        .filter(|&k| k >= 1)
        .ok_or_else(|| PlanError::validation("k", format!("k must be at least 1, got {k}")))?;
    let options = SortOptions::default()
        .with_order_descending(descending)
        .with_nulls_last(true)
        .with_maintain_order(true);
    Ok(e.sort(options).head(Some(k)))
}
