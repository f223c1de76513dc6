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

// Per-op dtype checks run against the op's resolved input schema.

use polars::prelude::{self as pl, LazyFrame};

use super::expr::compile_expr;
use super::functions::{lookup, normalize};
use super::ir::{Expr, Op};
use super::PlanError;
use crate::engine::{self, check_agree, check_dtype, resolve_dtypes, Expect};

enum Rule {
    /// Result values of one conditional: every branch value, then `otherwise`.
    Agree { op: &'static str, len: usize },
    Is { op: &'static str, expected: Expect },
}

#[derive(Default)]
struct Checks {
    exprs: Vec<pl::Expr>,
    rules: Vec<Rule>,
}

impl Checks {
    fn is(&mut self, op: &'static str, expected: Expect, expr: &Expr) -> Result<(), PlanError> {
        self.exprs.push(compile_expr(expr)?);
        self.rules.push(Rule::Is { op, expected });
        Ok(())
    }

    fn walk(&mut self, expr: &Expr) -> Result<(), PlanError> {
        match expr {
            Expr::Col { .. } | Expr::Lit { .. } => {}
            Expr::Unary { expr, .. } => self.walk(expr)?,
            Expr::Binary { left, right, .. } => {
                self.walk(left)?;
                self.walk(right)?;
            }
            Expr::Func { name, args } => {
                if lookup(&normalize(name)).is_some_and(|def| def.takes_string()) {
                    for arg in args {
                        self.is("string function", Expect::String, arg)?;
                    }
                }
                for arg in args {
                    self.walk(arg)?;
                }
            }
            Expr::TopK { expr, .. } | Expr::BottomK { expr, .. } => self.walk(expr)?,
            Expr::WhenThenOtherwise {
                branches,
                otherwise,
            } => {
                for (condition, _) in branches {
                    self.is("when", Expect::Boolean, condition)?;
                }
                let mut len = 0;
                for (_, value) in branches {
                    self.exprs.push(compile_expr(value)?);
                    len += 1;
                }
                if let Some(otherwise) = otherwise {
                    self.exprs.push(compile_expr(otherwise)?);
                    len += 1;
                }
                self.rules.push(Rule::Agree { op: "when", len });
                for (condition, value) in branches {
                    self.walk(condition)?;
                    self.walk(value)?;
                }
                if let Some(otherwise) = otherwise {
                    self.walk(otherwise)?;
                }
            }
        }
        Ok(())
    }

    fn run(self, input: &LazyFrame) -> Result<(), engine::Error> {
        if self.rules.is_empty() {
            return Ok(());
        }
        let Some(dtypes) = resolve_dtypes(input, self.exprs) else {
            return Ok(());
        };
        let mut at = 0;
        for rule in self.rules {
            match rule {
                Rule::Is { op, expected } => {
                    check_dtype(op, expected, &dtypes[at])?;
                    at += 1;
                }
                Rule::Agree { op, len } => {
                    check_agree(op, &dtypes[at..at + len])?;
                    at += len;
                }
            }
        }
        Ok(())
    }
}

/// Check `op` against the schema of `input`, the frame it will be appended to.
/// Schema errors from resolution itself are left for `collect` to report.
pub(crate) fn check_op(input: &LazyFrame, op: &Op) -> Result<(), PlanError> {
    let mut checks = Checks::default();
    match op {
        Op::Select(select) => {
            for named in &select.exprs {
                checks.walk(&named.expr)?;
            }
        }
        Op::WithColumns(with) => {
            for named in &with.exprs {
                checks.walk(&named.expr)?;
            }
        }
        Op::Filter(filter) => {
            checks.is("filter", Expect::Boolean, &filter.predicate)?;
            checks.walk(&filter.predicate)?;
        }
        Op::Sort(sort) => {
            for key in &sort.by {
                checks.walk(&key.expr)?;
            }
        }
        Op::Limit(_) => {}
        Op::GroupByAgg(group) => {
            for expr in group.by.iter().chain(group.named_by.values()) {
                checks.walk(expr)?;
            }
            for named in &group.aggs {
                checks.walk(&named.expr)?;
            }
            for agg in group.named_aggs.values() {
                checks.walk(agg)?;
            }
        }
    }
    checks.run(input).map_err(PlanError::Schema)
}
