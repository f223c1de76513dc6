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

// Plan layer: a closed, serializable query IR and its compiler.
//
// A `Plan` is decoded from JSON (or built directly), checked by the
// validator, lowered op by op into polars expressions and appended to a
// `LazyFrame`. Nothing is materialized here.

pub mod expr;
pub mod functions;
pub mod ir;
pub mod planner;
mod typecheck;
pub mod validate;
mod wire;

pub use functions::{function_names, Arity};
pub use ir::{
    BinaryOp, Expr, Filter, GroupByAgg, Limit, Literal, NamedExpr, Op, Plan, Select, Sort,
    SortKey, UnaryOp, WithColumns,
};
pub use planner::{compile_plan, execute, execute_json, execute_value, run, Stage};
pub use validate::validate;

use polars::prelude::PolarsError;

use crate::engine;

/// Errors produced by the plan layer.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// The plan is structurally invalid. `path` points at the offending node,
    /// e.g. `ops[1].aggs[0].expr`.
    #[error("invalid plan at {path}: {message}")]
    Validation { path: String, message: String },
    /// Well-formed, but names a function, operator or op that is not supported.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("{function}() expects {expected} argument(s), got {found}")]
    InvalidArity {
        function: String,
        expected: Arity,
        found: usize,
    },
    /// Unknown column or type mismatch.
    #[error("schema error: {0}")]
    Schema(#[source] engine::Error),
    #[error("engine error: {0}")]
    Engine(#[source] engine::Error),
}

impl PlanError {
    pub(crate) fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        PlanError::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True when the plan was rejected before touching any data.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PlanError::Validation { .. }
                | PlanError::UnsupportedOperation(_)
                | PlanError::InvalidArity { .. }
        )
    }
}

impl From<engine::Error> for PlanError {
    fn from(err: engine::Error) -> Self {
        if err.is_schema_error() {
            PlanError::Schema(err)
        } else {
            PlanError::Engine(err)
        }
    }
}

impl From<PolarsError> for PlanError {
    fn from(err: PolarsError) -> Self {
        engine::Error::from(err).into()
    }
}
