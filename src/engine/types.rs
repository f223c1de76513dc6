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

// Dtype checks against a resolved input schema.
//
// polars coerces freely (a string and an integer branch resolve to a string
// column). Plans are stricter: conditional branches must agree and
// predicates must be boolean. Resolution is schema-only and never touches
// rows; when it fails (e.g. an unknown column) the checks are skipped and
// `collect` reports the underlying error.

use std::fmt;

use polars::prelude::{DataType, Expr, LazyFrame, UnknownKind};

use super::{Error, Result};

/// A required dtype class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Boolean,
    String,
}

impl fmt::Display for Expect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expect::Boolean => f.write_str("bool"),
            Expect::String => f.write_str("str"),
        }
    }
}

/// Output dtypes of `exprs` evaluated over `input`, in order. `None` when the
/// schema cannot be resolved.
pub(crate) fn resolve_dtypes(input: &LazyFrame, exprs: Vec<Expr>) -> Option<Vec<DataType>> {
    let exprs: Vec<Expr> = exprs
        .into_iter()
        .enumerate()
        .map(|(i, e)| e.alias(format!("__check_{i}")))
        .collect();
    match input.clone().select(exprs).collect_schema() {
        Ok(schema) => Some(schema.iter().map(|(_, dtype)| dtype.clone()).collect()),
        Err(err) => {
            tracing::trace!("skipping dtype checks: {err}");
            None
        }
    }
}

/// Settle not-yet-typed literals to the dtype they materialize as.
fn settle(dtype: &DataType) -> DataType {
    match dtype {
        DataType::Unknown(UnknownKind::Int(_)) => DataType::Int64,
        DataType::Unknown(UnknownKind::Float) => DataType::Float64,
        DataType::Unknown(UnknownKind::Str) => DataType::String,
        DataType::Unknown(_) => DataType::Null,
        other => other.clone(),
    }
}

fn is_null(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Null)
}

fn is_number(dtype: &DataType) -> bool {
    dtype.is_integer() || dtype.is_float()
}

/// `found` must be of class `expected`; null is accepted anywhere.
pub(crate) fn check_dtype(op: &'static str, expected: Expect, found: &DataType) -> Result<()> {
    let found = &settle(found);
    let ok = is_null(found)
        || match expected {
            Expect::Boolean => matches!(found, DataType::Boolean),
            Expect::String => matches!(found, DataType::String),
        };
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidType {
            op,
            expected,
            found: found.clone(),
        })
    }
}

/// All non-null dtypes must be equal, or all numeric.
pub(crate) fn check_agree(op: &'static str, dtypes: &[DataType]) -> Result<()> {
    let settled: Vec<DataType> = dtypes.iter().map(settle).collect();
    let mut known = settled.iter().filter(|dt| !is_null(dt));
    let Some(first) = known.next() else {
        return Ok(());
    };
    for dtype in known {
        if dtype != first && !(is_number(first) && is_number(dtype)) {
            return Err(Error::IncompatibleTypes {
                op,
                left: first.clone(),
                right: dtype.clone(),
            });
        }
    }
    Ok(())
}
