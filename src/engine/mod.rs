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

//! Execution engine glue.
//!
//! Plans run on [polars](https://pola.rs): the plan layer lowers its IR to
//! polars expressions and appends them to a [`LazyFrame`]. This module holds
//! what sits between the two: the error type and its schema/engine split,
//! CSV I/O, the [`Relation`] conversion used by `execute`, and the dtype
//! checks that need a resolved input schema.

mod io;
mod types;

pub use io::{read_csv, write_csv, write_csv_to};
pub use polars::prelude::{DataFrame, DataType, LazyFrame, Schema, SchemaRef};
pub use types::Expect;
pub(crate) use types::{check_agree, check_dtype, resolve_dtypes};

use polars::prelude::{IntoLazy, PolarsError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading data or materializing a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error("{op} expects {expected}, got {found}")]
    InvalidType {
        op: &'static str,
        expected: Expect,
        found: DataType,
    },
    #[error("incompatible types for {op}: {left} and {right}")]
    IncompatibleTypes {
        op: &'static str,
        left: DataType,
        right: DataType,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors caused by the shape or types of the data the pipeline
    /// was run against, as opposed to failures of the engine itself.
    pub fn is_schema_error(&self) -> bool {
        match self {
            Error::Polars(err) => is_schema_polars_error(err),
            Error::InvalidType { .. } | Error::IncompatibleTypes { .. } => true,
            Error::Io(_) => false,
        }
    }
}

fn is_schema_polars_error(err: &PolarsError) -> bool {
    match err {
        PolarsError::ColumnNotFound(_)
        | PolarsError::SchemaFieldNotFound(_)
        | PolarsError::SchemaMismatch(_)
        | PolarsError::StructFieldNotFound(_)
        | PolarsError::InvalidOperation(_) => true,
        PolarsError::Context { error, .. } => is_schema_polars_error(error),
        _ => false,
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Relation
// ---------------------------------------------------------------------------

/// A source a plan can run against: a materialized [`DataFrame`] or an
/// existing [`LazyFrame`]. Either way the result is lazy.
pub trait Relation {
    fn into_lazy_frame(self) -> LazyFrame;
}

impl Relation for DataFrame {
    fn into_lazy_frame(self) -> LazyFrame {
        self.lazy()
    }
}

impl Relation for &DataFrame {
    fn into_lazy_frame(self) -> LazyFrame {
        self.clone().lazy()
    }
}

impl Relation for LazyFrame {
    fn into_lazy_frame(self) -> LazyFrame {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use polars::prelude::*;

    #[test]
    fn schema_errors_are_classified() {
        let missing = Error::from(PolarsError::ColumnNotFound("sales".into()));
        assert!(missing.is_schema_error());

        let wrapped = Error::from(PolarsError::Context {
            error: Box::new(PolarsError::ColumnNotFound("sales".into())),
            msg: "resolving select".into(),
        });
        assert!(wrapped.is_schema_error());

        let io = Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(!io.is_schema_error());

        let mismatch = Error::IncompatibleTypes {
            op: "when_then_otherwise",
            left: DataType::String,
            right: DataType::Int64,
        };
        assert!(mismatch.is_schema_error());
        assert_eq!(
            mismatch.to_string(),
            "incompatible types for when_then_otherwise: str and i64"
        );
    }

    #[test]
    fn relation_keeps_frames_lazy() {
        let df = df!("a" => [1i64, 2, 3]).unwrap();
        let lf = (&df).into_lazy_frame().filter(col("a").gt(lit(1i64)));
        let out = lf.into_lazy_frame().collect().unwrap();
        assert_eq!(out.height(), 2);
        assert_eq!(df.height(), 3);
    }
}
