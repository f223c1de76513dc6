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

//! Closed, serializable query plans over polars lazy frames.
//!
//! - [`engine`]: glue around polars: CSV I/O, error classification and the
//!   dtype checks plans add on top of polars' own resolution.
//! - [`plan`]: the plan IR, its validator and the compiler that lowers a
//!   plan onto polars expressions and lazy-frame stages.
//! - [`nlq`]: the boundary to an external plan producer (e.g. a language
//!   model client).
//!
//! ```
//! use tabplan::polars::df;
//! use tabplan::{execute, Expr, GroupByAgg, Plan};
//!
//! let sales = df!(
//!     "city" => ["Seoul", "Paris", "Seoul"],
//!     "sales" => [30i64, 50, 20],
//! )
//! .unwrap();
//! let plan = Plan::default().push(
//!     GroupByAgg::new()
//!         .by(Expr::col("city"))
//!         .agg(Expr::func("sum", vec![Expr::col("sales")]).alias("total_sales"))
//!         .maintain_order(true),
//! );
//! let out = execute(sales, &plan).unwrap().collect().unwrap();
//! assert_eq!(out.height(), 2);
//! ```

pub mod engine;
pub mod nlq;
pub mod plan;

pub use polars;

pub use engine::{read_csv, DataFrame, DataType, LazyFrame, Relation, Schema};
pub use plan::{
    execute, execute_json, execute_value, run, validate, Expr, GroupByAgg, NamedExpr, Op, Plan,
    PlanError, SortKey,
};
