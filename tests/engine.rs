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

//! Integration tests for the engine glue: CSV round trips and compiled
//! stages applied directly to polars lazy frames.

use std::io::Write;

use tabplan::engine::{self, read_csv, write_csv, Error};
use tabplan::plan::{self, Stage};
use tabplan::polars::df;
use tabplan::polars::prelude::*;

// ---------------------------------------------------------------------------
// Test data helpers
// ---------------------------------------------------------------------------

const CSV_HEADER: &str = "country,city,sales,price,active";
const CSV_ROWS: &[&str] = &[
    "France,Paris,50,1.5,true",
    "France,Lyon,15,2.0,false",
    "Japan,Tokyo,40,3.25,true",
    "France,Nice,35,,true",
    "Japan,Osaka,22,1.0,",
    "Japan,Kyoto,10,0.5,false",
];

fn create_test_csv() -> (tempfile::NamedTempFile, String) {
    let mut f = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(f, "{CSV_HEADER}").unwrap();
    for row in CSV_ROWS {
        writeln!(f, "{row}").unwrap();
    }
    f.flush().unwrap();
    let path = f.path().to_str().unwrap().to_string();
    (f, path)
}

fn load() -> (tempfile::NamedTempFile, DataFrame) {
    let (file, path) = create_test_csv();
    let df = read_csv(&path).unwrap();
    (file, df)
}

fn series(df: &DataFrame, name: &str) -> Series {
    df.column(name).unwrap().as_materialized_series().clone()
}

fn ints(df: &DataFrame, name: &str) -> Vec<i64> {
    series(df, name)
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

fn strs(df: &DataFrame, name: &str) -> Vec<String> {
    series(df, name)
        .str()
        .unwrap()
        .into_no_null_iter()
        .map(String::from)
        .collect()
}

fn apply(df: &DataFrame, stages: Vec<Stage>) -> PolarsResult<DataFrame> {
    stages
        .into_iter()
        .fold(df.clone().lazy(), |lf, stage| stage.apply(lf))
        .collect()
}

fn sort_by(name: &str, descending: bool, nulls_last: bool) -> Stage {
    Stage::Sort {
        by: vec![col(name)],
        options: SortMultipleOptions::default()
            .with_order_descending(descending)
            .with_nulls_last(nulls_last)
            .with_maintain_order(true),
    }
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

#[test]
fn read_csv_infers_types() {
    let (_f, df) = load();
    assert_eq!(df.height(), 6);
    assert_eq!(df.width(), 5);
    let schema = df.schema();
    assert_eq!(schema.get("country"), Some(&DataType::String));
    assert_eq!(schema.get("sales"), Some(&DataType::Int64));
    assert_eq!(schema.get("price"), Some(&DataType::Float64));
    assert_eq!(schema.get("active"), Some(&DataType::Boolean));
}

#[test]
fn read_csv_empty_fields_are_null() {
    let (_f, df) = load();
    assert_eq!(df.column("price").unwrap().null_count(), 1);
    assert_eq!(df.column("active").unwrap().null_count(), 1);
    assert_eq!(series(&df, "price").get(3).unwrap(), AnyValue::Null);
    assert_eq!(series(&df, "price").get(2).unwrap(), AnyValue::Float64(3.25));
}

#[test]
fn write_then_read_csv() {
    let (_f, mut df) = load();
    let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    write_csv(&mut df, out.path()).unwrap();
    let back = read_csv(out.path()).unwrap();
    assert_eq!(back.schema(), df.schema());
    assert!(back.equals_missing(&df));
}

#[test]
fn read_csv_missing_file() {
    let err = read_csv("/nonexistent/tabplan/data.csv").unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(!err.is_schema_error());
}

// ---------------------------------------------------------------------------
// Stages over lazy frames
// ---------------------------------------------------------------------------

#[test]
fn unknown_column_is_deferred_until_collect() {
    let (_f, df) = load();
    // Building the pipeline succeeds; collecting fails.
    let lazy = Stage::Select(vec![col("missing")]).apply(df.lazy());
    let err = Error::from(lazy.collect().unwrap_err());
    assert!(err.is_schema_error(), "{err}");
}

#[test]
fn no_stages_returns_source() {
    let (_f, df) = load();
    let out = apply(&df, vec![]).unwrap();
    assert!(out.equals_missing(&df));
}

#[test]
fn filter_sort_limit() {
    let (_f, df) = load();
    let out = apply(
        &df,
        vec![
            Stage::Filter(col("sales").gt(lit(12i64))),
            sort_by("sales", true, false),
            Stage::Limit(3),
        ],
    )
    .unwrap();
    assert_eq!(ints(&out, "sales"), vec![50, 40, 35]);
    assert_eq!(strs(&out, "city"), vec!["Paris", "Tokyo", "Nice"]);
}

#[test]
fn filter_drops_null_predicates() {
    let (_f, df) = load();
    let out = apply(&df, vec![Stage::Filter(col("active"))]).unwrap();
    assert_eq!(strs(&out, "city"), vec!["Paris", "Tokyo", "Nice"]);
}

#[test]
fn empty_sort_is_skipped() {
    let (_f, df) = load();
    let stage = Stage::Sort {
        by: vec![],
        options: SortMultipleOptions::default(),
    };
    let out = apply(&df, vec![stage]).unwrap();
    assert!(out.equals_missing(&df));
}

#[test]
fn sort_places_nulls() {
    let (_f, df) = load();
    let first = apply(&df, vec![sort_by("price", false, false)]).unwrap();
    assert_eq!(strs(&first, "city")[0], "Nice");

    let last = apply(&df, vec![sort_by("price", false, true)]).unwrap();
    let cities = strs(&last, "city");
    assert_eq!(cities[0], "Kyoto");
    assert_eq!(cities[5], "Nice");
}

#[test]
fn sort_is_stable_for_equal_keys() {
    let df = df!("k" => [1i64, 0, 1, 0], "tag" => ["a", "b", "c", "d"]).unwrap();
    let out = apply(&df, vec![sort_by("k", false, true)]).unwrap();
    assert_eq!(strs(&out, "tag"), vec!["b", "d", "a", "c"]);
}

#[test]
fn stable_group_by_keeps_first_seen_order() {
    let (_f, df) = load();
    let out = apply(
        &df,
        vec![Stage::GroupBy {
            keys: vec![col("country")],
            aggs: vec![col("sales").sum().alias("total")],
            maintain_order: true,
        }],
    )
    .unwrap();
    assert_eq!(strs(&out, "country"), vec!["France", "Japan"]);
    assert_eq!(ints(&out, "total"), vec![100, 72]);
}

#[test]
fn group_by_top_k_yields_lists() {
    let (_f, df) = load();
    let best = plan::expr::compile_expr(&plan::Expr::top_k(plan::Expr::col("sales"), 2)).unwrap();
    let out = apply(
        &df,
        vec![Stage::GroupBy {
            keys: vec![col("country")],
            aggs: vec![best.alias("best")],
            maintain_order: true,
        }],
    )
    .unwrap();
    let best = series(&out, "best");
    assert_eq!(best.dtype(), &DataType::List(Box::new(DataType::Int64)));
    let lists = best.list().unwrap();
    let row = |i: usize| -> Vec<i64> {
        lists
            .get_as_series(i)
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    };
    assert_eq!(row(0), vec![50, 35]);
    assert_eq!(row(1), vec![40, 22]);
}

#[test]
fn with_columns_replaces_in_place() {
    let (_f, df) = load();
    let out = apply(
        &df,
        vec![Stage::WithColumns(vec![
            (col("sales") * lit(2i64)).alias("sales"),
            lit("x").alias("tag"),
        ])],
    )
    .unwrap();
    let names: Vec<&str> = out.get_column_names().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, ["country", "city", "sales", "price", "active", "tag"]);
    assert_eq!(ints(&out, "sales")[0], 100);
}

#[test]
fn source_frame_is_not_mutated() {
    let source = df!("a" => [3i64, 1, 2]).unwrap();
    let sorted = apply(&source, vec![sort_by("a", false, true)]).unwrap();
    assert_eq!(ints(&sorted, "a"), vec![1, 2, 3]);
    assert_eq!(ints(&source, "a"), vec![3, 1, 2]);
}

#[test]
fn stages_display_for_logs() {
    assert_eq!(Stage::Limit(2).to_string(), "LIMIT 2");
    let text = Stage::Filter(col("active")).to_string();
    assert!(text.starts_with("FILTER "), "{text}");
    assert!(text.contains("active"), "{text}");
}

#[test]
fn explain_lists_stages() {
    let (_f, df) = load();
    let lazy = [Stage::Filter(col("active")), Stage::Limit(2)]
        .into_iter()
        .fold(df.lazy(), |lf, stage| stage.apply(lf));
    let text = lazy.explain(false).unwrap();
    assert!(text.contains("FILTER"), "{text}");
}

#[test]
fn polars_errors_route_through_engine_error() {
    let err: engine::Error = PolarsError::ColumnNotFound("missing".into()).into();
    assert!(err.is_schema_error());
    let err: engine::Error = PolarsError::ComputeError("overflow".into()).into();
    assert!(!err.is_schema_error());
}
