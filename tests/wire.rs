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

//! JSON wire format: decoding, defaults, round trips and decode errors.

use serde_json::json;

use tabplan::plan::{BinaryOp, Literal, UnaryOp};
use tabplan::polars::df;
use tabplan::polars::prelude::DataFrame;
use tabplan::{execute_json, execute_value, Expr, GroupByAgg, Op, Plan, PlanError, SortKey};

fn sales() -> DataFrame {
    df!(
        "city" => ["Seoul", "Paris", "Seoul"],
        "sales" => [30i64, 50, 20],
    )
    .unwrap()
}

const GROUP_PLAN: &str = r#"{
  "ops": [
    {
      "op": "groupby_agg",
      "by": [{"kind": "col", "name": "city"}],
      "aggs": [
        {
          "expr": {"kind": "func", "name": "sum", "args": [{"kind": "col", "name": "sales"}]},
          "alias": "total_sales"
        }
      ]
    },
    {"op": "sort", "by": [{"expr": {"kind": "col", "name": "city"}}]}
  ]
}"#;

#[test]
fn decodes_and_executes_json() {
    let out = execute_json(sales(), GROUP_PLAN).unwrap().collect().unwrap();
    let expected = df!(
        "city" => ["Paris", "Seoul"],
        "total_sales" => [50i64, 50],
    )
    .unwrap();
    assert!(out.equals_missing(&expected), "{out}");
}

#[test]
fn missing_fields_take_defaults() {
    let plan: Plan = GROUP_PLAN.parse().unwrap();
    let Op::GroupByAgg(group) = &plan.ops[0] else {
        panic!("expected groupby_agg, got {}", plan.ops[0].name());
    };
    assert!(!group.maintain_order);
    assert!(group.named_by.is_empty());
    assert!(group.named_aggs.is_empty());

    let Op::Sort(sort) = &plan.ops[1] else {
        panic!("expected sort");
    };
    assert!(!sort.by[0].descending);
    assert!(sort.by[0].nulls_last);

    let plan = Plan::from_value(&json!({
        "ops": [{"op": "select", "exprs": [
            {"expr": {"kind": "topk", "expr": {"kind": "col", "name": "sales"}}},
            {"expr": {"kind": "func", "name": "count"}, "alias": "n"}
        ]}]
    }))
    .unwrap();
    let Op::Select(select) = &plan.ops[0] else {
        panic!("expected select");
    };
    assert!(matches!(select.exprs[0].expr, Expr::TopK { k: 5, .. }));
    assert_eq!(select.exprs[0].alias, None);
    assert!(matches!(&select.exprs[1].expr, Expr::Func { args, .. } if args.is_empty()));
}

#[test]
fn literals_keep_their_type() {
    let plan = Plan::from_value(&json!({
        "ops": [{"op": "select", "exprs": [
            {"expr": {"kind": "lit", "value": 3}, "alias": "i"},
            {"expr": {"kind": "lit", "value": 2.5}, "alias": "f"},
            {"expr": {"kind": "lit", "value": "x"}, "alias": "s"},
            {"expr": {"kind": "lit", "value": true}, "alias": "b"},
            {"expr": {"kind": "lit", "value": null}, "alias": "n"}
        ]}]
    }))
    .unwrap();
    let Op::Select(select) = &plan.ops[0] else {
        panic!("expected select");
    };
    let literals: Vec<&Literal> = select
        .exprs
        .iter()
        .map(|named| match &named.expr {
            Expr::Lit { value } => value,
            other => panic!("expected literal, got {other:?}"),
        })
        .collect();
    assert_eq!(
        literals,
        [
            &Literal::Int(3),
            &Literal::Float(2.5),
            &Literal::Str("x".into()),
            &Literal::Bool(true),
            &Literal::Null,
        ]
    );
}

#[test]
fn round_trip_through_json() {
    let plan = Plan::default()
        .push(Op::filter(
            Expr::col("sales")
                .gt(Expr::lit(10))
                .or(Expr::unary(UnaryOp::Not, Expr::col("flag"))),
        ))
        .push(Op::with_columns(vec![Expr::when(
            vec![(Expr::col("sales").lt(Expr::lit(25.5)), Expr::lit("low"))],
            Some(Expr::null()),
        )
        .alias("band")]))
        .push(
            GroupByAgg::new()
                .by(Expr::col("city"))
                .named_by("upper_city", Expr::func("upper", vec![Expr::col("city")]))
                .agg(Expr::bottom_k(Expr::col("sales"), 3).alias("low3"))
                .named_agg("n", Expr::func("count", vec![]))
                .maintain_order(true),
        )
        .push(Op::sort(vec![SortKey::desc(Expr::col("n")).nulls_first()]))
        .push(Op::limit(10));

    let text = plan.to_json().unwrap();
    assert_eq!(Plan::from_json(&text).unwrap(), plan);
    let value = plan.to_value().unwrap();
    assert_eq!(Plan::try_from(value).unwrap(), plan);
    assert_eq!(plan.to_string(), text);
}

/// Every op, operator and literal shape survives encode then decode.
#[test]
fn round_trip_covers_every_variant() {
    let literals = [
        Literal::Null,
        Literal::Bool(true),
        Literal::Bool(false),
        Literal::Int(-7),
        Literal::Float(2.0),
        Literal::Float(-0.25),
        Literal::Str("2.0".into()),
    ];
    let mut exprs: Vec<Expr> = literals
        .iter()
        .map(|value| Expr::Lit {
            value: value.clone(),
        })
        .collect();
    exprs.extend(UnaryOp::ALL.iter().map(|&op| Expr::unary(op, Expr::col("a"))));
    exprs.extend(
        BinaryOp::ALL
            .iter()
            .map(|&op| Expr::binary(op, Expr::col("a"), Expr::lit(2.0))),
    );
    exprs.push(Expr::func("round", vec![Expr::col("a")]));
    exprs.push(Expr::top_k(Expr::col("a"), 3));
    exprs.push(Expr::bottom_k(Expr::col("a"), 1));
    exprs.push(Expr::when(
        vec![(Expr::col("b"), Expr::lit(1)), (Expr::lit(false), Expr::lit(2.0))],
        None,
    ));
    let named: Vec<_> = exprs
        .into_iter()
        .enumerate()
        .map(|(i, e)| e.alias(format!("e{i}")))
        .collect();

    let plan = Plan::new(vec![
        Op::select(named.clone()),
        Op::with_columns(named),
        Op::filter(Expr::col("b")),
        Op::sort(vec![SortKey::asc(Expr::col("a")), SortKey::desc(Expr::col("c")).nulls_first()]),
        Op::limit(0),
        GroupByAgg::new()
            .by(Expr::col("k"))
            .named_by("k2", Expr::col("c"))
            .agg(Expr::func("mean", vec![Expr::col("a")]).alias("m"))
            .named_agg("n", Expr::func("count", vec![]))
            .maintain_order(true)
            .into(),
    ]);
    let names: Vec<&str> = plan.ops.iter().map(Op::name).collect();
    assert_eq!(names, Op::NAMES);

    let text = plan.to_json().unwrap();
    let back = Plan::from_json(&text).unwrap();
    assert_eq!(back, plan, "{text}");
    assert_eq!(Plan::try_from(plan.to_value().unwrap()).unwrap(), plan);

    // Integral floats stay floats, strings that look numeric stay strings.
    let Op::Select(select) = &back.ops[0] else {
        panic!("expected select");
    };
    assert_eq!(
        select.exprs[4].expr,
        Expr::Lit {
            value: Literal::Float(2.0)
        }
    );
    assert_eq!(
        select.exprs[6].expr,
        Expr::Lit {
            value: Literal::Str("2.0".into())
        }
    );
}

#[test]
fn named_maps_keep_insertion_order() {
    let group = GroupByAgg::new()
        .by(Expr::col("k"))
        .named_agg("zeta", Expr::func("count", vec![]))
        .named_agg("alpha", Expr::func("sum", vec![Expr::col("v")]));
    let json = Plan::default().push(group).to_json().unwrap();
    let zeta = json.find("\"zeta\"").unwrap();
    let alpha = json.find("\"alpha\"").unwrap();
    assert!(zeta < alpha, "{json}");
}

#[test]
fn unknown_op_is_unsupported() {
    let err = Plan::from_value(&json!({"ops": [{"op": "join", "on": "id"}]})).unwrap_err();
    match err {
        PlanError::UnsupportedOperation(msg) => {
            assert!(msg.contains("`join`"), "{msg}");
            assert!(msg.contains("ops[0]"), "{msg}");
        }
        other => panic!("expected unsupported operation, got {other}"),
    }
}

#[test]
fn unknown_operators_are_unsupported() {
    let err = Plan::from_value(&json!({"ops": [{"op": "filter", "predicate": {
        "kind": "binary", "op": "like",
        "left": {"kind": "col", "name": "city"},
        "right": {"kind": "lit", "value": "S%"}
    }}]}))
    .unwrap_err();
    assert!(
        matches!(&err, PlanError::UnsupportedOperation(m) if m.contains("ops[0].predicate.op")),
        "{err}"
    );

    let err = Plan::from_value(&json!({"ops": [{"op": "select", "exprs": [
        {"expr": {"kind": "unary", "op": "sqrt", "expr": {"kind": "col", "name": "sales"}}}
    ]}]}))
    .unwrap_err();
    assert!(matches!(err, PlanError::UnsupportedOperation(_)), "{err}");
}

#[test]
fn unknown_kind_is_validation_error() {
    let err = Plan::from_value(&json!({"ops": [{"op": "sort", "by": [
        {"expr": {"kind": "window", "name": "sales"}}
    ]}]}))
    .unwrap_err();
    assert!(
        matches!(&err, PlanError::Validation { path, .. } if path == "ops[0].by[0].expr.kind"),
        "{err}"
    );
}

#[test]
fn malformed_json_is_validation_error() {
    let cases = [
        "{",
        "[]",
        r#"{"ops": [{"op": "limit"}]}"#,
        r#"{"ops": [{"op": "limit", "n": "5"}]}"#,
    ];
    for text in cases {
        let err = Plan::from_json(text).unwrap_err();
        assert!(matches!(err, PlanError::Validation { .. }), "{text}: {err}");
        assert!(err.is_rejection());
    }
}

#[test]
fn execute_value_validates_on_entry() {
    let err = execute_value(sales(), &json!({"ops": [{"op": "limit", "n": -1}]})).err().unwrap();
    assert!(
        matches!(&err, PlanError::Validation { path, .. } if path == "ops[0].n"),
        "{err}"
    );
}

#[test]
fn empty_alias_falls_back_to_default_name() {
    let out = execute_value(
        sales(),
        &json!({"ops": [{"op": "select", "exprs": [
            {"expr": {"kind": "col", "name": "sales"}, "alias": ""}
        ]}]}),
    )
    .unwrap()
    .collect()
    .unwrap();
    assert_eq!(out.get_column_names()[0].as_str(), "sales");
}
