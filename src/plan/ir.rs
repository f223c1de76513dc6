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

//! Plan IR: expressions, named outputs, sort keys, ops and plans.
//!
//! Every type here is plain data with serde derives. The JSON form uses a
//! `kind` discriminator on expressions and an `op` discriminator on ops:
//!
//! ```json
//! {"ops": [{"op": "groupby_agg",
//!           "by": [{"kind": "col", "name": "city"}],
//!           "aggs": [{"expr": {"kind": "func", "name": "sum",
//!                              "args": [{"kind": "col", "name": "sales"}]},
//!                     "alias": "total_sales"}]}]}
//! ```

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{wire, PlanError};

// ---------------------------------------------------------------------------
// Literals and operators
// ---------------------------------------------------------------------------

/// A constant scalar carried by [`Expr::Lit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Bool(v)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(v as i64)
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Float(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Str(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Str(v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 2] = [UnaryOp::Not, UnaryOp::Neg];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "neg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 12] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Eq,
        BinaryOp::Neq,
        BinaryOp::Lt,
        BinaryOp::Lte,
        BinaryOp::Gt,
        BinaryOp::Gte,
        BinaryOp::And,
        BinaryOp::Or,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Eq => "eq",
            BinaryOp::Neq => "neq",
            BinaryOp::Lt => "lt",
            BinaryOp::Lte => "lte",
            BinaryOp::Gt => "gt",
            BinaryOp::Gte => "gte",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

fn default_k() -> i64 {
    5
}

fn default_true() -> bool {
    true
}

/// A closed expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Col {
        name: String,
    },
    Lit {
        value: Literal,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Call into the function registry; the name is matched case-insensitively.
    Func {
        name: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Up to `k` largest values of `expr`, largest first.
    #[serde(rename = "topk")]
    TopK {
        expr: Box<Expr>,
        #[serde(default = "default_k")]
        k: i64,
    },
    /// Up to `k` smallest values of `expr`, smallest first.
    #[serde(rename = "bottomk")]
    BottomK {
        expr: Box<Expr>,
        #[serde(default = "default_k")]
        k: i64,
    },
    /// First matching `(condition, value)` branch wins; `otherwise` defaults to null.
    WhenThenOtherwise {
        #[serde(default)]
        branches: Vec<(Expr, Expr)>,
        #[serde(default)]
        otherwise: Option<Box<Expr>>,
    },
}

impl Expr {
    pub fn col(name: impl Into<String>) -> Self {
        Expr::Col { name: name.into() }
    }

    pub fn lit(value: impl Into<Literal>) -> Self {
        Expr::Lit {
            value: value.into(),
        }
    }

    pub fn null() -> Self {
        Expr::Lit {
            value: Literal::Null,
        }
    }

    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Func {
            name: name.into(),
            args,
        }
    }

    pub fn top_k(expr: Expr, k: i64) -> Self {
        Expr::TopK {
            expr: Box::new(expr),
            k,
        }
    }

    pub fn bottom_k(expr: Expr, k: i64) -> Self {
        Expr::BottomK {
            expr: Box::new(expr),
            k,
        }
    }

    pub fn when(branches: Vec<(Expr, Expr)>, otherwise: Option<Expr>) -> Self {
        Expr::WhenThenOtherwise {
            branches,
            otherwise: otherwise.map(Box::new),
        }
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Gt, self, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Lt, self, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::And, self, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Or, self, other)
    }

    pub fn alias(self, name: impl Into<String>) -> NamedExpr {
        NamedExpr {
            expr: self,
            alias: Some(name.into()),
        }
    }

    /// Output column name when no alias is given. Follows the same rule the
    /// engine applies to the compiled column.
    pub fn default_name(&self) -> &str {
        match self {
            Expr::Col { name } => name.as_str(),
            Expr::Lit { .. } => "literal",
            Expr::Unary { expr, .. } | Expr::TopK { expr, .. } | Expr::BottomK { expr, .. } => {
                expr.default_name()
            }
            Expr::Binary { left, .. } => left.default_name(),
            // count() with no arguments lowers to the row-count primitive.
            Expr::Func { args, .. } => args.first().map_or("len", Expr::default_name),
            Expr::WhenThenOtherwise { branches, .. } => branches
                .first()
                .map_or("literal", |(_, then)| then.default_name()),
        }
    }
}

/// An expression with an optional output name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedExpr {
    pub expr: Expr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl NamedExpr {
    /// The alias when set and non-empty, else the expression's default name.
    pub fn output_name(&self) -> &str {
        match self.alias.as_deref() {
            Some(alias) if !alias.is_empty() => alias,
            _ => self.expr.default_name(),
        }
    }
}

impl From<Expr> for NamedExpr {
    fn from(expr: Expr) -> Self {
        NamedExpr { expr, alias: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub expr: Expr,
    #[serde(default)]
    pub descending: bool,
    #[serde(default = "default_true")]
    pub nulls_last: bool,
}

impl SortKey {
    pub fn asc(expr: Expr) -> Self {
        SortKey {
            expr,
            descending: false,
            nulls_last: true,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        SortKey {
            expr,
            descending: true,
            nulls_last: true,
        }
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls_last = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Ops
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Select {
    pub exprs: Vec<NamedExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithColumns {
    pub exprs: Vec<NamedExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub predicate: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    pub by: Vec<SortKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub n: i64,
}

/// Group rows by `by` (default-named) then `named_by` keys and aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupByAgg {
    #[serde(default)]
    pub by: Vec<Expr>,
    #[serde(default)]
    pub maintain_order: bool,
    #[serde(default)]
    pub named_by: IndexMap<String, Expr>,
    #[serde(default)]
    pub aggs: Vec<NamedExpr>,
    #[serde(default)]
    pub named_aggs: IndexMap<String, Expr>,
}

impl GroupByAgg {
    pub fn new() -> Self {
        GroupByAgg::default()
    }

    pub fn by(mut self, key: Expr) -> Self {
        self.by.push(key);
        self
    }

    pub fn named_by(mut self, name: impl Into<String>, key: Expr) -> Self {
        self.named_by.insert(name.into(), key);
        self
    }

    pub fn agg(mut self, agg: impl Into<NamedExpr>) -> Self {
        self.aggs.push(agg.into());
        self
    }

    pub fn named_agg(mut self, name: impl Into<String>, agg: Expr) -> Self {
        self.named_aggs.insert(name.into(), agg);
        self
    }

    pub fn maintain_order(mut self, maintain_order: bool) -> Self {
        self.maintain_order = maintain_order;
        self
    }
}

/// One relational transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Select(Select),
    WithColumns(WithColumns),
    Filter(Filter),
    Sort(Sort),
    Limit(Limit),
    #[serde(rename = "groupby_agg")]
    GroupByAgg(GroupByAgg),
}

impl Op {
    /// Names accepted in the `op` discriminator.
    pub const NAMES: [&'static str; 6] = [
        "select",
        "with_columns",
        "filter",
        "sort",
        "limit",
        "groupby_agg",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Op::Select(_) => "select",
            Op::WithColumns(_) => "with_columns",
            Op::Filter(_) => "filter",
            Op::Sort(_) => "sort",
            Op::Limit(_) => "limit",
            Op::GroupByAgg(_) => "groupby_agg",
        }
    }

    pub fn select(exprs: Vec<NamedExpr>) -> Self {
        Op::Select(Select { exprs })
    }

    pub fn with_columns(exprs: Vec<NamedExpr>) -> Self {
        Op::WithColumns(WithColumns { exprs })
    }

    pub fn filter(predicate: Expr) -> Self {
        Op::Filter(Filter { predicate })
    }

    pub fn sort(by: Vec<SortKey>) -> Self {
        Op::Sort(Sort { by })
    }

    pub fn limit(n: i64) -> Self {
        Op::Limit(Limit { n })
    }
}

impl From<GroupByAgg> for Op {
    fn from(op: GroupByAgg) -> Self {
        Op::GroupByAgg(op)
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// An ordered list of ops, applied left to right.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub ops: Vec<Op>,
}

impl Plan {
    pub fn new(ops: Vec<Op>) -> Self {
        Plan { ops }
    }

    /// Append an op, builder style.
    pub fn push(mut self, op: impl Into<Op>) -> Self {
        self.ops.push(op.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Decode a plan from JSON text.
    pub fn from_json(json: &str) -> Result<Plan, PlanError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| PlanError::validation("plan", e.to_string()))?;
        Plan::from_value(&value)
    }

    /// Decode a plan from a parsed JSON value.
    ///
    /// Unknown op names and operators are reported as
    /// [`PlanError::UnsupportedOperation`]; any other shape problem is a
    /// [`PlanError::Validation`].
    pub fn from_value(value: &serde_json::Value) -> Result<Plan, PlanError> {
        wire::check_plan(value)?;
        Plan::deserialize(value).map_err(|e| PlanError::validation("plan", e.to_string()))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

impl FromStr for Plan {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Plan::from_json(s)
    }
}

impl TryFrom<serde_json::Value> for Plan {
    type Error = PlanError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Plan::from_value(&value)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}
