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

//! The fixed function registry used by [`Expr::Func`](super::Expr::Func).

use std::fmt;

use polars::prelude as pl;

use super::PlanError;

/// Number of arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    /// Inclusive bounds.
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exactly(k) => n == k,
            Arity::Range(lo, hi) => (lo..=hi).contains(&n),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Arity::Exactly(k) => write!(f, "{k}"),
            Arity::Range(lo, hi) if hi == lo + 1 => write!(f, "{lo} or {hi}"),
            Arity::Range(lo, hi) => write!(f, "{lo} to {hi}"),
        }
    }
}

/// The polars primitive a function lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lowering {
    Sum,
    Mean,
    Min,
    Max,
    /// Non-null count of the argument, or the row count without one.
    Count,
    NUnique,
    First,
    Last,
    Abs,
    Round,
    Lower,
    Upper,
}

/// A registry entry.
#[derive(Debug, Clone, Copy)]
pub struct FunctionDef {
    pub name: &'static str,
    pub arity: Arity,
    lowering: Lowering,
}

impl FunctionDef {
    /// True for functions whose argument must be a string column.
    pub fn takes_string(&self) -> bool {
        matches!(self.lowering, Lowering::Lower | Lowering::Upper)
    }
}

const fn def(name: &'static str, arity: Arity, lowering: Lowering) -> FunctionDef {
    FunctionDef {
        name,
        arity,
        lowering,
    }
}

pub static FUNCTIONS: &[FunctionDef] = &[
    def("sum", Arity::Exactly(1), Lowering::Sum),
    def("mean", Arity::Exactly(1), Lowering::Mean),
    def("avg", Arity::Exactly(1), Lowering::Mean),
    def("min", Arity::Exactly(1), Lowering::Min),
    def("max", Arity::Exactly(1), Lowering::Max),
    def("count", Arity::Range(0, 1), Lowering::Count),
    def("n_unique", Arity::Exactly(1), Lowering::NUnique),
    def("first", Arity::Exactly(1), Lowering::First),
    def("last", Arity::Exactly(1), Lowering::Last),
    def("abs", Arity::Exactly(1), Lowering::Abs),
    // A decimals argument parses but is rejected when lowered.
    def("round", Arity::Range(1, 2), Lowering::Round),
    def("lower", Arity::Exactly(1), Lowering::Lower),
    def("upper", Arity::Exactly(1), Lowering::Upper),
];

/// Trim and lowercase a function name as written in a plan.
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Find a function by its normalized (trimmed, lowercase) name.
pub fn lookup(name: &str) -> Option<&'static FunctionDef> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

/// Registered function names, in registry order.
pub fn function_names() -> impl Iterator<Item = &'static str> {
    FUNCTIONS.iter().map(|f| f.name)
}

/// Lower a call to a polars expression. `name` is normalized here.
pub(crate) fn lower_call(name: &str, args: Vec<pl::Expr>) -> Result<pl::Expr, PlanError> {
    let name = normalize(name);
    let def = lookup(&name)
        .ok_or_else(|| PlanError::UnsupportedOperation(format!("unknown function `{name}`")))?;
    let found = args.len();
    if !def.arity.accepts(found) {
        return Err(PlanError::InvalidArity {
            function: name,
            expected: def.arity,
            found,
        });
    }
    let mut args = args.into_iter();
    let Some(arg) = args.next() else {
        // Only count() accepts no arguments.
        return Ok(pl::len());
    };
    Ok(match def.lowering {
        Lowering::Sum => arg.sum(),
        Lowering::Mean => arg.mean(),
        Lowering::Min => arg.min(),
        Lowering::Max => arg.max(),
        Lowering::Count => arg.count(),
        Lowering::NUnique => arg.n_unique(),
        Lowering::First => arg.first(),
        Lowering::Last => arg.last(),
        Lowering::Abs => arg.abs(),
        Lowering::Round if found > 1 => {
            return Err(PlanError::UnsupportedOperation(
                "round supports a single argument (rounding to 0 decimals)".to_string(),
            ))
        }
        Lowering::Round => arg.round(0),
        Lowering::Lower => arg.str().to_lowercase(),
        Lowering::Upper => arg.str().to_uppercase(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::col;

    #[test]
    fn names_are_normalized() {
        let e = lower_call("  SUM ", vec![col("x")]).unwrap();
        assert_eq!(e, col("x").sum());
        let e = lower_call("Avg", vec![col("x")]).unwrap();
        assert_eq!(e, col("x").mean());
    }

    #[test]
    fn count_without_args_is_row_count() {
        assert_eq!(lower_call("count", vec![]).unwrap(), pl::len());
        assert_eq!(lower_call("count", vec![col("x")]).unwrap(), col("x").count());
    }

    #[test]
    fn arity_errors() {
        let err = lower_call("sum", vec![]).unwrap_err();
        assert!(matches!(
            err,
            PlanError::InvalidArity { ref function, expected: Arity::Exactly(1), found: 0 } if function == "sum"
        ));
        assert_eq!(err.to_string(), "sum() expects 1 argument(s), got 0");
        let err = lower_call("count", vec![col("a"), col("b")]).unwrap_err();
        assert_eq!(err.to_string(), "count() expects 0 or 1 argument(s), got 2");
    }

    #[test]
    fn round_with_decimals_is_unsupported() {
        let err = lower_call("round", vec![col("x"), pl::lit(2i64)]).unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedOperation(msg) if msg.contains("round")));
        assert_eq!(lower_call("round", vec![col("x")]).unwrap(), col("x").round(0));
    }

    #[test]
    fn unknown_function() {
        let err = lower_call("median", vec![col("x")]).unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedOperation(_)));
    }

    #[test]
    fn registry_lists_every_name_once() {
        let names: Vec<_> = function_names().collect();
        let mut dedup = names.clone();
        dedup.sort_unstable();
        dedup.dedup();
        assert_eq!(names.len(), dedup.len());
        assert!(names.contains(&"n_unique"));
        assert!(lookup("upper").is_some_and(FunctionDef::takes_string));
        assert!(!lookup("sum").is_some_and(FunctionDef::takes_string));
    }
}
