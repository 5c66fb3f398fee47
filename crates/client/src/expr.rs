//! Shorthand constructors for building logical expressions by hand.

use quarry_planner::{AggregateFunction, BinaryOp, LiteralValue, LogicalExpr};

/// Column reference by name.
pub fn col(name: &str) -> LogicalExpr {
    LogicalExpr::Column(name.to_string())
}

/// Int64 literal.
pub fn lit_i64(v: i64) -> LogicalExpr {
    LogicalExpr::Literal(LiteralValue::Int64(v))
}

/// Float64 literal.
pub fn lit_f64(v: f64) -> LogicalExpr {
    LogicalExpr::Literal(LiteralValue::Float64(v))
}

/// Boolean literal.
pub fn lit_bool(v: bool) -> LogicalExpr {
    LogicalExpr::Literal(LiteralValue::Boolean(v))
}

/// String literal.
pub fn lit_str(v: &str) -> LogicalExpr {
    LogicalExpr::Literal(LiteralValue::Utf8(v.to_string()))
}

fn binary(left: LogicalExpr, op: BinaryOp, right: LogicalExpr) -> LogicalExpr {
    LogicalExpr::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// `left = right`.
pub fn eq(left: LogicalExpr, right: LogicalExpr) -> LogicalExpr {
    binary(left, BinaryOp::Eq, right)
}

/// `left > right`.
pub fn gt(left: LogicalExpr, right: LogicalExpr) -> LogicalExpr {
    binary(left, BinaryOp::Gt, right)
}

/// `left < right`.
pub fn lt(left: LogicalExpr, right: LogicalExpr) -> LogicalExpr {
    binary(left, BinaryOp::Lt, right)
}

/// `left AND right`.
pub fn and(left: LogicalExpr, right: LogicalExpr) -> LogicalExpr {
    binary(left, BinaryOp::And, right)
}

/// `left OR right`.
pub fn or(left: LogicalExpr, right: LogicalExpr) -> LogicalExpr {
    binary(left, BinaryOp::Or, right)
}

/// `expr AS name`.
pub fn alias(expr: LogicalExpr, name: &str) -> LogicalExpr {
    LogicalExpr::Alias {
        expr: Box::new(expr),
        name: name.to_string(),
    }
}

fn aggregate(func: AggregateFunction, expr: LogicalExpr) -> LogicalExpr {
    LogicalExpr::Aggregate {
        func,
        expr: Box::new(expr),
    }
}

/// `SUM(expr)`.
pub fn sum(expr: LogicalExpr) -> LogicalExpr {
    aggregate(AggregateFunction::Sum, expr)
}

/// `MIN(expr)`.
pub fn min(expr: LogicalExpr) -> LogicalExpr {
    aggregate(AggregateFunction::Min, expr)
}

/// `MAX(expr)`.
pub fn max(expr: LogicalExpr) -> LogicalExpr {
    aggregate(AggregateFunction::Max, expr)
}

/// `AVG(expr)`.
pub fn avg(expr: LogicalExpr) -> LogicalExpr {
    aggregate(AggregateFunction::Avg, expr)
}

/// `COUNT(expr)`.
pub fn count(expr: LogicalExpr) -> LogicalExpr {
    aggregate(AggregateFunction::Count, expr)
}
