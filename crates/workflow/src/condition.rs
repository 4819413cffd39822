// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Condition expression language
//!
//! A deliberately small boolean grammar evaluated against the run's
//! variable map:
//!
//! ```text
//! expr   := orExpr
//! orExpr := andExpr ('||' andExpr)*
//! andExpr:= unary   ('&&' unary)*
//! unary  := '!'* leaf
//! leaf   := '(' expr ')' | comparison | value
//! value  := number | 'quoted' | true|false|null|undefined | dot.path
//! ```
//!
//! No arithmetic, no method calls, no function application. Splitting on
//! `||`/`&&` and comparison operators is top-level only: parenthesis depth
//! and quoted strings are respected.
//!
//! Evaluation is falsy-on-missing: any error (unresolvable path coerced to
//! a number, malformed literal, unbalanced parens) makes the WHOLE
//! expression false rather than raising. Conditions routinely reference
//! fields that do not exist yet, e.g. `review.hasActionableIssues` before
//! the first review has run.

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

/// Evaluation failure. Never escapes [`evaluate`]; carried for diagnostics.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("empty operand")]
    EmptyOperand,
    #[error("unbalanced parentheses")]
    Unbalanced,
    #[error("operand is not numeric: {0}")]
    NotNumeric(String),
}

/// A resolved operand. `Undefined` (a missing path, or the `undefined`
/// keyword) is distinct from JSON `null`: the two compare equal loosely
/// but not strictly.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Undefined,
    Defined(Value),
}

/// Resolve a dot-notation path against the variable map.
///
/// Walks object keys only; any missing intermediate yields `None`.
pub fn resolve_path(vars: &IndexMap<String, Value>, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = vars.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current.clone())
}

/// Evaluate a condition expression. Errors evaluate to `false`.
pub fn evaluate(expr: &str, vars: &IndexMap<String, Value>) -> bool {
    eval_or(expr, vars).unwrap_or(false)
}

fn eval_or(expr: &str, vars: &IndexMap<String, Value>) -> Result<bool, EvalError> {
    let parts = split_top_level(expr, "||")?;
    if parts.len() > 1 {
        for part in parts {
            if eval_and(part, vars)? {
                return Ok(true);
            }
        }
        return Ok(false);
    }
    eval_and(expr, vars)
}

fn eval_and(expr: &str, vars: &IndexMap<String, Value>) -> Result<bool, EvalError> {
    let parts = split_top_level(expr, "&&")?;
    if parts.len() > 1 {
        for part in parts {
            if !eval_unary(part, vars)? {
                return Ok(false);
            }
        }
        return Ok(true);
    }
    eval_unary(expr, vars)
}

fn eval_unary(expr: &str, vars: &IndexMap<String, Value>) -> Result<bool, EvalError> {
    let mut rest = expr.trim();
    let mut negated = false;
    while let Some(stripped) = rest.strip_prefix('!') {
        // Guard: a leading "!=" is a malformed comparison, not a negation
        if stripped.starts_with('=') {
            return Err(EvalError::EmptyOperand);
        }
        negated = !negated;
        rest = stripped.trim_start();
    }
    if rest.is_empty() {
        return Err(EvalError::EmptyOperand);
    }
    let result = eval_leaf(rest, vars)?;
    Ok(if negated { !result } else { result })
}

fn eval_leaf(expr: &str, vars: &IndexMap<String, Value>) -> Result<bool, EvalError> {
    let trimmed = expr.trim();

    // Fully parenthesized group: recurse into the whole grammar
    if trimmed.starts_with('(') {
        if let Some(close) = matching_paren(trimmed) {
            if close == trimmed.len() - 1 {
                return eval_or(&trimmed[1..close], vars);
            }
        } else {
            return Err(EvalError::Unbalanced);
        }
    }

    if let Some((left, op, right)) = split_comparison(trimmed)? {
        let lhs = parse_operand(left, vars)?;
        let rhs = parse_operand(right, vars)?;
        return compare(&lhs, op, &rhs);
    }

    Ok(truthy(&parse_operand(trimmed, vars)?))
}

/// Comparison operators, longest-match-first so `===` wins over `==` and
/// `>=` over `>`.
const COMPARISON_OPS: &[&str] = &["===", "!==", ">=", "<=", "==", "!=", ">", "<"];

/// Find the first top-level comparison operator, splitting the expression
/// around it. Returns `None` when the expression is a bare value.
fn split_comparison(expr: &str) -> Result<Option<(&str, &str, &str)>, EvalError> {
    let bytes = expr.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                b'\'' | b'"' => quote = Some(c),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(EvalError::Unbalanced);
                    }
                }
                b'=' | b'!' | b'<' | b'>' if depth == 0 => {
                    for op in COMPARISON_OPS {
                        if expr[i..].starts_with(op) {
                            let left = expr[..i].trim();
                            let right = expr[i + op.len()..].trim();
                            if left.is_empty() || right.is_empty() {
                                return Err(EvalError::EmptyOperand);
                            }
                            return Ok(Some((left, op, right)));
                        }
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    Ok(None)
}

/// Split on a top-level `||` or `&&`, respecting parens and quotes.
fn split_top_level<'a>(expr: &'a str, sep: &str) -> Result<Vec<&'a str>, EvalError> {
    let bytes = expr.as_bytes();
    let sep_bytes = sep.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                b'\'' | b'"' => quote = Some(c),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(EvalError::Unbalanced);
                    }
                }
                _ if depth == 0
                    && c == sep_bytes[0]
                    && i + sep_bytes.len() <= bytes.len()
                    && &bytes[i..i + sep_bytes.len()] == sep_bytes =>
                {
                    parts.push(&expr[start..i]);
                    i += sep_bytes.len();
                    start = i;
                    continue;
                }
                _ => {}
            },
        }
        i += 1;
    }
    if depth != 0 {
        return Err(EvalError::Unbalanced);
    }
    parts.push(&expr[start..]);
    Ok(parts)
}

/// Index of the `)` matching the leading `(`, or `None` if unbalanced.
fn matching_paren(expr: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    for (i, c) in expr.bytes().enumerate() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                b'\'' | b'"' => quote = Some(c),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Parse a leaf token: literal keyword, quoted string, number, or dot-path.
fn parse_operand(token: &str, vars: &IndexMap<String, Value>) -> Result<Operand, EvalError> {
    let t = token.trim();
    if t.is_empty() {
        return Err(EvalError::EmptyOperand);
    }
    match t {
        "true" => return Ok(Operand::Defined(Value::Bool(true))),
        "false" => return Ok(Operand::Defined(Value::Bool(false))),
        "null" => return Ok(Operand::Defined(Value::Null)),
        "undefined" => return Ok(Operand::Undefined),
        _ => {}
    }
    if t.len() >= 2 {
        let first = t.as_bytes()[0];
        if (first == b'\'' || first == b'"') && t.as_bytes()[t.len() - 1] == first {
            return Ok(Operand::Defined(Value::String(t[1..t.len() - 1].to_string())));
        }
    }
    if looks_numeric(t) {
        if let Ok(n) = t.parse::<f64>() {
            return Ok(number_operand(n));
        }
    }
    Ok(match resolve_path(vars, t) {
        Some(value) => Operand::Defined(value),
        None => Operand::Undefined,
    })
}

/// Numeric literals only: integer or decimal with optional leading minus.
/// Everything else (including `1e3` or `.5`) is treated as a dot-path.
fn looks_numeric(t: &str) -> bool {
    let body = t.strip_prefix('-').unwrap_or(t);
    !body.is_empty()
        && body.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && body.bytes().filter(|b| *b == b'.').count() <= 1
        && !body.starts_with('.')
        && !body.ends_with('.')
}

fn number_operand(n: f64) -> Operand {
    match serde_json::Number::from_f64(n) {
        Some(num) => Operand::Defined(Value::Number(num)),
        None => Operand::Undefined,
    }
}

/// Standard truthiness: undefined, null, false, 0, and "" are falsy.
fn truthy(operand: &Operand) -> bool {
    match operand {
        Operand::Undefined => false,
        Operand::Defined(value) => match value {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        },
    }
}

fn compare(lhs: &Operand, op: &str, rhs: &Operand) -> Result<bool, EvalError> {
    match op {
        "==" => Ok(loose_eq(lhs, rhs)),
        "!=" => Ok(!loose_eq(lhs, rhs)),
        "===" => Ok(strict_eq(lhs, rhs)),
        "!==" => Ok(!strict_eq(lhs, rhs)),
        _ => {
            let l = to_number(lhs)?;
            let r = to_number(rhs)?;
            Ok(match op {
                ">" => l > r,
                "<" => l < r,
                ">=" => l >= r,
                "<=" => l <= r,
                // split_comparison only produces the ops above
                _ => false,
            })
        }
    }
}

/// Loose equality: numeric strings coerce against numbers, booleans coerce
/// to 1/0 against numbers, `null == undefined`. Same-type operands compare
/// structurally (numbers numerically).
fn loose_eq(lhs: &Operand, rhs: &Operand) -> bool {
    use Operand::{Defined, Undefined};
    match (lhs, rhs) {
        (Undefined, Undefined) => true,
        (Undefined, Defined(Value::Null)) | (Defined(Value::Null), Undefined) => true,
        (Undefined, _) | (_, Undefined) => false,
        (Defined(a), Defined(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => num_eq(x, y),
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Number(x), Value::String(y)) | (Value::String(y), Value::Number(x)) => {
                match y.trim().parse::<f64>() {
                    Ok(parsed) => x.as_f64().map(|f| f == parsed).unwrap_or(false),
                    Err(_) => false,
                }
            }
            (Value::Bool(x), Value::Number(y)) | (Value::Number(y), Value::Bool(x)) => {
                y.as_f64().map(|f| f == bool_num(*x)).unwrap_or(false)
            }
            (Value::Bool(x), Value::String(y)) | (Value::String(y), Value::Bool(x)) => {
                y.trim().parse::<f64>().map(|f| f == bool_num(*x)).unwrap_or(false)
            }
            _ => a == b,
        },
    }
}

/// Strict equality: distinct types never equal; numbers still compare
/// numerically so integer and float forms of the same value are equal.
fn strict_eq(lhs: &Operand, rhs: &Operand) -> bool {
    use Operand::{Defined, Undefined};
    match (lhs, rhs) {
        (Undefined, Undefined) => true,
        (Undefined, _) | (_, Undefined) => false,
        (Defined(Value::Number(x)), Defined(Value::Number(y))) => num_eq(x, y),
        (Defined(a), Defined(b)) => {
            std::mem::discriminant(a) == std::mem::discriminant(b) && a == b
        }
    }
}

fn num_eq(x: &serde_json::Number, y: &serde_json::Number) -> bool {
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => x == y,
    }
}

fn bool_num(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Ordering comparisons coerce both sides to a number; a side that cannot
/// coerce is an evaluation error (hence false overall).
fn to_number(operand: &Operand) -> Result<f64, EvalError> {
    match operand {
        Operand::Undefined => Err(EvalError::NotNumeric("undefined".to_string())),
        Operand::Defined(value) => match value {
            Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| EvalError::NotNumeric(n.to_string())),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| EvalError::NotNumeric(s.clone())),
            Value::Bool(b) => Ok(bool_num(*b)),
            other => Err(EvalError::NotNumeric(other.to_string())),
        },
    }
}

/// Statically validate an expression without evaluating it.
///
/// Returns every structural problem found; an empty list means the
/// expression is well-formed. Run at definition-load time over every
/// `condition` and `failWhen` so typo-level mistakes surface before a run
/// starts instead of silently evaluating false.
pub fn validate(expr: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        errors.push("expression is empty".to_string());
        return errors;
    }

    // Parenthesis balance, both directions
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    for c in trimmed.bytes() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                b'\'' | b'"' => quote = Some(c),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth < 0 {
                        errors.push("unbalanced parentheses: unexpected ')'".to_string());
                        depth = 0;
                    }
                }
                _ => {}
            },
        }
    }
    if depth > 0 {
        errors.push("unbalanced parentheses: missing ')'".to_string());
    }

    // Operand shape around '||' and '&&' (scanned outside quotes at any
    // depth so it still reports on unbalanced input)
    for operand in split_logical_operands(trimmed) {
        let op = operand.trim();
        if op.is_empty() {
            errors.push("empty operand next to '||' or '&&'".to_string());
        } else if op.bytes().all(|b| b == b'!') {
            errors.push(format!("operand '{op}' has no value to negate"));
        }
    }

    errors
}

/// Split on every `||`/`&&` occurrence outside quotes, ignoring depth.
fn split_logical_operands(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let mut quote: Option<u8> = None;
    let mut parts = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == b'\'' || c == b'"' {
                    quote = Some(c);
                } else if (c == b'|' || c == b'&')
                    && i + 1 < bytes.len()
                    && bytes[i + 1] == c
                {
                    parts.push(&expr[start..i]);
                    i += 2;
                    start = i;
                    continue;
                }
            }
        }
        i += 1;
    }
    parts.push(&expr[start..]);
    parts
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
