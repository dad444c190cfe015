//! Read-only evaluation of compiled expressions.
//!
//! Tree-walking evaluation against a paused frame's scope. Every operation
//! here is a pure read over the mirrored values: there is no assignment, no
//! call dispatch, and accessor slots fail before any user code could run.
//! Coercions follow the guest language (loose equality, string
//! concatenation, NaN-propagating arithmetic).

use thiserror::Error;

use crate::ast::{BinaryOp, Expr, ExprKind, LogicalOp, UnaryOp};
use crate::host::{HostFrame, NamedValue};
use crate::value::{ObjectData, PropertySlot, Value};

use std::rc::Rc;

/// Evaluation failure; surfaces as a per-expression error status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct EvalError {
    /// Human-readable description.
    pub message: String,
}

impl EvalError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Read-only view of the names visible at a break: the innermost frame's
/// locals and arguments, then the host globals.
pub struct Scope<'a> {
    frame: Option<&'a HostFrame>,
    globals: &'a [NamedValue],
}

impl<'a> Scope<'a> {
    /// Scope over a frame plus globals.
    pub fn new(frame: Option<&'a HostFrame>, globals: &'a [NamedValue]) -> Self {
        Self { frame, globals }
    }

    /// Scope with no bindings (tests, logpoint-only captures).
    pub fn empty() -> Self {
        Self {
            frame: None,
            globals: &[],
        }
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(frame) = self.frame {
            if let Some(nv) = frame.locals.iter().find(|nv| nv.name == name) {
                return Some(nv.value.clone());
            }
            if let Some(nv) = frame.arguments.iter().find(|nv| nv.name == name) {
                return Some(nv.value.clone());
            }
        }
        self.globals
            .iter()
            .find(|nv| nv.name == name)
            .map(|nv| nv.value.clone())
    }

    fn this(&self) -> Value {
        self.frame
            .and_then(|f| f.this.clone())
            .unwrap_or(Value::Undefined)
    }
}

/// Evaluate a validated expression in the given scope.
pub fn evaluate(expr: &Expr, scope: &Scope<'_>) -> Result<Value, EvalError> {
    match &expr.kind {
        ExprKind::Number(n) => Ok(Value::Number(*n)),
        ExprKind::String(s) => Ok(Value::string(s.clone())),
        ExprKind::Bool(b) => Ok(Value::Bool(*b)),
        ExprKind::Null => Ok(Value::Null),
        ExprKind::Undefined => Ok(Value::Undefined),
        ExprKind::This => Ok(scope.this()),
        ExprKind::Ident(name) => scope
            .lookup(name)
            .ok_or_else(|| EvalError::new(format!("{name} is not defined"))),
        ExprKind::Array(elements) => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(evaluate(element, scope)?);
            }
            Ok(Value::array(values))
        }
        ExprKind::Object(properties) => {
            let data = ObjectData::new();
            for (key, value_expr) in properties {
                data.set(key.as_name(), evaluate(value_expr, scope)?);
            }
            Ok(Value::Object(Rc::new(data)))
        }
        ExprKind::Member { object, property } => {
            let value = evaluate(object, scope)?;
            member_access(&value, property)
        }
        ExprKind::Index { object, index } => {
            let value = evaluate(object, scope)?;
            let subscript = evaluate(index, scope)?;
            index_access(&value, &subscript)
        }
        ExprKind::Unary { op, operand } => eval_unary(*op, operand, scope),
        ExprKind::Binary { op, left, right } => {
            let lhs = evaluate(left, scope)?;
            let rhs = evaluate(right, scope)?;
            eval_binary(*op, &lhs, &rhs)
        }
        ExprKind::Logical { op, left, right } => {
            let lhs = evaluate(left, scope)?;
            match op {
                LogicalOp::And if !lhs.is_truthy() => Ok(lhs),
                LogicalOp::Or if lhs.is_truthy() => Ok(lhs),
                _ => evaluate(right, scope),
            }
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if evaluate(test, scope)?.is_truthy() {
                evaluate(consequent, scope)
            } else {
                evaluate(alternate, scope)
            }
        }
        ExprKind::Sequence(parts) => {
            let mut last = Value::Undefined;
            for part in parts {
                last = evaluate(part, scope)?;
            }
            Ok(last)
        }
        // The validator rejects these; refusing here keeps evaluation
        // read-only even if the whitelist is ever relaxed.
        ExprKind::Assign { .. } | ExprKind::Update { .. } => {
            Err(EvalError::new("mutation is not allowed in a debugger expression"))
        }
        ExprKind::Call { .. } | ExprKind::New { .. } => {
            Err(EvalError::new("calls are not allowed in a debugger expression"))
        }
        ExprKind::Function | ExprKind::Arrow => {
            Err(EvalError::new("functions are not allowed in a debugger expression"))
        }
    }
}

// ── Property access ──────────────────────────────────────────────────────────

fn member_access(value: &Value, name: &str) -> Result<Value, EvalError> {
    match value {
        Value::Null => Err(EvalError::new(format!(
            "Cannot read property '{name}' of null"
        ))),
        Value::Undefined => Err(EvalError::new(format!(
            "Cannot read property '{name}' of undefined"
        ))),
        Value::Object(data) => match data.lookup(name) {
            Some(property) => match property.slot {
                PropertySlot::Data(value) => Ok(value),
                PropertySlot::Accessor => Err(EvalError::new(format!(
                    "property '{name}' is backed by a getter and was not evaluated"
                ))),
            },
            None => Ok(Value::Undefined),
        },
        Value::Array(elements) => {
            if name == "length" {
                return Ok(Value::Number(elements.borrow().len() as f64));
            }
            match name.parse::<usize>() {
                Ok(index) => Ok(elements
                    .borrow()
                    .get(index)
                    .cloned()
                    .unwrap_or(Value::Undefined)),
                Err(_) => Ok(Value::Undefined),
            }
        }
        Value::String(s) => {
            if name == "length" {
                return Ok(Value::Number(s.chars().count() as f64));
            }
            Ok(Value::Undefined)
        }
        Value::Bool(_) | Value::Number(_) | Value::Function(_) => Ok(Value::Undefined),
    }
}

fn index_access(value: &Value, subscript: &Value) -> Result<Value, EvalError> {
    let key = subscript
        .render_scalar()
        .ok_or_else(|| EvalError::new("subscript must be a primitive"))?;
    member_access(value, &key)
}

// ── Operators ────────────────────────────────────────────────────────────────

fn eval_unary(op: UnaryOp, operand: &Expr, scope: &Scope<'_>) -> Result<Value, EvalError> {
    // `typeof missing` reports "undefined" instead of failing the lookup
    if op == UnaryOp::Typeof {
        if let ExprKind::Ident(name) = &operand.kind {
            if scope.lookup(name).is_none() {
                return Ok(Value::string("undefined"));
            }
        }
    }
    let value = evaluate(operand, scope)?;
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => Ok(Value::Number(-to_number(&value)?)),
        UnaryOp::Plus => Ok(Value::Number(to_number(&value)?)),
        UnaryOp::BitNot => Ok(Value::Number(!(to_int32(&value)?) as f64)),
        UnaryOp::Typeof => Ok(Value::string(value.typeof_name())),
        UnaryOp::Void => Ok(Value::Undefined),
        UnaryOp::Delete => Err(EvalError::new(
            "mutation is not allowed in a debugger expression",
        )),
    }
}

fn eval_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => {
            if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) {
                let left = lhs
                    .render_scalar()
                    .ok_or_else(|| EvalError::new("cannot concatenate an object"))?;
                let right = rhs
                    .render_scalar()
                    .ok_or_else(|| EvalError::new("cannot concatenate an object"))?;
                Ok(Value::string(left + &right))
            } else {
                Ok(Value::Number(to_number(lhs)? + to_number(rhs)?))
            }
        }
        BinaryOp::Sub => Ok(Value::Number(to_number(lhs)? - to_number(rhs)?)),
        BinaryOp::Mul => Ok(Value::Number(to_number(lhs)? * to_number(rhs)?)),
        BinaryOp::Div => Ok(Value::Number(to_number(lhs)? / to_number(rhs)?)),
        BinaryOp::Mod => Ok(Value::Number(to_number(lhs)? % to_number(rhs)?)),
        BinaryOp::Eq => Ok(Value::Bool(loose_equals(lhs, rhs)?)),
        BinaryOp::NotEq => Ok(Value::Bool(!loose_equals(lhs, rhs)?)),
        BinaryOp::StrictEq => Ok(Value::Bool(strict_equals(lhs, rhs))),
        BinaryOp::StrictNotEq => Ok(Value::Bool(!strict_equals(lhs, rhs))),
        BinaryOp::Less => compare(lhs, rhs, |o| o == std::cmp::Ordering::Less),
        BinaryOp::LessEq => compare(lhs, rhs, |o| o != std::cmp::Ordering::Greater),
        BinaryOp::Greater => compare(lhs, rhs, |o| o == std::cmp::Ordering::Greater),
        BinaryOp::GreaterEq => compare(lhs, rhs, |o| o != std::cmp::Ordering::Less),
        BinaryOp::BitAnd => Ok(Value::Number((to_int32(lhs)? & to_int32(rhs)?) as f64)),
        BinaryOp::BitOr => Ok(Value::Number((to_int32(lhs)? | to_int32(rhs)?) as f64)),
        BinaryOp::BitXor => Ok(Value::Number((to_int32(lhs)? ^ to_int32(rhs)?) as f64)),
        BinaryOp::Shl => Ok(Value::Number(
            (to_int32(lhs)?.wrapping_shl(to_uint32(rhs)? & 31)) as f64,
        )),
        BinaryOp::Shr => Ok(Value::Number(
            (to_int32(lhs)?.wrapping_shr(to_uint32(rhs)? & 31)) as f64,
        )),
        BinaryOp::UShr => Ok(Value::Number(
            (to_uint32(lhs)?.wrapping_shr(to_uint32(rhs)? & 31)) as f64,
        )),
        BinaryOp::In => {
            let key = lhs
                .render_scalar()
                .ok_or_else(|| EvalError::new("`in` key must be a primitive"))?;
            match rhs {
                Value::Object(data) => Ok(Value::Bool(data.lookup(&key).is_some())),
                Value::Array(elements) => {
                    let present = key == "length"
                        || key
                            .parse::<usize>()
                            .is_ok_and(|i| i < elements.borrow().len());
                    Ok(Value::Bool(present))
                }
                _ => Err(EvalError::new("`in` requires an object operand")),
            }
        }
        BinaryOp::Instanceof => Err(EvalError::new(
            "instanceof is not supported in a debugger expression",
        )),
    }
}

fn compare(
    lhs: &Value,
    rhs: &Value,
    accept: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, EvalError> {
    if let (Value::String(a), Value::String(b)) = (lhs, rhs) {
        return Ok(Value::Bool(accept(a.as_str().cmp(b.as_str()))));
    }
    let a = to_number(lhs)?;
    let b = to_number(rhs)?;
    match a.partial_cmp(&b) {
        Some(ordering) => Ok(Value::Bool(accept(ordering))),
        None => Ok(Value::Bool(false)), // NaN compares false
    }
}

// ── Coercions ────────────────────────────────────────────────────────────────

fn to_number(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Undefined => Ok(f64::NAN),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => Ok(*n),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(0.0)
            } else {
                Ok(trimmed.parse::<f64>().unwrap_or(f64::NAN))
            }
        }
        _ => Err(EvalError::new(
            "cannot convert an object to a number in a debugger expression",
        )),
    }
}

fn to_int32(value: &Value) -> Result<i32, EvalError> {
    let n = to_number(value)?;
    if !n.is_finite() {
        return Ok(0);
    }
    Ok((n.trunc() as i64 as u64 & 0xffff_ffff) as u32 as i32)
}

fn to_uint32(value: &Value) -> Result<u32, EvalError> {
    Ok(to_int32(value)? as u32)
}

/// Strict (`===`) equality: same type and value, compounds by identity.
pub fn strict_equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) | (Value::Undefined, Value::Undefined) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        _ => match (lhs.identity(), rhs.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn loose_equals(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    match (lhs, rhs) {
        (Value::Null | Value::Undefined, Value::Null | Value::Undefined) => Ok(true),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            Ok(to_number(lhs)? == to_number(rhs)?)
        }
        (Value::Bool(_), _) => loose_equals(&Value::Number(to_number(lhs)?), rhs),
        (_, Value::Bool(_)) => loose_equals(lhs, &Value::Number(to_number(rhs)?)),
        _ => Ok(strict_equals(lhs, rhs)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crate::validator::validate_program;

    fn eval_in(source: &str, scope: &Scope<'_>) -> Result<Value, EvalError> {
        let expr = validate_program(parse_source(source).unwrap())
            .unwrap()
            .expect("non-empty expression");
        evaluate(&expr, scope)
    }

    fn eval(source: &str) -> Result<Value, EvalError> {
        eval_in(source, &Scope::empty())
    }

    fn frame_with(locals: Vec<NamedValue>, arguments: Vec<NamedValue>) -> HostFrame {
        HostFrame {
            function: Some("test".to_string()),
            path: std::path::PathBuf::from("/srv/app/test.js"),
            line: 1,
            this: None,
            arguments,
            locals,
        }
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert!(strict_equals(
            &eval("1 + 2 * 3").unwrap(),
            &Value::Number(7.0)
        ));
        assert!(strict_equals(
            &eval("(1 + 2) * 3").unwrap(),
            &Value::Number(9.0)
        ));
    }

    #[test]
    fn test_string_concatenation() {
        let v = eval("'a' + 1").unwrap();
        assert_eq!(v.render_scalar().unwrap(), "a1");
    }

    #[test]
    fn test_loose_and_strict_equality() {
        assert!(eval("1 == '1'").unwrap().is_truthy());
        assert!(!eval("1 === '1'").unwrap().is_truthy());
        assert!(eval("null == undefined").unwrap().is_truthy());
        assert!(!eval("null === undefined").unwrap().is_truthy());
    }

    #[test]
    fn test_this_defaults_to_undefined() {
        let v = eval("this + 1").unwrap();
        let Value::Number(n) = v else { panic!() };
        assert!(n.is_nan());
    }

    #[test]
    fn test_identifier_lookup_in_frame() {
        let frame = frame_with(
            vec![NamedValue::new("count", Value::Number(3.0))],
            vec![NamedValue::new("n", Value::Number(5.0))],
        );
        let scope = Scope::new(Some(&frame), &[]);
        assert!(eval_in("n === 5", &scope).unwrap().is_truthy());
        assert!(eval_in("count < n", &scope).unwrap().is_truthy());
    }

    #[test]
    fn test_unknown_identifier_errors() {
        let err = eval("missing").unwrap_err();
        assert!(err.message.contains("not defined"));
    }

    #[test]
    fn test_typeof_missing_is_undefined() {
        let v = eval("typeof missing").unwrap();
        assert_eq!(v.render_scalar().unwrap(), "undefined");
    }

    #[test]
    fn test_member_and_index_access() {
        let obj = Value::object(vec![("b", Value::Number(6.0))]);
        let arr = Value::array(vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Number(3.0),
        ]);
        let frame = frame_with(
            vec![NamedValue::new("B", obj), NamedValue::new("A", arr)],
            vec![],
        );
        let scope = Scope::new(Some(&frame), &[]);
        assert!(eval_in("B.b === 6", &scope).unwrap().is_truthy());
        assert!(eval_in("A[0] === 1", &scope).unwrap().is_truthy());
        assert!(eval_in("A.length === 3", &scope).unwrap().is_truthy());
        assert!(eval_in("A[9] === undefined", &scope).unwrap().is_truthy());
    }

    #[test]
    fn test_getter_access_fails() {
        let data = ObjectData::new();
        data.set("a", Value::Number(5.0));
        data.set_accessor("b");
        let frame = frame_with(
            vec![NamedValue::new("hasGetter", Value::Object(Rc::new(data)))],
            vec![],
        );
        let scope = Scope::new(Some(&frame), &[]);
        assert!(eval_in("hasGetter.a === 5", &scope).unwrap().is_truthy());
        let err = eval_in("hasGetter.b", &scope).unwrap_err();
        assert!(err.message.contains("getter"));
    }

    #[test]
    fn test_member_of_null_fails() {
        let err = eval("null.x");
        assert!(err.is_err());
    }

    #[test]
    fn test_short_circuit_returns_operand() {
        let v = eval("0 || 'fallback'").unwrap();
        assert_eq!(v.render_scalar().unwrap(), "fallback");
        let v = eval("0 && missing").unwrap();
        assert!(strict_equals(&v, &Value::Number(0.0)));
    }

    #[test]
    fn test_sequence_yields_last() {
        let v = eval("1,2,3,{f:2},4").unwrap();
        assert!(strict_equals(&v, &Value::Number(4.0)));
    }

    #[test]
    fn test_ternary() {
        let v = eval("1 < 2 ? 'yes' : 'no'").unwrap();
        assert_eq!(v.render_scalar().unwrap(), "yes");
    }

    #[test]
    fn test_bitwise() {
        assert!(strict_equals(&eval("5 & 3").unwrap(), &Value::Number(1.0)));
        assert!(strict_equals(&eval("1 << 4").unwrap(), &Value::Number(16.0)));
        assert!(strict_equals(&eval("~0").unwrap(), &Value::Number(-1.0)));
    }

    #[test]
    fn test_in_operator() {
        let obj = Value::object(vec![("f", Value::Number(2.0))]);
        let frame = frame_with(vec![NamedValue::new("o", obj)], vec![]);
        let scope = Scope::new(Some(&frame), &[]);
        assert!(eval_in("'f' in o", &scope).unwrap().is_truthy());
        assert!(!eval_in("'g' in o", &scope).unwrap().is_truthy());
    }

    #[test]
    fn test_object_literal_evaluates() {
        // At statement start `{` opens a block, so group the literal
        let v = eval("({f: 1 + 1})").unwrap();
        let Value::Object(data) = &v else { panic!() };
        let Some(prop) = data.lookup("f") else { panic!() };
        let PropertySlot::Data(inner) = prop.slot else { panic!() };
        assert!(strict_equals(&inner, &Value::Number(2.0)));
    }
}
