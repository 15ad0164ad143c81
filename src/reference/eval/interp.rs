//! 树遍历求值与类型转换

use super::number::{number_to_string, power, string_to_number};
use super::parser::{BinaryOp, Expr, Program, Segment, Stmt, UnaryOp};
use super::{Symbol, Value};
use std::cmp::Ordering;

/// 抛出的值
type Thrown = Value;

impl Program {
    /// 返回最后一条语句的完成值；抛出异常时返回 `Err(抛出的值)`
    pub(crate) fn run(&self) -> Result<Value, Thrown> {
        let mut completion = Value::Undefined;
        for stmt in &self.body {
            match stmt {
                Stmt::Expr(expr) => completion = evaluate(expr)?,
                Stmt::Throw(expr) => return Err(evaluate(expr)?),
            }
        }
        Ok(completion)
    }
}

fn error(kind: &str, message: &str) -> Thrown {
    Value::string(&format!("{}: {}", kind, message))
}

fn evaluate(expr: &Expr) -> Result<Value, Thrown> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Template(segments) => {
            let mut out = Vec::new();
            for segment in segments {
                match segment {
                    Segment::Text(text) => out.extend_from_slice(text),
                    Segment::Substitution(expr) => out.extend(to_js_string(&evaluate(expr)?)?),
                }
            }
            Ok(Value::String(out))
        }
        Expr::Ident(name) => Err(error("ReferenceError", &format!("{} is not defined", name))),
        Expr::Symbol(description) => {
            let description = match description {
                Some(expr) => match evaluate(expr)? {
                    Value::Undefined => None,
                    value => Some(to_js_string(&value)?),
                },
                None => None,
            };
            Ok(Value::Symbol(Symbol::new(description)))
        }
        Expr::Unary(op, operand) => unary(*op, operand),
        Expr::Binary(op, left, right) => binary(*op, left, right),
        Expr::Conditional(test, consequent, alternate) => {
            if to_boolean(&evaluate(test)?) {
                evaluate(consequent)
            } else {
                evaluate(alternate)
            }
        }
    }
}

fn unary(op: UnaryOp, operand: &Expr) -> Result<Value, Thrown> {
    // 对未声明标识符取 typeof 不抛异常
    if let (UnaryOp::Typeof, Expr::Ident(_)) = (op, operand) {
        return Ok(Value::string("undefined"));
    }
    let value = evaluate(operand)?;
    Ok(match op {
        UnaryOp::Neg => Value::Number(-to_number(&value)?),
        UnaryOp::Plus => Value::Number(to_number(&value)?),
        UnaryOp::Not => Value::Bool(!to_boolean(&value)),
        UnaryOp::Typeof => Value::string(type_of(&value)),
        UnaryOp::Void => Value::Undefined,
    })
}

fn binary(op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, Thrown> {
    let lhs = evaluate(left)?;
    match op {
        BinaryOp::And if !to_boolean(&lhs) => return Ok(lhs),
        BinaryOp::Or if to_boolean(&lhs) => return Ok(lhs),
        _ => {}
    }
    let rhs = evaluate(right)?;

    Ok(match op {
        BinaryOp::Add => {
            if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) {
                let mut out = to_js_string(&lhs)?;
                out.extend(to_js_string(&rhs)?);
                Value::String(out)
            } else {
                Value::Number(to_number(&lhs)? + to_number(&rhs)?)
            }
        }
        BinaryOp::Sub => Value::Number(to_number(&lhs)? - to_number(&rhs)?),
        BinaryOp::Mul => Value::Number(to_number(&lhs)? * to_number(&rhs)?),
        BinaryOp::Div => Value::Number(to_number(&lhs)? / to_number(&rhs)?),
        BinaryOp::Rem => Value::Number(to_number(&lhs)? % to_number(&rhs)?),
        BinaryOp::Pow => Value::Number(power(to_number(&lhs)?, to_number(&rhs)?)),
        BinaryOp::StrictEq => Value::Bool(strict_equals(&lhs, &rhs)),
        BinaryOp::StrictNe => Value::Bool(!strict_equals(&lhs, &rhs)),
        BinaryOp::Eq => Value::Bool(loose_equals(&lhs, &rhs)?),
        BinaryOp::Ne => Value::Bool(!loose_equals(&lhs, &rhs)?),
        BinaryOp::Lt => Value::Bool(compare(&lhs, &rhs)? == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Bool(compare(&lhs, &rhs)? == Some(Ordering::Greater)),
        BinaryOp::Le => Value::Bool(matches!(compare(&lhs, &rhs)?, Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(&lhs, &rhs)?,
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::And | BinaryOp::Or => rhs,
    })
}

/// 字符串按 UTF-16 码元比较，其余转为数值；NaN 参与时为 `None`
fn compare(lhs: &Value, rhs: &Value) -> Result<Option<Ordering>, Thrown> {
    if let (Value::String(a), Value::String(b)) = (lhs, rhs) {
        return Ok(Some(a.cmp(b)));
    }
    Ok(to_number(lhs)?.partial_cmp(&to_number(rhs)?))
}

fn strict_equals(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Symbol(a), Value::Symbol(b)) => a == b,
        _ => false,
    }
}

fn loose_equals(lhs: &Value, rhs: &Value) -> Result<bool, Thrown> {
    Ok(match (lhs, rhs) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(a), Value::String(b)) => *a == string_to_number(b),
        (Value::String(a), Value::Number(b)) => string_to_number(a) == *b,
        (Value::Bool(a), other) => return loose_equals(&Value::Number(f64::from(u8::from(*a))), other),
        (other, Value::Bool(b)) => return loose_equals(other, &Value::Number(f64::from(u8::from(*b)))),
        _ => strict_equals(lhs, rhs),
    })
}

pub(crate) fn to_boolean(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => !(n.is_nan() || *n == 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Symbol(_) => true,
    }
}

pub(crate) fn to_number(value: &Value) -> Result<f64, Thrown> {
    Ok(match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) => string_to_number(s),
        Value::Symbol(_) => {
            return Err(error("TypeError", "Cannot convert a Symbol value to a number"))
        }
    })
}

/// ToString；Symbol 不能隐式转换
pub(crate) fn to_js_string(value: &Value) -> Result<Vec<u16>, Thrown> {
    let text = match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::String(s) => return Ok(s.clone()),
        Value::Symbol(_) => {
            return Err(error("TypeError", "Cannot convert a Symbol value to a string"))
        }
    };
    Ok(text.encode_utf16().collect())
}

pub(crate) fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Null => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Symbol(_) => "symbol",
    }
}
