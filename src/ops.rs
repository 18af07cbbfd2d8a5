//! Operator kernel (C5): the `(op, left_kind, right_kind)` table spec.md
//! §4.3 describes, plus casts. Binary/unary dispatch lives here; the
//! short-circuiting control flow for `&&`/`||`/`??` (which must *not*
//! evaluate their right operand in some cases) lives in `interpreter.rs`
//! since it needs to decide, before this module ever sees a right-hand
//! value, whether to evaluate it at all.

use crate::ast::{BinOp, UnOp};
use crate::error::{LuzError, LuzResult};
use crate::position::Position;
use crate::value::{values_equal, LuzSet, Value};
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};
use rand::Rng;

fn semantic(msg: impl Into<String>, pos: Position) -> LuzError {
    LuzError::Semantic(msg.into(), pos)
}

fn invalid(msg: impl Into<String>, pos: Position) -> LuzError {
    LuzError::InvalidInstruction(msg.into(), pos)
}

/// `NaN` normalises to `Null` at every operator output (spec.md §3).
fn num_result(n: f64) -> Value {
    if n.is_nan() {
        Value::Null
    } else {
        Value::Num(n)
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Num(n) => Some(*n),
        Value::Xl(n) => n.to_f64(),
        _ => None,
    }
}

fn as_bigint(v: &Value) -> Option<BigInt> {
    match v {
        Value::Xl(n) => Some(n.clone()),
        Value::Num(n) if n.fract() == 0.0 && n.is_finite() => BigInt::from_f64_truncate(*n),
        _ => None,
    }
}

/// `num-bigint` has no infallible float conversion in scope here, so this
/// is a tiny local helper rather than a `num-traits::FromPrimitive` import
/// (which would also accept fractional/NaN floats we want to reject).
trait FromF64Truncate: Sized {
    fn from_f64_truncate(n: f64) -> Option<Self>;
}
impl FromF64Truncate for BigInt {
    fn from_f64_truncate(n: f64) -> Option<Self> {
        num_traits::FromPrimitive::from_f64(n)
    }
}

fn is_numeric(v: &Value) -> bool {
    matches!(v, Value::Num(_) | Value::Xl(_))
}

/// Builds a fresh [`LuzSet`] with the same elements (and `.last`) as `s`,
/// for `Set + x` / `Set - x`, which must return a new set rather than
/// mutate the operand in place (spec.md §3/§4.3).
fn cloned_set(s: &std::rc::Rc<std::cell::RefCell<LuzSet>>) -> LuzSet {
    let mut out = LuzSet::new();
    for item in s.borrow().iter() {
        out.insert(item.clone());
    }
    out
}

/// Both sides big-int, or at least one is and the other is an integral
/// float: arithmetic promotes to big-int. Otherwise both coerce to `f64`.
fn numeric_op(
    l: &Value,
    r: &Value,
    pos: Position,
    on_f64: impl Fn(f64, f64) -> Option<f64>,
    on_big: impl Fn(&BigInt, &BigInt) -> Option<BigInt>,
) -> LuzResult<Value> {
    match (l, r) {
        (Value::Xl(_), _) | (_, Value::Xl(_)) => {
            let (a, b) = (as_bigint(l), as_bigint(r));
            match (a, b) {
                (Some(a), Some(b)) => match on_big(&a, &b) {
                    Some(v) => Ok(Value::Xl(v)),
                    None => Ok(Value::Null),
                },
                _ => Err(semantic(
                    format!(
                        "cannot apply arithmetic to '{}' and '{}'",
                        l.type_tag(),
                        r.type_tag()
                    ),
                    pos,
                )),
            }
        }
        _ if is_numeric(l) && is_numeric(r) => {
            let (a, b) = (as_f64(l).unwrap(), as_f64(r).unwrap());
            Ok(match on_f64(a, b) {
                Some(v) => num_result(v),
                None => Value::Null,
            })
        }
        _ => Err(semantic(
            format!(
                "cannot apply arithmetic to '{}' and '{}'",
                l.type_tag(),
                r.type_tag()
            ),
            pos,
        )),
    }
}

/// Top-level binary dispatch. `&&`/`||`/`??`/`as` are handled by the
/// interpreter, not here (see module docs).
pub fn binary(op: BinOp, l: &Value, r: &Value, pos: Position) -> LuzResult<Value> {
    use BinOp::*;
    match op {
        Add => add(l, r, pos),
        Sub => sub(l, r, pos),
        Mul => numeric_op(l, r, pos, |a, b| Some(a * b), |a, b| Some(a * b)),
        Div => div(l, r, pos),
        FloorDiv => floor_div(l, r, pos),
        Mod => numeric_op(
            l,
            r,
            pos,
            |a, b| Some(a.rem_euclid(b)),
            |a, b| if b.is_zero() { None } else { Some(a.mod_floor(b)) },
        ),
        Pow => pow(l, r, pos),
        BitAnd => bitwise(l, r, pos, |a, b| a & b, |a, b| a & b),
        BitOr => bitwise(l, r, pos, |a, b| a | b, |a, b| a | b),
        BitXor => bitwise(l, r, pos, |a, b| a ^ b, |a, b| a ^ b),
        Shl => bitwise(l, r, pos, |a, b| a << (b & 63), |a, b| a << (b & 63)),
        Shr => bitwise(l, r, pos, |a, b| a >> (b & 63), |a, b| a >> (b & 63)),
        Shr3 => bitwise(
            l,
            r,
            pos,
            |a, b| ((a as u64) >> (b & 63)) as i64,
            |a, b| a >> (b & 63),
        ),
        Eq => Ok(Value::Bool(values_equal(l, r))),
        Ne => Ok(Value::Bool(!values_equal(l, r))),
        Lt => compare(l, r, pos, |o| o == std::cmp::Ordering::Less),
        Le => compare(l, r, pos, |o| o != std::cmp::Ordering::Greater),
        Gt => compare(l, r, pos, |o| o == std::cmp::Ordering::Greater),
        Ge => compare(l, r, pos, |o| o != std::cmp::Ordering::Less),
        Has => has(l, r, pos),
        And | Or | Nullish => unreachable!("short-circuit operators handled by the interpreter"),
    }
}

fn add(l: &Value, r: &Value, pos: Position) -> LuzResult<Value> {
    match (l, r) {
        // Aggregates take priority over string concatenation on either side,
        // so `"x" + vec` still prepends rather than stringifying the vec.
        // Both sides build a *new* container (spec.md §3/§4.3) rather than
        // mutating the operand's cell in place.
        (Value::Vec(c), _) => {
            let mut items = c.borrow().clone();
            items.push(r.clone());
            Ok(Value::vec(items))
        }
        (_, Value::Vec(c)) => {
            let mut items = c.borrow().clone();
            items.insert(0, l.clone());
            Ok(Value::vec(items))
        }
        (Value::Set(s), _) => {
            let mut set = cloned_set(s);
            set.insert(r.clone());
            Ok(Value::set(set))
        }
        (_, Value::Set(s)) => {
            let mut set = cloned_set(s);
            set.insert(l.clone());
            Ok(Value::set(set))
        }
        (Value::Arr(_), _) | (_, Value::Arr(_)) => Err(invalid(
            "cannot append to a fixed-size 'arr'; use 'vec' instead",
            pos,
        )),
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            Ok(Value::Str(format!("{}{}", l.format_plain(), r.format_plain()).into()))
        }
        (Value::Ran(start, end), n) if is_numeric(n) => {
            Ok(Value::Ran(*start, *end + as_f64(n).unwrap()))
        }
        (n, Value::Ran(start, end)) if is_numeric(n) => {
            Ok(Value::Ran(*start + as_f64(n).unwrap(), *end))
        }
        (Value::XRan(start, end), n) if is_numeric(n) => {
            Ok(Value::XRan(*start, *end + as_f64(n).unwrap()))
        }
        (n, Value::XRan(start, end)) if is_numeric(n) => {
            Ok(Value::XRan(*start + as_f64(n).unwrap(), *end))
        }
        _ if is_numeric(l) && is_numeric(r) => numeric_op(
            l,
            r,
            pos,
            |a, b| Some(a + b),
            |a, b| Some(a + b),
        ),
        _ => Err(semantic(
            format!("cannot add '{}' and '{}'", l.type_tag(), r.type_tag()),
            pos,
        )),
    }
}

fn sub(l: &Value, r: &Value, pos: Position) -> LuzResult<Value> {
    match (l, r) {
        (Value::Vec(c), x) => {
            let mut items = c.borrow().clone();
            if let Some(idx) = items.iter().rposition(|e| values_equal(e, x)) {
                items.remove(idx);
            }
            Ok(Value::vec(items))
        }
        (Value::Set(s), x) => {
            let mut set = cloned_set(s);
            set.remove(x);
            Ok(Value::set(set))
        }
        (Value::Arr(_), _) => Err(invalid(
            "cannot remove from a fixed-size 'arr'; use 'vec' instead",
            pos,
        )),
        (Value::Ran(start, end), n) if is_numeric(n) => {
            Ok(Value::Ran(*start, *end - as_f64(n).unwrap()))
        }
        (Value::XRan(start, end), n) if is_numeric(n) => {
            Ok(Value::XRan(*start, *end - as_f64(n).unwrap()))
        }
        _ if is_numeric(l) && is_numeric(r) => numeric_op(
            l,
            r,
            pos,
            |a, b| Some(a - b),
            |a, b| Some(a - b),
        ),
        _ => Err(semantic(
            format!("cannot subtract '{}' from '{}'", r.type_tag(), l.type_tag()),
            pos,
        )),
    }
}

fn div(l: &Value, r: &Value, pos: Position) -> LuzResult<Value> {
    numeric_op(
        l,
        r,
        pos,
        |a, b| Some(a / b),
        |a, b| {
            if b.is_zero() {
                None
            } else if (a % b).is_zero() {
                Some(a / b)
            } else {
                None // non-exact big-int division has no big-int result; caller sees Null
            }
        },
    )
}

fn floor_div(l: &Value, r: &Value, pos: Position) -> LuzResult<Value> {
    numeric_op(
        l,
        r,
        pos,
        |a, b| Some((a / b).floor()),
        |a, b| if b.is_zero() { None } else { Some(a.div_floor(b)) },
    )
}

fn pow(l: &Value, r: &Value, pos: Position) -> LuzResult<Value> {
    match (l, r) {
        (Value::Xl(a), Value::Num(b)) if b.fract() == 0.0 && *b >= 0.0 => {
            Ok(Value::Xl(num_traits::pow(a.clone(), *b as usize)))
        }
        _ if is_numeric(l) && is_numeric(r) => numeric_op(
            l,
            r,
            pos,
            |a, b| Some(a.powf(b)),
            |_, _| None,
        ),
        _ => Err(semantic(
            format!("cannot raise '{}' to '{}'", l.type_tag(), r.type_tag()),
            pos,
        )),
    }
}

fn as_i64(v: &Value, pos: Position) -> LuzResult<i64> {
    match v {
        Value::Num(n) => Ok(*n as i64),
        Value::Xl(n) => n
            .to_i64()
            .ok_or_else(|| invalid("big integer too large for a bitwise operand", pos)),
        other => Err(semantic(
            format!("'{}' is not an integer", other.type_tag()),
            pos,
        )),
    }
}

fn bitwise(
    l: &Value,
    r: &Value,
    pos: Position,
    on_i64: impl Fn(i64, i64) -> i64,
    on_big: impl Fn(&BigInt, &BigInt) -> BigInt,
) -> LuzResult<Value> {
    if matches!(l, Value::Xl(_)) || matches!(r, Value::Xl(_)) {
        let a = as_bigint(l).ok_or_else(|| semantic("non-integer bitwise operand", pos))?;
        let b = as_bigint(r).ok_or_else(|| semantic("non-integer bitwise operand", pos))?;
        Ok(Value::Xl(on_big(&a, &b)))
    } else {
        Ok(Value::Num(on_i64(as_i64(l, pos)?, as_i64(r, pos)?) as f64))
    }
}

fn numeric_family(v: &Value) -> Option<&'static str> {
    match v {
        Value::Num(_) => Some("num"),
        Value::Xl(_) => Some("xl"),
        _ => None,
    }
}

fn compare(l: &Value, r: &Value, pos: Position, accept: impl Fn(std::cmp::Ordering) -> bool) -> LuzResult<Value> {
    let (lf, rf) = (numeric_family(l), numeric_family(r));
    if lf.is_none() || rf.is_none() {
        return Err(semantic(
            format!(
                "cannot compare '{}' and '{}'",
                l.type_tag(),
                r.type_tag()
            ),
            pos,
        ));
    }
    let (a, b) = (as_f64(l).unwrap(), as_f64(r).unwrap());
    let ord = a
        .partial_cmp(&b)
        .ok_or_else(|| semantic("comparison with NaN", pos))?;
    Ok(Value::Bool(accept(ord)))
}

fn has(l: &Value, r: &Value, pos: Position) -> LuzResult<Value> {
    Ok(Value::Bool(match l {
        Value::Ran(_, _) | Value::XRan(_, _) => {
            if let Some(n) = as_f64(r) {
                l.range_elements().iter().any(|v| as_f64(v) == Some(n))
            } else {
                false
            }
        }
        Value::Arr(c) | Value::Vec(c) => c.borrow().iter().any(|v| values_equal(v, r)),
        Value::Set(s) => s.borrow().contains(r),
        Value::Str(s) => match r {
            Value::Str(needle) => s.contains(needle.as_ref()),
            _ => {
                return Err(semantic(
                    format!("'has' on a string requires a string operand, got '{}'", r.type_tag()),
                    pos,
                ))
            }
        },
        Value::Null => false,
        other => {
            return Err(semantic(
                format!("'has' is not defined for type '{}'", other.type_tag()),
                pos,
            ))
        }
    }))
}

pub fn unary(op: UnOp, v: &Value, pos: Position) -> LuzResult<Value> {
    match op {
        UnOp::Pos => match v {
            Value::Num(n) => Ok(Value::Num(*n)),
            Value::Xl(n) => Ok(Value::Xl(n.clone())),
            other => Err(semantic(
                format!("unary '+' is not defined for '{}'", other.type_tag()),
                pos,
            )),
        },
        UnOp::Neg => match v {
            Value::Num(n) => Ok(num_result(-*n)),
            Value::Xl(n) => Ok(Value::Xl(-n.clone())),
            other => Err(semantic(
                format!("unary '-' is not defined for '{}'", other.type_tag()),
                pos,
            )),
        },
        UnOp::Not => Ok(Value::Bool(!v.truthy())),
        UnOp::BitNot => Ok(match v {
            Value::Xl(n) => Value::Xl(!n.clone()),
            _ => Value::Num(!as_i64(v, pos)? as f64),
        }),
    }
}

/// `as T` / `as typeof <expr>`. `rng` backs `as maybe`'s random draw.
pub fn cast(v: &Value, target: &str, pos: Position, rng: &mut impl Rng) -> LuzResult<Value> {
    match target {
        "num" => Ok(Value::Num(to_num(v, pos)?)),
        "xl" => Ok(Value::Xl(to_bigint(v, pos)?)),
        "bool" => Ok(Value::Bool(v.truthy())),
        "str" => Ok(Value::Str(to_str(v).into())),
        "null" => Ok(Value::Null),
        "inf" => Ok(Value::Num(if to_num(v, pos)? >= 0.0 {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        })),
        "arr" => Ok(Value::arr(to_elements(v, pos)?)),
        "vec" => Ok(Value::vec(to_elements(v, pos)?)),
        "set" => {
            let mut s = LuzSet::new();
            for e in to_elements(v, pos)? {
                s.insert(e);
            }
            Ok(Value::set(s))
        }
        "ran" => to_range(v, pos, false),
        "xran" => to_range(v, pos, true),
        "maybe" => Ok(cast_to_maybe(v, rng)),
        other => Err(semantic(format!("unknown cast target '{other}'"), pos)),
    }
}

fn to_num(v: &Value, pos: Position) -> LuzResult<f64> {
    match v {
        Value::Num(n) => Ok(*n),
        Value::Xl(n) => n
            .to_f64()
            .ok_or_else(|| invalid("big integer too large to cast to 'num'", pos)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| semantic(format!("cannot cast \"{s}\" to 'num'"), pos)),
        Value::Null => Ok(0.0),
        other => Err(semantic(
            format!("cannot cast '{}' to 'num'", other.type_tag()),
            pos,
        )),
    }
}

fn to_bigint(v: &Value, pos: Position) -> LuzResult<BigInt> {
    match v {
        Value::Xl(n) => Ok(n.clone()),
        Value::Num(n) if n.fract() == 0.0 => {
            as_bigint(v).ok_or_else(|| invalid("cannot cast non-finite 'num' to 'xl'", pos))
        }
        Value::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| semantic(format!("cannot cast \"{s}\" to 'xl'"), pos)),
        other => Err(semantic(
            format!("cannot cast '{}' to 'xl'", other.type_tag()),
            pos,
        )),
    }
}

fn to_str(v: &Value) -> String {
    match v {
        Value::Ran(_, _) | Value::XRan(_, _) => v
            .range_elements()
            .iter()
            .map(Value::format_plain)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.format_plain(),
    }
}

fn to_elements(v: &Value, pos: Position) -> LuzResult<Vec<Value>> {
    match v {
        Value::Ran(_, _) | Value::XRan(_, _) => Ok(v.range_elements()),
        Value::Arr(c) | Value::Vec(c) => Ok(c.borrow().clone()),
        Value::Set(s) => Ok(s.borrow().iter().cloned().collect()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string().into())).collect()),
        other => Err(semantic(
            format!("cannot cast '{}' to an aggregate", other.type_tag()),
            pos,
        )),
    }
}

/// `ran ↔ xran` shift the differing endpoint by one step in the direction
/// of iteration (spec.md §4.3); constructing from a scalar/other aggregate
/// materialises then re-ranges over its numeric extent is out of scope —
/// only range-to-range and range-to-same-kind casts are meaningful here.
fn to_range(v: &Value, pos: Position, closed: bool) -> LuzResult<Value> {
    match (v, closed) {
        (Value::Ran(s, e), true) => {
            let step = Value::range_step(*s, *e);
            Ok(Value::XRan(*s, e - step))
        }
        (Value::XRan(s, e), false) => {
            let step = Value::range_step(*s, *e);
            Ok(Value::Ran(*s, e + step))
        }
        (Value::Ran(s, e), false) => Ok(Value::Ran(*s, *e)),
        (Value::XRan(s, e), true) => Ok(Value::XRan(*s, *e)),
        (other, _) => Err(semantic(
            format!(
                "cannot cast '{}' to '{}'",
                other.type_tag(),
                if closed { "xran" } else { "ran" }
            ),
            pos,
        )),
    }
}

fn cast_to_maybe(v: &Value, rng: &mut impl Rng) -> Value {
    match v {
        Value::Ran(_, _) | Value::XRan(_, _) => {
            let elems = v.range_elements();
            if elems.is_empty() {
                Value::Null
            } else {
                elems[rng.gen_range(0..elems.len())].clone()
            }
        }
        Value::Arr(c) | Value::Vec(c) => {
            let items = c.borrow();
            if items.is_empty() {
                Value::Null
            } else {
                items[rng.gen_range(0..items.len())].clone()
            }
        }
        Value::Set(s) => {
            let items = s.borrow();
            let elems: Vec<_> = items.iter().cloned().collect();
            if elems.is_empty() {
                Value::Null
            } else {
                elems[rng.gen_range(0..elems.len())].clone()
            }
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            if chars.is_empty() {
                Value::Null
            } else {
                Value::Str(chars[rng.gen_range(0..chars.len())].to_string().into())
            }
        }
        _ => Value::Bool(rng.gen_bool(0.5)),
    }
}
