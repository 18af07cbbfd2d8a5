//! Value model (C3): tagged value variants, range generators, the
//! ordered-last-insertion set, and plain/debug formatting.

use crate::error::{LuzError, LuzResult};
use crate::position::Position;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A growable or fixed container cell. `Arr` and `Vec` share this
/// representation; only the operator kernel (ops.rs) distinguishes which
/// mutating operations each tag permits.
pub type Cell = Rc<RefCell<Vec<Value>>>;

/// The closed set of runtime value kinds.
///
/// `Maybe` has no direct counterpart in a conventional dynamic-language
/// value model: it is the evaluated form of the bare `maybe` literal, a
/// boolean held in superposition until it is observed (used in a boolean
/// context, compared, or cast). See `DESIGN.md` for the reasoning — the
/// distilled spec lists `maybe` as both a token kind and a `typeof` tag
/// without giving it a variant of its own, so this crate gives it one.
#[derive(Debug, Clone)]
pub enum Value {
    Num(f64),
    Xl(BigInt),
    Bool(bool),
    Str(Rc<str>),
    Null,
    Maybe,
    Arr(Cell),
    Vec(Cell),
    Set(Rc<RefCell<LuzSet>>),
    Ran(f64, f64),
    XRan(f64, f64),
}

/// An ordered set that remembers the element most recently inserted or
/// reassigned (`.last`). Backed by a plain `Vec` and linear scan rather than
/// a hash table: `Value` has no total, hash-stable equality for aggregates
/// (see `values_equal`), so a hash-based set would need the same linear
/// fallback for its aggregate-valued entries anyway.
#[derive(Debug, Default)]
pub struct LuzSet {
    items: Vec<Value>,
    last: Option<usize>,
}

impl LuzSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.iter()
    }

    pub fn contains(&self, v: &Value) -> bool {
        self.items.iter().any(|existing| values_equal(existing, v))
    }

    /// Inserts `v`, or overwrites the equal existing element. Either way,
    /// `v` becomes `.last`.
    pub fn insert(&mut self, v: Value) {
        if let Some(idx) = self.items.iter().position(|e| values_equal(e, &v)) {
            self.items[idx] = v;
            self.last = Some(idx);
        } else {
            self.items.push(v);
            self.last = Some(self.items.len() - 1);
        }
    }

    pub fn remove(&mut self, v: &Value) -> bool {
        if let Some(idx) = self.items.iter().position(|e| values_equal(e, v)) {
            self.items.remove(idx);
            self.last = if self.items.is_empty() {
                None
            } else {
                Some(self.items.len() - 1)
            };
            true
        } else {
            false
        }
    }

    pub fn last(&self) -> Option<&Value> {
        self.last.and_then(|i| self.items.get(i))
    }
}

/// Structural equality for scalars, reference identity for aggregates.
///
/// This is the Open Question from `spec.md` §9 ("Aggregate equality")
/// resolved in favour of reference identity: two freshly built literals
/// with identical contents compare unequal; an aggregate compared against
/// itself (including through a second binding) compares equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    use Value::*;
    match (a, b) {
        (Num(x), Num(y)) => x == y,
        (Xl(x), Xl(y)) => x == y,
        (Num(x), Xl(y)) | (Xl(y), Num(x)) => y.to_f64().is_some_and(|y| *x == y),
        (Bool(x), Bool(y)) => x == y,
        (Str(x), Str(y)) => x == y,
        (Null, Null) => true,
        (Maybe, Maybe) => false, // two unobserved superpositions are never the same draw
        (Arr(x), Arr(y)) | (Vec(x), Vec(y)) => Rc::ptr_eq(x, y),
        (Set(x), Set(y)) => Rc::ptr_eq(x, y),
        (Ran(s1, e1), Ran(s2, e2)) | (XRan(s1, e1), XRan(s2, e2)) => s1 == s2 && e1 == e2,
        _ => false,
    }
}

impl Value {
    pub fn arr(items: Vec<Value>) -> Self {
        Self::Arr(Rc::new(RefCell::new(items)))
    }

    pub fn vec(items: Vec<Value>) -> Self {
        Self::Vec(Rc::new(RefCell::new(items)))
    }

    pub fn set(set: LuzSet) -> Self {
        Self::Set(Rc::new(RefCell::new(set)))
    }

    /// The string reachable via `typeof`.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Num(n) if n.is_infinite() => "inf",
            Value::Num(_) => "num",
            Value::Xl(_) => "xl",
            Value::Bool(_) => "bool",
            Value::Str(_) => "str",
            Value::Null => "null",
            Value::Maybe => "maybe",
            Value::Arr(_) => "arr",
            Value::Vec(_) => "vec",
            Value::Set(_) => "set",
            Value::Ran(_, _) => "ran",
            Value::XRan(_, _) => "xran",
        }
    }

    /// Truthiness used by `if`, `&&`/`||`/`??`, and `!`.
    ///
    /// Observing a `Maybe` here resolves it: it decides as a coin flip on
    /// the spot and that is the value's only effect (the `Maybe` itself is
    /// not replaced in the scope it came from, since it never lived there —
    /// it is only ever a fresh literal expression result).
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Num(n) => *n != 0.0,
            Value::Xl(n) => !n.eq(&BigInt::from(0)),
            Value::Str(s) => !s.is_empty(),
            Value::Maybe => rand::random(),
            Value::Arr(c) | Value::Vec(c) => !c.borrow().is_empty(),
            Value::Set(s) => !s.borrow().is_empty(),
            Value::Ran(a, b) => a != b,
            Value::XRan(_, _) => true,
        }
    }

    /// Step-sign of a range: `sign(end - start)`, `0.0` for a degenerate
    /// `Ran` where `start == end`.
    #[must_use]
    pub fn range_step(start: f64, end: f64) -> f64 {
        if end > start {
            1.0
        } else if end < start {
            -1.0
        } else {
            0.0
        }
    }

    /// Materializes a `Ran`/`XRan` into its sequence of `Num` elements.
    #[must_use]
    pub fn range_elements(&self) -> Vec<Value> {
        match self {
            Value::Ran(start, end) => {
                let step = Self::range_step(*start, *end);
                let mut out = Vec::new();
                if step == 0.0 {
                    return out;
                }
                let mut cur = *start;
                while (step > 0.0 && cur < *end) || (step < 0.0 && cur > *end) {
                    out.push(Value::Num(cur));
                    cur += step;
                }
                out
            }
            Value::XRan(start, end) => {
                let step = Self::range_step(*start, *end);
                let mut out = Vec::new();
                if step == 0.0 {
                    out.push(Value::Num(*start));
                    return out;
                }
                let mut cur = *start;
                loop {
                    out.push(Value::Num(cur));
                    if cur == *end {
                        break;
                    }
                    cur += step;
                }
                out
            }
            other => vec![other.clone()],
        }
    }

    /// `lenof`: size of a string/aggregate/range.
    pub fn len_of(&self, pos: Position) -> LuzResult<i64> {
        Ok(match self {
            Value::Str(s) => s.chars().count() as i64,
            Value::Arr(c) | Value::Vec(c) => c.borrow().len() as i64,
            Value::Set(s) => s.borrow().len() as i64,
            Value::Ran(_, _) | Value::XRan(_, _) => self.range_elements().len() as i64,
            other => {
                return Err(LuzError::Semantic(
                    format!("'lenof' is not defined for type '{}'", other.type_tag()),
                    pos,
                ))
            }
        })
    }

    /// `sizeof`: recursive byte-size estimate. Cycles are counted once.
    pub fn size_of(&self) -> i64 {
        let mut seen = Vec::new();
        self.size_of_inner(&mut seen)
    }

    fn size_of_inner(&self, seen: &mut Vec<usize>) -> i64 {
        match self {
            Value::Null | Value::Maybe => 4,
            Value::Bool(_) => 1,
            Value::Num(_) => 8,
            Value::Str(s) => 2 * s.chars().count() as i64,
            Value::Xl(n) => 2 * n.to_string().trim_start_matches('-').len() as i64,
            Value::Ran(_, _) | Value::XRan(_, _) => 16,
            Value::Arr(c) | Value::Vec(c) => {
                let ptr = Rc::as_ptr(c) as usize;
                if seen.contains(&ptr) {
                    return 0;
                }
                seen.push(ptr);
                c.borrow().iter().map(|v| v.size_of_inner(seen)).sum()
            }
            Value::Set(s) => {
                let ptr = Rc::as_ptr(s) as usize;
                if seen.contains(&ptr) {
                    return 0;
                }
                seen.push(ptr);
                s.borrow().iter().map(|v| v.size_of_inner(seen)).sum()
            }
        }
    }

    /// `copyof`: deep structural clone. Identity for scalars.
    #[must_use]
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Arr(c) => Value::arr(c.borrow().iter().map(Value::deep_copy).collect()),
            Value::Vec(c) => Value::vec(c.borrow().iter().map(Value::deep_copy).collect()),
            Value::Set(s) => {
                let mut copy = LuzSet::new();
                for item in s.borrow().iter() {
                    copy.insert(item.deep_copy());
                }
                Value::set(copy)
            }
            other => other.clone(),
        }
    }

    /// `firstof`/`lastof` support.
    pub fn first_of(&self, pos: Position) -> LuzResult<Value> {
        match self {
            Value::Arr(c) | Value::Vec(c) => Ok(c.borrow().first().cloned().unwrap_or(Value::Null)),
            Value::Set(s) => Ok(s.borrow().iter().next().cloned().unwrap_or(Value::Null)),
            Value::Str(s) => Ok(s
                .chars()
                .next()
                .map(|c| Value::Str(c.to_string().into()))
                .unwrap_or(Value::Null)),
            Value::Ran(start, _) => Ok(Value::Num(*start)),
            Value::XRan(start, _) => Ok(Value::Num(*start)),
            other => Err(LuzError::Semantic(
                format!("'firstof' is not defined for type '{}'", other.type_tag()),
                pos,
            )),
        }
    }

    pub fn last_of(&self, pos: Position) -> LuzResult<Value> {
        match self {
            Value::Arr(c) | Value::Vec(c) => Ok(c.borrow().last().cloned().unwrap_or(Value::Null)),
            Value::Set(s) => Ok(s.borrow().last().cloned().unwrap_or(Value::Null)),
            Value::Str(s) => Ok(s
                .chars()
                .last()
                .map(|c| Value::Str(c.to_string().into()))
                .unwrap_or(Value::Null)),
            Value::Ran(start, end) => {
                let step = Self::range_step(*start, *end);
                Ok(Value::Num(end - step))
            }
            Value::XRan(_, end) => Ok(Value::Num(*end)),
            other => Err(LuzError::Semantic(
                format!("'lastof' is not defined for type '{}'", other.type_tag()),
                pos,
            )),
        }
    }

    /// Plain formatting: the one `log`, string interpolation and `as str`
    /// use.
    #[must_use]
    pub fn format_plain(&self) -> String {
        let mut seen = Vec::new();
        self.fmt_plain_inner(&mut seen)
    }

    fn fmt_plain_inner(&self, seen: &mut Vec<usize>) -> String {
        match self {
            Value::Num(n) if n.is_infinite() => {
                if *n > 0.0 {
                    "inf".to_string()
                } else {
                    "-inf".to_string()
                }
            }
            Value::Num(n) if n.is_nan() => "null".to_string(),
            Value::Num(n) => format_num(*n),
            Value::Xl(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Str(s) => s.to_string(),
            Value::Null => "null".to_string(),
            Value::Maybe => "maybe".to_string(),
            Value::Ran(a, b) => format!("{}..{}", format_num(*a), format_num(*b)),
            Value::XRan(a, b) => format!("{}..={}", format_num(*a), format_num(*b)),
            Value::Arr(c) => fmt_container(c, "[", "]", seen, Value::fmt_plain_inner),
            Value::Vec(c) => fmt_container(c, "![", "]", seen, Value::fmt_plain_inner),
            Value::Set(s) => fmt_set(s, seen, Value::fmt_plain_inner),
        }
    }

    /// Debug formatting: quoted/escaped strings, `xl`-suffixed big ints.
    #[must_use]
    pub fn format_debug(&self) -> String {
        let mut seen = Vec::new();
        self.fmt_debug_inner(&mut seen)
    }

    fn fmt_debug_inner(&self, seen: &mut Vec<usize>) -> String {
        match self {
            Value::Xl(n) => format!("{n}xl"),
            Value::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('"');
                for c in s.chars() {
                    match c {
                        '\n' => out.push_str("\\n"),
                        '\t' => out.push_str("\\t"),
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        other => out.push(other),
                    }
                }
                out.push('"');
                out
            }
            Value::Arr(c) => fmt_container(c, "[", "]", seen, Value::fmt_debug_inner),
            Value::Vec(c) => fmt_container(c, "![", "]", seen, Value::fmt_debug_inner),
            Value::Set(s) => fmt_set(s, seen, Value::fmt_debug_inner),
            other => other.fmt_plain_inner(seen),
        }
    }
}

fn format_num(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

fn fmt_container(
    c: &Cell,
    open: &str,
    close: &str,
    seen: &mut Vec<usize>,
    f: impl Fn(&Value, &mut Vec<usize>) -> String,
) -> String {
    let ptr = Rc::as_ptr(c) as usize;
    if seen.contains(&ptr) {
        return format!("{open}...{close}");
    }
    seen.push(ptr);
    let parts: Vec<String> = c.borrow().iter().map(|v| f(v, seen)).collect();
    seen.pop();
    format!("{open}{}{close}", parts.join(" "))
}

fn fmt_set(
    s: &Rc<RefCell<LuzSet>>,
    seen: &mut Vec<usize>,
    f: impl Fn(&Value, &mut Vec<usize>) -> String,
) -> String {
    let ptr = Rc::as_ptr(s) as usize;
    if seen.contains(&ptr) {
        return "@{...}".to_string();
    }
    seen.push(ptr);
    let parts: Vec<String> = s.borrow().iter().map(|v| f(v, seen)).collect();
    seen.pop();
    format!("@{{{}}}", parts.join(" "))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_plain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_open_range_excludes_end() {
        let r = Value::Ran(0.0, 3.0);
        assert_eq!(
            r.range_elements(),
            vec![Value::Num(0.0), Value::Num(1.0), Value::Num(2.0)]
                .into_iter()
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn closed_range_includes_end() {
        let r = Value::XRan(0.0, 3.0);
        assert_eq!(r.range_elements().len(), 4);
    }

    #[test]
    fn degenerate_ranges() {
        assert_eq!(Value::Ran(2.0, 2.0).range_elements().len(), 0);
        assert_eq!(Value::XRan(2.0, 2.0).range_elements().len(), 1);
    }

    #[test]
    fn aggregate_equality_is_reference_identity() {
        let a = Value::arr(vec![Value::Num(1.0)]);
        let b = Value::arr(vec![Value::Num(1.0)]);
        assert!(!values_equal(&a, &b));
        let c = a.clone();
        assert!(values_equal(&a, &c));
    }

    #[test]
    fn set_remembers_last_insert() {
        let mut s = LuzSet::new();
        s.insert(Value::Num(1.0));
        s.insert(Value::Num(2.0));
        assert!(matches!(s.last(), Some(Value::Num(n)) if *n == 2.0));
        s.insert(Value::Num(1.0));
        assert!(matches!(s.last(), Some(Value::Num(n)) if *n == 1.0));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn deep_copy_does_not_alias() {
        let a = Value::arr(vec![Value::Num(1.0)]);
        let b = a.deep_copy();
        if let (Value::Arr(ca), Value::Arr(cb)) = (&a, &b) {
            cb.borrow_mut().push(Value::Num(2.0));
            assert_eq!(ca.borrow().len(), 1);
            assert_eq!(cb.borrow().len(), 2);
        } else {
            unreachable!()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other)
    }
}
