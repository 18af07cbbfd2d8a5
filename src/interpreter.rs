//! Expression evaluator (C6) — evaluation half — plus the control-flow
//! engine (C7). Walks the `Expr` AST `parser.rs` builds, using `ops.rs` for
//! the operator kernel and `scope.rs` for the flat, frame-snapshotted
//! variable store.
//!
//! `break`/`continue` are not exceptions: each statement evaluates to a
//! [`StepOutcome`], and any sequence of statements (a block, an `if` branch,
//! a loop body) stops at the first non-`Normal` outcome and hands it
//! upward unevaluated — the same short-circuit a thrown control object
//! would unwind through the teacher's call stack, but as an ordinary return
//! value instead of a panic/exception (see `SPEC_FULL.md` §A).

use crate::ast::*;
use crate::error::{LuzError, LuzResult};
use crate::limits::{EngineLimits, OperationCounter};
use crate::position::Position;
use crate::scope::Scope;
use crate::value::{LuzSet, Value};
use crate::{ops, parser};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use rand::rngs::StdRng;

fn semantic(msg: impl Into<String>, pos: Position) -> LuzError {
    LuzError::Semantic(msg.into(), pos)
}

fn invalid(msg: impl Into<String>, pos: Position) -> LuzError {
    LuzError::InvalidInstruction(msg.into(), pos)
}

/// What evaluating one statement produced: an ordinary value, or a
/// `break`/`continue` signal still looking for the loop boundary that will
/// absorb it.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Normal(Value),
    Break(Value),
    Continue,
}

/// Everything the outside world plugs in: where `log`/`logln` write, where
/// `get`/`getln` read from, and where error text is reported. A plain trait
/// object (not a generic parameter) so `Engine` in `lib.rs` stays simple.
pub trait Host {
    fn log(&mut self, text: &str);
    fn err(&mut self, text: &str);
    /// `prompt` is the evaluated operand of `get`/`getln`, if any. Returns
    /// one line of input with the trailing newline stripped.
    fn read_line(&mut self, prompt: Option<&str>) -> String;
}

/// Walks a parsed program against a [`Scope`], honoring [`EngineLimits`] and
/// routing `log`/`get` through a [`Host`]. One instance is built per
/// top-level `run` call; the `Scope` itself is usually owned by `Engine` and
/// persists across calls.
pub struct Interpreter<'a> {
    scope: &'a mut Scope,
    limits: &'a EngineLimits,
    rng: &'a mut StdRng,
    host: &'a mut dyn Host,
    ops_counter: OperationCounter,
    get_token_stack: Vec<String>,
    loop_depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        scope: &'a mut Scope,
        limits: &'a EngineLimits,
        rng: &'a mut StdRng,
        host: &'a mut dyn Host,
    ) -> Self {
        Self {
            scope,
            limits,
            rng,
            host,
            ops_counter: OperationCounter::default(),
            get_token_stack: Vec::new(),
            loop_depth: 0,
        }
    }

    /// Runs a whole program (the driver's entry point, C8). `break`/
    /// `continue` escaping every enclosing loop is a semantic error, same as
    /// inside a block with no loop around it.
    pub fn run_program(&mut self, program: &[Expr]) -> LuzResult<Value> {
        match self.eval_block(program)? {
            StepOutcome::Normal(v) => Ok(v),
            StepOutcome::Break(_) => Err(semantic("'break' outside loop", Position::NONE)),
            StepOutcome::Continue => Err(semantic("'continue' outside loop", Position::NONE)),
        }
    }

    /// Evaluates a statement sequence, short-circuiting at the first
    /// `break`/`continue` it produces — the rest of the block simply never
    /// runs.
    fn eval_block(&mut self, stmts: &[Expr]) -> LuzResult<StepOutcome> {
        let mut last = Value::Null;
        for stmt in stmts {
            self.ops_counter.tick(self.limits, stmt.position())?;
            match self.eval(stmt)? {
                StepOutcome::Normal(v) => last = v,
                other => return Ok(other),
            }
        }
        Ok(StepOutcome::Normal(last))
    }

    /// Runs `stmts` inside a fresh scope frame, popping it on every exit
    /// path (normal, break, continue, or error) via `Scope::pop_frame`'s own
    /// unconditional cleanup.
    fn eval_branch(&mut self, stmts: &[Expr]) -> LuzResult<StepOutcome> {
        self.scope.push_frame();
        let result = self.eval_block(stmts);
        self.scope.pop_frame();
        result
    }

    /// Evaluates `e` for its value, converting an escaping `break`/
    /// `continue` into a `SemanticError`: outside of block-sequencing
    /// position (handled directly by `eval_block`/loop bodies), a
    /// control-flow signal has nowhere left to go.
    fn eval_value(&mut self, e: &Expr) -> LuzResult<Value> {
        match self.eval(e)? {
            StepOutcome::Normal(v) => Ok(v),
            StepOutcome::Break(_) => Err(semantic("'break' outside loop", e.position())),
            StepOutcome::Continue => Err(semantic("'continue' outside loop", e.position())),
        }
    }

    fn eval(&mut self, e: &Expr) -> LuzResult<StepOutcome> {
        let v = match e {
            Expr::Num(n) => Value::Num(*n),
            Expr::BigInt(n) => Value::Xl(n.clone()),
            Expr::Str(s) => Value::Str(s.as_str().into()),
            Expr::InterpStr(parts) => Value::Str(self.eval_interp(parts)?.into()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Null => Value::Null,
            Expr::Maybe => Value::Maybe,
            Expr::Ident(name) => self
                .scope
                .get(name)
                .map(|b| b.value.clone())
                .ok_or_else(|| semantic(format!("undefined variable '{name}'"), e.position()))?,

            Expr::ContainerLit(kind, items) => self.eval_container_lit(*kind, items)?,
            Expr::ContainerRepeat(kind, elem, count) => {
                self.eval_container_repeat(*kind, elem, count, e.position())?
            }

            Expr::Unary(op, inner, pos) => {
                let v = self.eval_value(inner)?;
                ops::unary(*op, &v, *pos)?
            }
            Expr::Binary(op, l, r, pos) => return self.eval_binary(*op, l, r, *pos),
            Expr::Range(kind, l, r, pos) => {
                let lv = to_range_endpoint(&self.eval_value(l)?, *pos)?;
                let rv = to_range_endpoint(&self.eval_value(r)?, *pos)?;
                match kind {
                    RangeKind::HalfOpen => Value::Ran(lv, rv),
                    RangeKind::Closed => Value::XRan(lv, rv),
                }
            }

            Expr::Assign(target, op, rhs, pos) => self.eval_assign(target, *op, rhs, *pos)?,
            Expr::Swap(l, r, pos) => self.eval_swap(l, r, *pos)?,
            Expr::PreIncDec(kind, inner, pos) => self.eval_incdec(*kind, inner, *pos, true)?,
            Expr::PostIncDec(kind, inner, pos) => self.eval_incdec(*kind, inner, *pos, false)?,

            Expr::Index(c, idx, pos) => {
                let cv = self.eval_value(c)?;
                let iv = self.eval_value(idx)?;
                self.read_index(&cv, &iv, *pos)?
            }
            Expr::DotIndex(c, n, pos) => {
                let cv = self.eval_value(c)?;
                self.read_index(&cv, &Value::Num(*n as f64), *pos)?
            }

            Expr::Cast(inner, target, pos) => {
                let v = self.eval_value(inner)?;
                let target_name = match target {
                    CastTarget::Type(name) => name.clone(),
                    CastTarget::TypeOfExpr(te) => self.eval_value(te)?.type_tag().to_string(),
                };
                ops::cast(&v, &target_name, *pos, self.rng)?
            }

            Expr::If(if_expr) => return self.eval_if(if_expr),
            Expr::Loop(loop_expr) => return self.eval_loop(loop_expr),
            Expr::Break(value, _pos) => {
                let v = match value {
                    Some(ve) => self.eval_value(ve)?,
                    None => Value::Null,
                };
                return Ok(StepOutcome::Break(v));
            }
            Expr::Continue(_) => return Ok(StepOutcome::Continue),

            Expr::Intrinsic(kind, inner, pos) => self.eval_intrinsic(*kind, inner, *pos)?,
            Expr::Del(target, pos) => self.eval_del(target, *pos)?,
            Expr::Log(kind, operand, _) => self.eval_log(*kind, operand)?,
            Expr::Get(kind, operand, _) => self.eval_get(*kind, operand)?,

            Expr::ConstDecl(name, value_expr, pos) => {
                let v = self.eval_value(value_expr)?;
                if let Some(existing) = self.scope.get(name) {
                    if existing.is_const {
                        return Err(semantic(format!("cannot reassign const '{name}'"), *pos));
                    }
                }
                self.scope.declare(name, v.clone(), true);
                v
            }

            Expr::Block(stmts) => return self.eval_branch(stmts),
        };
        Ok(StepOutcome::Normal(v))
    }

    // ---- binary / short-circuit -------------------------------------

    fn eval_binary(&mut self, op: BinOp, l: &Expr, r: &Expr, pos: Position) -> LuzResult<StepOutcome> {
        let v = match op {
            BinOp::And => {
                let lv = self.eval_value(l)?;
                if !lv.truthy() {
                    lv
                } else {
                    self.eval_value(r)?
                }
            }
            BinOp::Or => {
                let lv = self.eval_value(l)?;
                if lv.truthy() {
                    lv
                } else {
                    self.eval_value(r)?
                }
            }
            BinOp::Nullish => {
                let lv = self.eval_value(l)?;
                if !matches!(lv, Value::Null) {
                    lv
                } else {
                    self.eval_value(r)?
                }
            }
            other => {
                let lv = self.eval_value(l)?;
                let rv = self.eval_value(r)?;
                ops::binary(other, &lv, &rv, pos)?
            }
        };
        Ok(StepOutcome::Normal(v))
    }

    // ---- containers ---------------------------------------------------

    fn eval_container_lit(&mut self, kind: ContainerKind, items: &[Expr]) -> LuzResult<Value> {
        let mut vals = Vec::with_capacity(items.len());
        for item in items {
            vals.push(self.eval_value(item)?);
        }
        self.limits.check_array_size(vals.len(), Position::NONE)?;
        Ok(build_container(kind, vals))
    }

    fn eval_container_repeat(
        &mut self,
        kind: ContainerKind,
        elem: &Expr,
        count: &Expr,
        pos: Position,
    ) -> LuzResult<Value> {
        let count_val = self.eval_value(count)?;
        let n = as_index(&count_val, pos)?;
        if n < 0 {
            return Err(semantic("length-replication count must not be negative", pos));
        }
        let mut vals = Vec::with_capacity(n as usize);
        for _ in 0..n {
            // Re-evaluated once per index (spec.md §4.4): `[rnd(); 3]` draws
            // three independent values, it does not replicate one draw.
            vals.push(self.eval_value(elem)?);
        }
        self.limits.check_array_size(vals.len(), pos)?;
        Ok(build_container(kind, vals))
    }

    fn eval_interp(&mut self, parts: &[InterpPart]) -> LuzResult<String> {
        let mut out = String::new();
        for part in parts {
            match part {
                InterpPart::Literal(s) => out.push_str(s),
                InterpPart::Expr(e) => out.push_str(&self.eval_value(e)?.format_plain()),
            }
        }
        self.limits.check_string_size(out.chars().count(), Position::NONE)?;
        Ok(out)
    }

    // ---- if / loop ------------------------------------------------------

    fn eval_if(&mut self, if_expr: &IfExpr) -> LuzResult<StepOutcome> {
        let cond = self.eval_value(&if_expr.cond)?;
        if cond.truthy() {
            self.eval_branch(&if_expr.then_branch)
        } else {
            match &if_expr.else_branch {
                Some(Expr::If(inner)) => self.eval_if(inner),
                Some(Expr::Block(stmts)) => self.eval_branch(stmts),
                None => Ok(StepOutcome::Normal(Value::Null)),
                Some(other) => self.eval(other),
            }
        }
    }

    fn eval_loop(&mut self, l: &LoopExpr) -> LuzResult<StepOutcome> {
        self.loop_depth += 1;
        let result = self
            .limits
            .check_loop_nesting(self.loop_depth, l.pos)
            .and_then(|()| self.eval_loop_inner(l));
        self.loop_depth -= 1;
        result
    }

    fn eval_loop_inner(&mut self, l: &LoopExpr) -> LuzResult<StepOutcome> {
        match &l.shape {
            LoopShape::Infinite => loop {
                self.ops_counter.tick(self.limits, l.pos)?;
                match self.eval_branch(&l.body)? {
                    StepOutcome::Break(v) => return Ok(StepOutcome::Normal(v)),
                    StepOutcome::Continue | StepOutcome::Normal(_) => {}
                }
            },
            LoopShape::While(cond) => loop {
                self.ops_counter.tick(self.limits, l.pos)?;
                if !self.eval_value(cond)?.truthy() {
                    return Ok(StepOutcome::Normal(Value::Null));
                }
                match self.eval_branch(&l.body)? {
                    StepOutcome::Break(v) => return Ok(StepOutcome::Normal(v)),
                    StepOutcome::Continue | StepOutcome::Normal(_) => {}
                }
            },
            LoopShape::ForIn(var, iter_expr) => {
                let iter_val = self.eval_value(iter_expr)?;
                let elements = self.iterate(&iter_val, l.pos)?;
                for item in elements {
                    self.ops_counter.tick(self.limits, l.pos)?;
                    self.scope.push_frame();
                    self.scope.declare(var, item, false);
                    let outcome = self.eval_block(&l.body);
                    self.scope.pop_frame();
                    match outcome? {
                        StepOutcome::Break(v) => return Ok(StepOutcome::Normal(v)),
                        StepOutcome::Continue | StepOutcome::Normal(_) => {}
                    }
                }
                Ok(StepOutcome::Normal(Value::Null))
            }
        }
    }

    fn iterate(&self, v: &Value, pos: Position) -> LuzResult<Vec<Value>> {
        match v {
            Value::Ran(_, _) | Value::XRan(_, _) => Ok(v.range_elements()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string().into())).collect()),
            Value::Arr(c) | Value::Vec(c) => Ok(c.borrow().clone()),
            other => Err(semantic(
                format!("'{}' is not iterable in a for-in loop", other.type_tag()),
                pos,
            )),
        }
    }

    // ---- assignment / swap / inc-dec ----------------------------------

    fn eval_assign(
        &mut self,
        target: &Expr,
        op: AssignOp,
        rhs: &Expr,
        pos: Position,
    ) -> LuzResult<Value> {
        let rhs_val = self.eval_value(rhs)?;
        match target {
            Expr::Ident(name) => {
                let existing = self.scope.get(name).cloned();
                if let Some(b) = &existing {
                    if b.is_const {
                        return Err(semantic(format!("cannot reassign const '{name}'"), pos));
                    }
                }
                let new_val = match op {
                    AssignOp::Assign => rhs_val,
                    _ => {
                        let old = existing
                            .map(|b| b.value)
                            .ok_or_else(|| semantic(format!("undefined variable '{name}'"), pos))?;
                        ops::binary(assign_op_to_binop(op), &old, &rhs_val, pos)?
                    }
                };
                if let Value::Str(s) = &new_val {
                    self.limits.check_string_size(s.chars().count(), pos)?;
                }
                self.scope.declare(name, new_val.clone(), false);
                Ok(new_val)
            }
            Expr::Index(c, idx, ipos) => {
                let cv = self.eval_value(c)?;
                let iv = self.eval_value(idx)?;
                let new_val = self.compute_compound(&cv, &iv, op, rhs_val, *ipos)?;
                self.write_index(&cv, &iv, new_val.clone(), *ipos)?;
                Ok(new_val)
            }
            Expr::DotIndex(c, n, ipos) => {
                let cv = self.eval_value(c)?;
                let iv = Value::Num(*n as f64);
                let new_val = self.compute_compound(&cv, &iv, op, rhs_val, *ipos)?;
                self.write_index(&cv, &iv, new_val.clone(), *ipos)?;
                Ok(new_val)
            }
            _ => Err(semantic("invalid assignment target", pos)),
        }
    }

    fn compute_compound(
        &self,
        container: &Value,
        idx: &Value,
        op: AssignOp,
        rhs_val: Value,
        pos: Position,
    ) -> LuzResult<Value> {
        match op {
            AssignOp::Assign => Ok(rhs_val),
            _ => {
                let old = self.read_index(container, idx, pos)?;
                ops::binary(assign_op_to_binop(op), &old, &rhs_val, pos)
            }
        }
    }

    fn eval_swap(&mut self, l: &Expr, r: &Expr, pos: Position) -> LuzResult<Value> {
        let _ = pos;
        let lv = self.read_lvalue(l)?;
        let rv = self.read_lvalue(r)?;
        let equal = lv == rv;
        self.write_lvalue(l, rv)?;
        self.write_lvalue(r, lv)?;
        Ok(Value::Bool(!equal))
    }

    fn read_lvalue(&mut self, e: &Expr) -> LuzResult<Value> {
        match e {
            Expr::Ident(name) => self
                .scope
                .get(name)
                .map(|b| b.value.clone())
                .ok_or_else(|| semantic(format!("undefined variable '{name}'"), e.position())),
            Expr::Index(c, idx, pos) => {
                let cv = self.eval_value(c)?;
                let iv = self.eval_value(idx)?;
                self.read_index(&cv, &iv, *pos)
            }
            Expr::DotIndex(c, n, pos) => {
                let cv = self.eval_value(c)?;
                self.read_index(&cv, &Value::Num(*n as f64), *pos)
            }
            _ => Err(semantic("invalid l-value", e.position())),
        }
    }

    fn write_lvalue(&mut self, e: &Expr, new_val: Value) -> LuzResult<()> {
        match e {
            Expr::Ident(name) => {
                if let Some(b) = self.scope.get(name) {
                    if b.is_const {
                        return Err(semantic(format!("cannot reassign const '{name}'"), e.position()));
                    }
                }
                self.scope.declare(name, new_val, false);
                Ok(())
            }
            Expr::Index(c, idx, pos) => {
                let cv = self.eval_value(c)?;
                let iv = self.eval_value(idx)?;
                self.write_index(&cv, &iv, new_val, *pos)
            }
            Expr::DotIndex(c, n, pos) => {
                let cv = self.eval_value(c)?;
                self.write_index(&cv, &Value::Num(*n as f64), new_val, *pos)
            }
            _ => Err(semantic("invalid l-value", e.position())),
        }
    }

    fn eval_incdec(&mut self, kind: IncDec, inner: &Expr, pos: Position, is_prefix: bool) -> LuzResult<Value> {
        let name = match inner {
            Expr::Ident(n) => n.clone(),
            _ => return Err(semantic("'++'/'--' target must be a variable", pos)),
        };
        let binding = self
            .scope
            .get(&name)
            .cloned()
            .ok_or_else(|| semantic(format!("undefined variable '{name}'"), pos))?;
        if binding.is_const {
            return Err(semantic(format!("cannot modify const '{name}'"), pos));
        }
        let delta: i64 = match kind {
            IncDec::Inc => 1,
            IncDec::Dec => -1,
        };
        let new_val = match &binding.value {
            Value::Num(n) => Value::Num(n + delta as f64),
            Value::Xl(n) => Value::Xl(n + BigInt::from(delta)),
            other => {
                return Err(semantic(
                    format!("'++'/'--' is not defined for '{}'", other.type_tag()),
                    pos,
                ))
            }
        };
        self.scope.declare(&name, new_val.clone(), false);
        Ok(if is_prefix { new_val } else { binding.value })
    }

    // ---- indexing -------------------------------------------------------

    fn read_index(&self, container: &Value, idx: &Value, pos: Position) -> LuzResult<Value> {
        if matches!(idx, Value::Ran(_, _) | Value::XRan(_, _)) {
            return self.slice(container, idx, pos);
        }
        match container {
            Value::Arr(c) | Value::Vec(c) => {
                let i = as_index(idx, pos)?;
                let items = c.borrow();
                if i < 0 || i as usize >= items.len() {
                    Ok(Value::Null)
                } else {
                    Ok(items[i as usize].clone())
                }
            }
            Value::Str(s) => {
                let i = as_index(idx, pos)?;
                let chars: Vec<char> = s.chars().collect();
                if i < 0 || i as usize >= chars.len() {
                    Ok(Value::Null)
                } else {
                    Ok(Value::Str(chars[i as usize].to_string().into()))
                }
            }
            other => Err(semantic(format!("cannot index '{}'", other.type_tag()), pos)),
        }
    }

    fn slice(&self, container: &Value, range_val: &Value, pos: Position) -> LuzResult<Value> {
        let indices: Vec<i64> = range_val
            .range_elements()
            .into_iter()
            .map(|v| match v {
                Value::Num(n) => n as i64,
                _ => unreachable!("range_elements always yields Num"),
            })
            .collect();
        match container {
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let out: String = indices
                    .iter()
                    .filter_map(|&i| {
                        if i >= 0 && (i as usize) < chars.len() {
                            Some(chars[i as usize])
                        } else {
                            None
                        }
                    })
                    .collect();
                Ok(Value::Str(out.into()))
            }
            Value::Arr(c) => {
                let items = c.borrow();
                let out: Vec<Value> = indices
                    .iter()
                    .filter_map(|&i| {
                        if i >= 0 && (i as usize) < items.len() {
                            Some(items[i as usize].clone())
                        } else {
                            None
                        }
                    })
                    .collect();
                Ok(Value::arr(out))
            }
            Value::Vec(c) => {
                let items = c.borrow();
                let out: Vec<Value> = indices
                    .iter()
                    .filter_map(|&i| {
                        if i >= 0 && (i as usize) < items.len() {
                            Some(items[i as usize].clone())
                        } else {
                            None
                        }
                    })
                    .collect();
                Ok(Value::vec(out))
            }
            other => Err(semantic(format!("cannot slice '{}'", other.type_tag()), pos)),
        }
    }

    fn write_index(&mut self, container: &Value, idx: &Value, new_val: Value, pos: Position) -> LuzResult<()> {
        let i = as_index(idx, pos)?;
        match container {
            Value::Arr(c) => {
                let mut items = c.borrow_mut();
                let len = items.len() as i64;
                if i < 0 || i >= len {
                    return Err(invalid(
                        format!("index {i} out of bounds for 'arr' of length {len}"),
                        pos,
                    ));
                }
                items[i as usize] = new_val;
                Ok(())
            }
            Value::Vec(c) => {
                let mut items = c.borrow_mut();
                let len = items.len() as i64;
                if i < 0 || i >= len {
                    return Err(invalid(
                        format!("index {i} out of bounds for 'vec' of length {len}"),
                        pos,
                    ));
                }
                items[i as usize] = new_val;
                Ok(())
            }
            other => Err(semantic(
                format!("cannot index-assign into '{}'", other.type_tag()),
                pos,
            )),
        }
    }

    // ---- intrinsics / del / log / get ----------------------------------

    fn eval_intrinsic(&mut self, kind: Intrinsic, inner: &Expr, pos: Position) -> LuzResult<Value> {
        let v = self.eval_value(inner)?;
        Ok(match kind {
            Intrinsic::LenOf => Value::Num(v.len_of(pos)? as f64),
            Intrinsic::SizeOf => Value::Num(v.size_of() as f64),
            Intrinsic::TypeOf => Value::Str(v.type_tag().into()),
            Intrinsic::CopyOf => v.deep_copy(),
            Intrinsic::FirstOf => v.first_of(pos)?,
            Intrinsic::LastOf => v.last_of(pos)?,
        })
    }

    fn eval_del(&mut self, target: &Expr, pos: Position) -> LuzResult<Value> {
        match target {
            Expr::Ident(name) => {
                if !self.scope.remove(name) {
                    return Err(semantic(format!("undefined variable '{name}'"), pos));
                }
                Ok(Value::Null)
            }
            Expr::Index(c, idx, ipos) => {
                let cv = self.eval_value(c)?;
                let iv = self.eval_value(idx)?;
                self.del_index(&cv, &iv, *ipos)
            }
            Expr::DotIndex(c, n, ipos) => {
                let cv = self.eval_value(c)?;
                self.del_index(&cv, &Value::Num(*n as f64), *ipos)
            }
            _ => Err(semantic("invalid 'del' target", pos)),
        }
    }

    fn del_index(&mut self, container: &Value, idx: &Value, pos: Position) -> LuzResult<Value> {
        match container {
            Value::Arr(_) => Err(invalid("cannot remove elements from a fixed-size 'arr'", pos)),
            Value::Vec(c) => {
                let i = as_index(idx, pos)?;
                let mut items = c.borrow_mut();
                if i < 0 || i as usize >= items.len() {
                    return Err(invalid(format!("index {i} out of bounds"), pos));
                }
                Ok(items.remove(i as usize))
            }
            Value::Set(s) => Ok(Value::Bool(s.borrow_mut().remove(idx))),
            other => Err(semantic(format!("cannot 'del' from '{}'", other.type_tag()), pos)),
        }
    }

    fn eval_log(&mut self, kind: LogKind, operand: &Option<Box<Expr>>) -> LuzResult<Value> {
        let text = match operand {
            Some(e) => self.eval_value(e)?.format_plain(),
            None => String::new(),
        };
        let out = match kind {
            LogKind::Log => text,
            LogKind::LogLn => format!("{text}\n"),
        };
        self.host.log(&out);
        Ok(Value::Null)
    }

    fn eval_get(&mut self, kind: GetKind, operand: &Option<Box<Expr>>) -> LuzResult<Value> {
        let prompt = match operand {
            Some(e) => Some(self.eval_value(e)?.format_plain()),
            None => None,
        };
        match kind {
            GetKind::GetLn => Ok(Value::Str(self.host.read_line(prompt.as_deref()).into())),
            GetKind::Get => {
                if self.get_token_stack.is_empty() {
                    let line = self.host.read_line(prompt.as_deref());
                    self.get_token_stack = line.split_whitespace().rev().map(str::to_string).collect();
                }
                Ok(Value::Str(self.get_token_stack.pop().unwrap_or_default().into()))
            }
        }
    }
}

fn build_container(kind: ContainerKind, vals: Vec<Value>) -> Value {
    match kind {
        ContainerKind::Arr => Value::arr(vals),
        ContainerKind::Vec => Value::vec(vals),
        ContainerKind::Set => {
            let mut s = LuzSet::new();
            for v in vals {
                s.insert(v);
            }
            Value::set(s)
        }
    }
}

fn assign_op_to_binop(op: AssignOp) -> BinOp {
    match op {
        AssignOp::Assign => unreachable!("plain assignment never goes through the operator kernel"),
        AssignOp::Add => BinOp::Add,
        AssignOp::Sub => BinOp::Sub,
        AssignOp::Mul => BinOp::Mul,
        AssignOp::Div => BinOp::Div,
        AssignOp::FloorDiv => BinOp::FloorDiv,
        AssignOp::Mod => BinOp::Mod,
        AssignOp::Pow => BinOp::Pow,
    }
}

fn as_index(v: &Value, pos: Position) -> LuzResult<i64> {
    match v {
        Value::Num(n) => Ok(*n as i64),
        Value::Xl(n) => n
            .to_i64()
            .ok_or_else(|| invalid("big integer too large for an index", pos)),
        other => Err(semantic(format!("index must be numeric, got '{}'", other.type_tag()), pos)),
    }
}

fn to_range_endpoint(v: &Value, pos: Position) -> LuzResult<f64> {
    match v {
        Value::Num(n) => Ok(*n),
        Value::Xl(n) => n
            .to_f64()
            .ok_or_else(|| invalid("big integer too large to use as a range endpoint", pos)),
        other => Err(semantic(
            format!("range endpoints must be numeric, got '{}'", other.type_tag()),
            pos,
        )),
    }
}

/// Drives an entire program via [`parser::parse_program`] then
/// [`Interpreter::run_program`] — what `lib.rs`'s driver (C8) calls
/// directly.
pub fn eval_source(
    src: &str,
    scope: &mut Scope,
    limits: &EngineLimits,
    rng: &mut StdRng,
    host: &mut dyn Host,
) -> LuzResult<Value> {
    let program = parser::parse_program(src)?;
    Interpreter::new(scope, limits, rng, host).run_program(&program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    struct NullHost {
        out: String,
        lines: Vec<String>,
    }

    impl NullHost {
        fn new(lines: &[&str]) -> Self {
            Self {
                out: String::new(),
                lines: lines.iter().rev().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl Host for NullHost {
        fn log(&mut self, text: &str) {
            self.out.push_str(text);
        }
        fn err(&mut self, _text: &str) {}
        fn read_line(&mut self, _prompt: Option<&str>) -> String {
            self.lines.pop().unwrap_or_default()
        }
    }

    fn run(src: &str) -> LuzResult<Value> {
        let mut scope = Scope::new();
        let limits = EngineLimits::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut host = NullHost::new(&[]);
        eval_source(src, &mut scope, &limits, &mut rng, &mut host)
    }

    #[test]
    fn arithmetic_and_assignment() {
        let v = run("x = 2 + 3 * 4; x").unwrap();
        assert_eq!(v, Value::Num(20.0));
    }

    #[test]
    fn const_rebind_fails() {
        let err = run("const c = 5; c = 6;").unwrap_err();
        assert!(matches!(err, LuzError::Semantic(_, _)));
    }

    #[test]
    fn block_cleanup_does_not_leak_new_names() {
        let err = run("if true { y = 1; } y").unwrap_err();
        assert!(matches!(err, LuzError::Semantic(_, _)));
    }

    #[test]
    fn block_write_through_outer_name_persists() {
        let v = run("x = 1; if true { x = 2; } x").unwrap();
        assert_eq!(v, Value::Num(2.0));
    }

    #[test]
    fn for_in_loop_accumulates() {
        let v = run("total = 0; loop i in 1..=3 { total += i; } total").unwrap();
        assert_eq!(v, Value::Num(6.0));
    }

    #[test]
    fn break_with_value_stops_loop_and_yields_it() {
        let v = run("r = loop i in 1..10 { if i == 3 { break i * 10; } }; r").unwrap();
        assert_eq!(v, Value::Num(30.0));
    }

    #[test]
    fn continue_skips_rest_of_body() {
        let v = run("total = 0; loop i in 1..=4 { if i == 2 { continue; } total += i; } total").unwrap();
        assert_eq!(v, Value::Num(8.0));
    }

    #[test]
    fn break_outside_loop_is_semantic_error() {
        let err = run("break 1").unwrap_err();
        assert!(matches!(err, LuzError::Semantic(_, _)));
    }

    #[test]
    fn short_circuit_and_avoids_division_error() {
        let v = run("false && (1/0 == 1)").unwrap();
        assert_eq!(v, Value::Bool(false));
    }

    #[test]
    fn vec_push_then_index() {
        let v = run("v = ![1 2 3]; v += 4; v[3]").unwrap();
        assert_eq!(v, Value::Num(4.0));
    }

    #[test]
    fn arr_fixed_size_index_assign_ok_but_append_fails() {
        let v = run("a = [1 2 3]; a[0] = 9; a[0]").unwrap();
        assert_eq!(v, Value::Num(9.0));
        let err = run("a = [1 2 3]; a += 4;").unwrap_err();
        assert!(matches!(err, LuzError::InvalidInstruction(_, _)));
    }

    #[test]
    fn swap_reports_whether_values_differed() {
        let v = run("a = 1; b = 2; a <=> b").unwrap();
        assert_eq!(v, Value::Bool(true));
        let v = run("a = 1; b = 1; a <=> b").unwrap();
        assert_eq!(v, Value::Bool(false));
    }

    #[test]
    fn string_interpolation_formats_values() {
        let v = run(r#"name = "world"; "hello {name}!""#).unwrap();
        assert_eq!(v, Value::Str("hello world!".into()));
    }

    #[test]
    fn get_reads_whitespace_separated_tokens() {
        let mut scope = Scope::new();
        let limits = EngineLimits::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut host = NullHost::new(&["7 8"]);
        let v = eval_source("a = get; b = get; a + b", &mut scope, &limits, &mut rng, &mut host)
            .unwrap();
        assert_eq!(v, Value::Str("78".into()));
    }
}
