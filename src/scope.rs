//! Scope store (C4): a single flat name → binding mapping, with
//! snapshot/restore for block and iteration scopes.
//!
//! `spec.md` §3/§9 are explicit that the language has no true lexical
//! nesting: a block or loop iteration remembers only *which keys existed*
//! on entry, and on exit deletes whatever keys were introduced since —
//! writes to names that already existed in an outer scope persist. This is
//! modeled the way the design notes recommend: an explicit stack of
//! "introduced here" name sets, not full map clones (grounded on the
//! teacher's `Scope`, which instead tracks two parallel arrays for a very
//! different, lexically-nested call-stack model — the flat/snapshot
//! behaviour itself is spec-mandated, not teacher-derived).

use crate::value::Value;
use indexmap::IndexMap;
use smallvec::SmallVec;

/// Names introduced by a single block/iteration frame. Most frames declare a
/// handful of names, so this stays inline the way the teacher's own
/// `Scope` avoids heap allocation for its small per-call name lists.
type FrameNames = SmallVec<[String; 4]>;

/// `{ value, type, const }` as `spec.md` §3 describes it. `type_tag` is
/// cached at bind time purely as a convenience for `typeof`; it is always
/// recomputable from `value` and is refreshed on every rebind.
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub is_const: bool,
}

/// The interpreter's single variable scope.
#[derive(Debug, Default)]
pub struct Scope {
    vars: IndexMap<String, Binding>,
    /// Stack of "keys introduced since this mark" sets, one per open
    /// block/iteration.
    frames: Vec<FrameNames>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.vars.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.vars.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Removes a binding outright (`del NAME`). Returns whether it existed.
    /// Leaves the name in any enclosing frame's "introduced here" list,
    /// which is harmless: `pop_frame` removing an already-gone key is a
    /// no-op.
    pub fn remove(&mut self, name: &str) -> bool {
        self.vars.shift_remove(name).is_some()
    }

    /// Declares or overwrites `name`. If a block/loop frame is open, the
    /// first declaration of a previously-unknown name is recorded so it can
    /// be unwound on `pop_frame`. Rebinding a name that already existed
    /// before the frame opened is *not* recorded — per spec, such a write
    /// is visible to the enclosing scope after the block exits.
    pub fn declare(&mut self, name: &str, value: Value, is_const: bool) {
        let is_new = !self.vars.contains_key(name);
        self.vars
            .insert(name.to_string(), Binding { value, is_const });
        if is_new {
            if let Some(frame) = self.frames.last_mut() {
                frame.push(name.to_string());
            }
        }
    }

    /// Opens a new block/iteration frame.
    pub fn push_frame(&mut self) {
        self.frames.push(FrameNames::new());
    }

    /// Closes the most recently opened frame, removing every name first
    /// introduced within it. `const`-ness is never sticky across a pop: a
    /// name re-declared after the pop starts fresh, exactly as spec.md's
    /// per-iteration `const` note requires.
    pub fn pop_frame(&mut self) {
        if let Some(introduced) = self.frames.pop() {
            for name in introduced {
                self.vars.shift_remove(&name);
            }
        }
    }

    /// Runs `f` inside a fresh frame, always popping it afterwards — even
    /// if `f` returns an error or a control-flow signal, matching the "any
    /// other thrown object propagates after scope cleanup" rule for loop
    /// bodies and blocks (spec.md §4.5/§7).
    pub fn with_frame<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.push_frame();
        let result = f(self);
        self.pop_frame();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_cleanup_removes_only_new_keys() {
        let mut scope = Scope::new();
        scope.declare("x", Value::Num(1.0), false);
        scope.with_frame(|s| {
            s.declare("y", Value::Num(2.0), false);
            s.declare("x", Value::Num(3.0), false);
        });
        assert!(scope.contains("x"));
        assert!(!scope.contains("y"));
        assert!(matches!(scope.get("x").unwrap().value, Value::Num(n) if n == 3.0));
    }

    #[test]
    fn const_is_not_sticky_across_frames() {
        let mut scope = Scope::new();
        scope.with_frame(|s| {
            s.declare("c", Value::Num(1.0), true);
        });
        scope.with_frame(|s| {
            s.declare("c", Value::Num(2.0), false);
            assert!(!s.get("c").unwrap().is_const);
        });
    }
}
