//! # luz
//!
//! A tiny, simple, expression-oriented embedded scripting language: a
//! single-pass, tree-walking interpreter for a small dynamically typed
//! language with numeric, big-integer, string, boolean, nullable and three
//! aggregate (fixed array, growable vector, ordered-last-insertion set)
//! value kinds, operator overloading, string interpolation, and a unified
//! `loop` construct.
//!
//! ```
//! use luz::Engine;
//!
//! let mut engine = Engine::new();
//! let v = engine.eval("x = 2 + 3 * 4; x").unwrap();
//! assert_eq!(v.format_plain(), "14");
//! ```
//!
//! This crate is the CORE described by its specification: the lexer,
//! parser/evaluator, value model, scope rules and control-flow engine. The
//! CLI front-end, I/O shims and version metadata are deliberately out of
//! scope — [`Engine`] consumes a source string and the handful of
//! callback-style collaborators ([`Host`] for `log`/`err`/`read_line`, plus
//! the `on_start`/`on_success`/`on_error`/`on_end` lifecycle hooks) any
//! embedding host wires up.

mod ast;
mod error;
mod interpreter;
mod limits;
mod ops;
mod parser;
mod position;
mod scope;
mod token;
mod value;

pub use error::{ExitCode, LuzError, LuzResult};
pub use interpreter::{Host, StepOutcome};
pub use limits::EngineLimits;
pub use position::Position;
pub use scope::{Binding, Scope};
pub use value::{values_equal, LuzSet, Value};

use interpreter::eval_source;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The [`Host`] an [`Engine::new`] starts with: `log`/`err` discard their
/// text, `read_line` always returns an empty line. Real hosts (a CLI, a
/// REPL, a test harness) call [`Engine::with_host`] to replace it.
struct NullHost;

impl Host for NullHost {
    fn log(&mut self, _text: &str) {}
    fn err(&mut self, _text: &str) {}
    fn read_line(&mut self, _prompt: Option<&str>) -> String {
        String::new()
    }
}

/// The driver (C8): owns the persistent [`Scope`] a sequence of [`Engine::run`]
/// calls shares, the [`EngineLimits`] that bound a runaway script, the PRNG
/// backing `maybe`/`as maybe`, and the script-level collaborators
/// `spec.md` §1 names — a [`Host`] plus the four lifecycle hooks.
///
/// One `Engine` is one interpreter instance; `spec.md` §5 is explicit that
/// there is no cross-instance shared state, so nothing here is `Sync`.
pub struct Engine {
    scope: Scope,
    limits: EngineLimits,
    rng: StdRng,
    host: Box<dyn Host>,
    on_start: Option<Box<dyn FnMut()>>,
    on_success: Option<Box<dyn FnMut(&Value)>>,
    on_error: Option<Box<dyn FnMut(&LuzError)>>,
    on_end: Option<Box<dyn FnMut(ExitCode)>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// A fresh engine: empty scope, unlimited [`EngineLimits`], PRNG seeded
    /// from system entropy, and a [`NullHost`] discarding all I/O until
    /// [`Engine::with_host`] replaces it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scope: Scope::new(),
            limits: EngineLimits::default(),
            rng: StdRng::from_entropy(),
            host: Box::new(NullHost),
            on_start: None,
            on_success: None,
            on_error: None,
            on_end: None,
        }
    }

    /// An engine whose PRNG (the `maybe`/`as maybe` source) is seeded
    /// deterministically, per `spec.md` §8's "determinism modulo `maybe`"
    /// property — tests that need a reproducible draw use this instead of
    /// [`Engine::new`].
    #[must_use]
    pub fn with_rng_seed(seed: u64) -> Self {
        let mut engine = Self::new();
        engine.rng = StdRng::seed_from_u64(seed);
        engine
    }

    #[must_use]
    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Replaces the [`Host`] collaborating on `log`/`err`/`read_line`.
    #[must_use]
    pub fn with_host(mut self, host: impl Host + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    /// Fires once, before a [`Engine::run`] call evaluates anything.
    pub fn on_start(&mut self, f: impl FnMut() + 'static) -> &mut Self {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Fires once a [`Engine::run`] call's program completes without error,
    /// with the program's final value.
    pub fn on_success(&mut self, f: impl FnMut(&Value) + 'static) -> &mut Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Fires once a [`Engine::run`] call's program aborts with an error.
    pub fn on_error(&mut self, f: impl FnMut(&LuzError) + 'static) -> &mut Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Fires last, always, with the [`ExitCode`] [`Engine::run`] is about to
    /// return — whether the program succeeded or failed.
    pub fn on_end(&mut self, f: impl FnMut(ExitCode) + 'static) -> &mut Self {
        self.on_end = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    #[must_use]
    pub fn limits(&self) -> &EngineLimits {
        &self.limits
    }

    /// Evaluates `src` and returns its value directly, bypassing exit-code
    /// mapping and the lifecycle hooks — the embedding entry point a Rust
    /// host calls when it wants the [`Value`] itself rather than a process
    /// exit status (mirrors the teacher's `Engine::eval`).
    pub fn eval(&mut self, src: &str) -> LuzResult<Value> {
        let span = tracing::debug_span!("luz::eval", bytes = src.len());
        let _enter = span.enter();
        eval_source(
            src,
            &mut self.scope,
            &self.limits,
            &mut self.rng,
            &mut *self.host,
        )
    }

    /// Runs one top-level program through the full lifecycle `spec.md` §1
    /// describes: `on_start`, the statement sequence (C8's
    /// tokenize → statements → hooks), then `on_success` or `on_error`,
    /// then `on_end` unconditionally. Returns the stable [`ExitCode`]
    /// (`spec.md` §6) a CLI front-end (out of scope here) maps directly
    /// onto its process exit status.
    pub fn run(&mut self, src: &str) -> ExitCode {
        if let Some(hook) = self.on_start.as_mut() {
            hook();
        }

        let result = self.eval(src);
        let code = result.as_ref().map_or_else(LuzError::code, |_| ExitCode::Success);

        match &result {
            Ok(v) => {
                tracing::trace!(value = %v.format_plain(), "luz script succeeded");
                if let Some(hook) = self.on_success.as_mut() {
                    hook(v);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, code = code.as_i32(), "luz script failed");
                if let Some(hook) = self.on_error.as_mut() {
                    hook(e);
                }
            }
        }

        if let Some(hook) = self.on_end.as_mut() {
            hook(code);
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn eval_returns_value_without_touching_hooks() {
        let mut engine = Engine::new();
        let v = engine.eval("1 + 2").unwrap();
        assert_eq!(v, Value::Num(3.0));
    }

    #[test]
    fn run_reports_success_exit_code_and_fires_hooks() {
        let mut engine = Engine::new();
        let started = Rc::new(RefCell::new(false));
        let ended_code = Rc::new(RefCell::new(None));

        let started2 = started.clone();
        engine.on_start(move || *started2.borrow_mut() = true);
        let ended_code2 = ended_code.clone();
        engine.on_end(move |code| *ended_code2.borrow_mut() = Some(code));

        let code = engine.run("1 + 1");
        assert_eq!(code, ExitCode::Success);
        assert!(*started.borrow());
        assert_eq!(*ended_code.borrow(), Some(ExitCode::Success));
    }

    #[test]
    fn run_maps_semantic_error_to_its_exit_code() {
        let mut engine = Engine::new();
        let code = engine.run("undefined_name");
        assert_eq!(code, ExitCode::SemanticError);
    }

    #[test]
    fn scope_persists_across_run_calls() {
        let mut engine = Engine::new();
        assert_eq!(engine.run("x = 10"), ExitCode::Success);
        let v = engine.eval("x + 1").unwrap();
        assert_eq!(v, Value::Num(11.0));
    }

    #[test]
    fn const_violation_surfaces_through_on_error_hook() {
        let mut engine = Engine::new();
        let seen = Rc::new(RefCell::new(false));
        let seen2 = seen.clone();
        engine.on_error(move |_e| *seen2.borrow_mut() = true);
        let code = engine.run("const c = 5; c = 6;");
        assert_eq!(code, ExitCode::SemanticError);
        assert!(*seen.borrow());
    }

    struct RecordingHost {
        log: Rc<RefCell<String>>,
    }
    impl Host for RecordingHost {
        fn log(&mut self, text: &str) {
            self.log.borrow_mut().push_str(text);
        }
        fn err(&mut self, _text: &str) {}
        fn read_line(&mut self, _prompt: Option<&str>) -> String {
            "42".to_string()
        }
    }

    #[test]
    fn custom_host_receives_log_and_get_calls() {
        let log = Rc::new(RefCell::new(String::new()));
        let mut engine = Engine::new().with_host(RecordingHost { log: log.clone() });
        let v = engine.eval("log get").unwrap();
        assert_eq!(v, Value::Null);
        assert_eq!(*log.borrow(), "42");
    }

    #[test]
    fn seeded_rng_is_deterministic_across_engines() {
        let mut a = Engine::with_rng_seed(7);
        let mut b = Engine::with_rng_seed(7);
        let va = a.eval("true as maybe").unwrap();
        let vb = b.eval("true as maybe").unwrap();
        assert_eq!(va, vb);
    }
}
