//! # Failure Capture
//!
//! Expectation results record the values they compared. Those values may be
//! shared and mutable; if the code under test keeps changing them after a
//! failure, the reporter would display the later state. [`FailureCapture`]
//! runs on every result the engine builds and, for failures only, swaps
//! `expected` and `actual` for shallow copies taken at that moment.
//!
//! Values are passed through unchanged when they are scalars, `null` /
//! `undefined`, functions, or accepted by the opaque predicate. Host nodes are
//! opaque by default; environments with other live handles inject their own
//! predicate.

use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// Outcome of a single `expect(...)` call, as handed to reporters.
#[derive(Debug, Clone)]
pub struct ExpectationResult {
    pub matcher_name: String,
    pub passed: bool,
    pub message: String,
    pub expected: Value,
    pub actual: Value,
}

impl ExpectationResult {
    pub fn passed(matcher_name: impl Into<String>, expected: Value, actual: Value) -> Self {
        Self {
            matcher_name: matcher_name.into(),
            passed: true,
            message: String::new(),
            expected,
            actual,
        }
    }

    pub fn failed(
        matcher_name: impl Into<String>,
        message: impl Into<String>,
        expected: Value,
        actual: Value,
    ) -> Self {
        Self {
            matcher_name: matcher_name.into(),
            passed: false,
            message: message.into(),
            expected,
            actual,
        }
    }
}

pub type OpaquePredicate = Rc<dyn Fn(&Value) -> bool>;

/// Post-processing step applied to every expectation result the engine builds.
#[derive(Clone)]
pub struct FailureCapture {
    is_opaque: OpaquePredicate,
}

impl Default for FailureCapture {
    fn default() -> Self {
        Self::with_predicate(|value| matches!(value, Value::Host(_)))
    }
}

impl fmt::Debug for FailureCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureCapture").finish_non_exhaustive()
    }
}

impl FailureCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_predicate(is_opaque: impl Fn(&Value) -> bool + 'static) -> Self {
        Self {
            is_opaque: Rc::new(is_opaque),
        }
    }

    pub fn apply(&self, mut result: ExpectationResult) -> ExpectationResult {
        if result.passed {
            return result;
        }
        result.expected = self.capture(&result.expected);
        result.actual = self.capture(&result.actual);
        result
    }

    /// Point-in-time copy of `value`, or the value itself when copying is
    /// unsafe or pointless.
    pub fn capture(&self, value: &Value) -> Value {
        if !value.is_object() || (self.is_opaque)(value) {
            value.clone()
        } else {
            value.shallow_copy()
        }
    }
}
