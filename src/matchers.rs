//! # Call Matchers
//!
//! Assertions over the invocation history of spies and mock functions.
//!
//! | Registered name | Alias | Check |
//! |---|---|---|
//! | `toBeCalled` | `toHaveBeenCalled` | at least one call |
//! | `toBeCalledWith` | `toHaveBeenCalledWith` | any call equals the expected arguments |
//! | `lastCalledWith` | `toHaveBeenLastCalledWith` | the most recent call equals them |
//!
//! Every matcher returns a [`MatchOutcome`] whose message pair follows the
//! engine convention: the message of a passing outcome is the one shown when the
//! expectation was negated. Messages are rendered lazily; the pretty-printer
//! only runs when someone reads them.
//!
//! Misuse (an untracked target, arguments passed to `toBeCalled`) is reported
//! as [`AdapterError::Usage`], never as a failed match.

use std::fmt;
use std::rc::Rc;

use once_cell::unsync::Lazy;
use tracing::trace;

use crate::calls::{extract_calls, CallRecord};
use crate::capture::ExpectationResult;
use crate::diagnostics::{render_call, render_recent_calls, CALL_PRINT_LIMIT, LAST_CALL_PRINT_LIMIT};
use crate::equality::Equality;
use crate::errors::{AdapterError, Result};
use crate::pretty::Formatter;
use crate::registry::ExpectationRegistry;
use crate::value::Value;

// ============================================================================
// CORE TYPES
// ============================================================================

type MessageThunk = Box<dyn FnOnce() -> String>;

/// Pass flag plus a diagnostic that is computed on first access.
pub struct MatchOutcome {
    pub passed: bool,
    message: Lazy<String, MessageThunk>,
}

impl MatchOutcome {
    pub fn new(passed: bool, message: impl FnOnce() -> String + 'static) -> Self {
        Self {
            passed,
            message: Lazy::new(Box::new(message)),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_str()
    }
}

impl fmt::Debug for MatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchOutcome")
            .field("passed", &self.passed)
            .finish_non_exhaustive()
    }
}

/// What a matcher may consult besides its arguments.
pub struct MatcherContext<'a> {
    pub equality: &'a Equality,
    /// Full name of the running spec, when there is one.
    pub spec_name: Option<&'a str>,
}

pub trait Matcher {
    fn compare(&self, actual: &Value, expected: &[Value], context: &MatcherContext<'_>) -> Result<MatchOutcome>;
}

impl<F> Matcher for F
where
    F: Fn(&Value, &[Value], &MatcherContext<'_>) -> Result<MatchOutcome>,
{
    fn compare(&self, actual: &Value, expected: &[Value], context: &MatcherContext<'_>) -> Result<MatchOutcome> {
        self(actual, expected, context)
    }
}

// ============================================================================
// CALL MATCHERS
// ============================================================================

pub const TO_BE_CALLED: &str = "toBeCalled";
pub const TO_BE_CALLED_WITH: &str = "toBeCalledWith";
pub const LAST_CALLED_WITH: &str = "lastCalledWith";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallCheck {
    Called,
    CalledWith,
    LastCalledWith,
}

/// One of the three call matchers, bound to the reporter's formatter.
#[derive(Clone)]
pub struct CallMatcher {
    check: CallCheck,
    formatter: Rc<dyn Formatter>,
}

impl CallMatcher {
    pub fn new(check: CallCheck, formatter: Rc<dyn Formatter>) -> Self {
        Self { check, formatter }
    }
}

impl Matcher for CallMatcher {
    fn compare(&self, actual: &Value, expected: &[Value], context: &MatcherContext<'_>) -> Result<MatchOutcome> {
        match self.check {
            CallCheck::Called => was_called(actual, expected),
            CallCheck::CalledWith => {
                was_called_with(actual, expected, context, Rc::clone(&self.formatter))
            }
            CallCheck::LastCalledWith => {
                was_last_called_with(actual, expected, context, Rc::clone(&self.formatter))
            }
        }
    }
}

/// Registers the call matchers and their aliases.
pub fn install_call_matchers(registry: &mut ExpectationRegistry, formatter: Rc<dyn Formatter>) {
    let entries = [
        (TO_BE_CALLED, "toHaveBeenCalled", CallCheck::Called),
        (TO_BE_CALLED_WITH, "toHaveBeenCalledWith", CallCheck::CalledWith),
        (LAST_CALLED_WITH, "toHaveBeenLastCalledWith", CallCheck::LastCalledWith),
    ];
    for (name, alias, check) in entries {
        let matcher: Rc<dyn Matcher> = Rc::new(CallMatcher::new(check, Rc::clone(&formatter)));
        registry.add_matcher(name, Rc::clone(&matcher));
        registry.add_matcher(alias, matcher);
    }
}

fn calls_of(actual: &Value, matcher: &str) -> Result<CallRecord> {
    extract_calls(actual).map_err(|err| match err {
        AdapterError::InvalidTarget { .. } => AdapterError::usage(format!(
            "{matcher}() should be used on a mock function or a spy."
        )),
        other => other,
    })
}

pub fn was_called(actual: &Value, expected: &[Value]) -> Result<MatchOutcome> {
    if !expected.is_empty() {
        return Err(AdapterError::usage(
            "toBeCalled() does not accept parameters, use toBeCalledWith instead.",
        ));
    }
    let calls = calls_of(actual, TO_BE_CALLED)?;
    let passed = !calls.is_empty();
    trace!(matcher = TO_BE_CALLED, calls = calls.len(), passed);

    Ok(if passed {
        MatchOutcome::new(true, || "Expected not to be called".to_string())
    } else {
        MatchOutcome::new(false, || "Expected to be called at least once".to_string())
    })
}

pub fn was_called_with(
    actual: &Value,
    expected: &[Value],
    context: &MatcherContext<'_>,
    formatter: Rc<dyn Formatter>,
) -> Result<MatchOutcome> {
    let calls = calls_of(actual, TO_BE_CALLED_WITH)?;
    let passed = calls
        .iter()
        .any(|call| context.equality.equals_lists(call, expected));
    trace!(matcher = TO_BE_CALLED_WITH, calls = calls.len(), passed);

    let expected = expected.to_vec();
    Ok(if passed {
        MatchOutcome::new(true, move || {
            format!(
                "Shouldn't have been called with\n  {}",
                render_call(&*formatter, &expected)
            )
        })
    } else {
        MatchOutcome::new(false, move || {
            format!(
                "Was not called with the expected values.\nExpected call:\n  {}{}",
                render_call(&*formatter, &expected),
                render_recent_calls(&calls, CALL_PRINT_LIMIT, &*formatter)
            )
        })
    })
}

pub fn was_last_called_with(
    actual: &Value,
    expected: &[Value],
    context: &MatcherContext<'_>,
    formatter: Rc<dyn Formatter>,
) -> Result<MatchOutcome> {
    let calls = calls_of(actual, LAST_CALLED_WITH)?;
    let passed = calls
        .last()
        .is_some_and(|call| context.equality.equals_lists(call, expected));
    trace!(matcher = LAST_CALLED_WITH, calls = calls.len(), passed);

    let expected = expected.to_vec();
    Ok(if passed {
        MatchOutcome::new(true, move || {
            format!(
                "Shouldn't have been last called with\n  {}",
                render_call(&*formatter, &expected)
            )
        })
    } else {
        MatchOutcome::new(false, move || {
            format!(
                "Wasn't last called with the expected values.\nExpected call:\n  {}{}",
                render_call(&*formatter, &expected),
                render_recent_calls(&calls, LAST_CALL_PRINT_LIMIT, &*formatter)
            )
        })
    })
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Runs `matcher` and builds the engine-facing result.
///
/// With `negated`, a passing outcome becomes a failure carrying the outcome's
/// (negation) message. The message is only read for failures.
pub fn evaluate(
    name: &str,
    matcher: &dyn Matcher,
    actual: &Value,
    expected: &[Value],
    context: &MatcherContext<'_>,
    negated: bool,
) -> Result<ExpectationResult> {
    let outcome = matcher.compare(actual, expected, context)?;
    let expected = match expected {
        [single] => single.clone(),
        many => Value::array(many.iter().cloned()),
    };
    if outcome.passed != negated {
        Ok(ExpectationResult::passed(name, expected, actual.clone()))
    } else {
        Ok(ExpectationResult::failed(
            name,
            outcome.message(),
            expected,
            actual.clone(),
        ))
    }
}
