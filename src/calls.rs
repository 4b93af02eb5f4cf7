//! # Call Records
//!
//! Two tracking styles exist for function-like targets:
//!
//! - **spy-like**: a [`CallTracker`] that keeps one [`CallInfo`] per invocation
//!   and hands them out in bulk through [`CallTracker::all`];
//! - **mock-like**: a [`MockState`] whose `calls` field *is* the invocation list.
//!
//! [`Trackable::resolve`] decides once which style a value uses, and
//! [`extract_calls`] turns either into the same oldest-first [`CallRecord`], so
//! matchers never look at tracking details.

use std::cell::RefCell;

use crate::errors::{AdapterError, Result};
use crate::value::{Tracking, Value};

/// Arguments of a single invocation.
pub type ArgumentList = Vec<Value>;

/// Argument lists of every invocation, oldest first.
pub type CallRecord = Vec<ArgumentList>;

/// One recorded spy invocation.
#[derive(Debug, Clone, Default)]
pub struct CallInfo {
    pub args: ArgumentList,
    pub return_value: Value,
}

impl CallInfo {
    pub fn new(args: ArgumentList) -> Self {
        Self {
            args,
            return_value: Value::Undefined,
        }
    }
}

#[derive(Debug, Default)]
pub struct CallTracker {
    calls: Vec<CallInfo>,
}

impl CallTracker {
    pub fn track(&mut self, call: CallInfo) {
        self.calls.push(call);
    }

    pub fn count(&self) -> usize {
        self.calls.len()
    }

    /// Bulk retrieval of every recorded call.
    pub fn all(&self) -> Vec<CallInfo> {
        self.calls.clone()
    }

    pub fn most_recent(&self) -> Option<&CallInfo> {
        self.calls.last()
    }

    pub(crate) fn most_recent_mut(&mut self) -> Option<&mut CallInfo> {
        self.calls.last_mut()
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    pub calls: Vec<ArgumentList>,
    pub results: Vec<Value>,
}

/// A value whose invocations can be inspected.
#[derive(Debug, Clone, Copy)]
pub enum Trackable<'a> {
    Spy(&'a RefCell<CallTracker>),
    Mock(&'a RefCell<MockState>),
}

impl<'a> Trackable<'a> {
    /// Fails with [`AdapterError::InvalidTarget`] for untracked functions and
    /// every non-function value.
    pub fn resolve(target: &'a Value) -> Result<Self> {
        let invalid = || AdapterError::InvalidTarget {
            type_name: target.type_name(),
        };
        let Value::Function(function) = target else {
            return Err(invalid());
        };
        match function.tracking() {
            Tracking::Spy(tracker) => Ok(Trackable::Spy(tracker)),
            Tracking::Mock(state) => Ok(Trackable::Mock(state)),
            Tracking::Untracked => Err(invalid()),
        }
    }

    pub fn calls(&self) -> CallRecord {
        match self {
            Trackable::Spy(tracker) => tracker
                .borrow()
                .all()
                .into_iter()
                .map(|call| call.args)
                .collect(),
            Trackable::Mock(state) => state.borrow().calls.clone(),
        }
    }
}

/// Uniform, oldest-first view of a target's invocations.
///
/// # Examples
///
/// ```rust
/// use specbridge::calls::extract_calls;
/// use specbridge::value::Value;
///
/// let spy = Value::spy("onChange");
/// spy.call(&[Value::from(1), Value::from(2)]).unwrap();
/// spy.call(&[Value::from(3)]).unwrap();
/// let calls = extract_calls(&spy).unwrap();
/// assert_eq!(calls, vec![vec![Value::from(1), Value::from(2)], vec![Value::from(3)]]);
/// ```
pub fn extract_calls(target: &Value) -> Result<CallRecord> {
    Ok(Trackable::resolve(target)?.calls())
}
