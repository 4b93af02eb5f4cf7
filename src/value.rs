//! # Dynamic Values
//!
//! The value model shared by the engine, the matchers and the reporter.
//!
//! Scalars are stored inline. Arrays, objects and collections are reference
//! types (`Rc<RefCell<_>>`): two handles may alias the same storage, and code
//! under test can keep mutating a value after an expectation has recorded it.
//! This is what [`crate::capture`] has to guard against.
//!
//! ## Kinds
//!
//! - **Array**: a plain ordered sequence.
//! - **Object**: class name plus named properties.
//! - **Collection**: an iterable, sequence-like object with a concrete type name
//!   (`Set`, `Map`, a user-defined stack, ...). It exposes no enumerable
//!   properties; only iteration reveals its contents.
//! - **Function**: callable, optionally call-tracked as a spy or a mock.
//! - **Host**: an opaque handle to a node owned by the host environment.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use im::{OrdMap, Vector};

use crate::calls::{CallInfo, CallTracker, MockState};
use crate::equality::Equality;
use crate::errors::{AdapterError, Result};
use crate::pretty::{Formatter, PrettyPrinter};

/// Native implementation backing a [`Function`].
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Result<Value>>;

/// Represents a value handled by the engine.
///
/// # Examples
///
/// ```rust
/// use specbridge::value::Value;
/// let point = Value::object([("x", Value::from(1))]);
/// assert_eq!(point.type_name(), "Object");
/// assert!(point.is_object());
/// assert!(!Value::Null.is_object());
/// ```
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Object>>),
    Collection(Rc<RefCell<Collection>>),
    Function(Rc<Function>),
    Host(Rc<HostNode>),
}

#[derive(Clone)]
pub struct Object {
    pub class_name: String,
    pub properties: OrdMap<String, Value>,
}

#[derive(Clone)]
pub struct Collection {
    pub type_name: String,
    pub items: Vector<Value>,
}

/// Opaque node owned by the host environment (a UI tree node, a native handle).
#[derive(Debug)]
pub struct HostNode {
    pub tag: String,
}

/// How a function records its invocations.
#[derive(Debug)]
pub enum Tracking {
    Untracked,
    /// Call tracker with bulk retrieval (`calls.all()`).
    Spy(RefCell<CallTracker>),
    /// Direct invocation list (`mock.calls`).
    Mock(RefCell<MockState>),
}

pub struct Function {
    name: String,
    body: Option<NativeFn>,
    tracking: Tracking,
}

impl Function {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tracking(&self) -> &Tracking {
        &self.tracking
    }

    /// Invokes the function, recording the call first when it is tracked.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match &self.tracking {
            Tracking::Spy(tracker) => tracker.borrow_mut().track(CallInfo::new(args.to_vec())),
            Tracking::Mock(state) => state.borrow_mut().calls.push(args.to_vec()),
            Tracking::Untracked => {}
        }

        let returned = match &self.body {
            Some(body) => body(args)?,
            None => Value::Undefined,
        };

        match &self.tracking {
            Tracking::Spy(tracker) => {
                if let Some(last) = tracker.borrow_mut().most_recent_mut() {
                    last.return_value = returned.clone();
                }
            }
            Tracking::Mock(state) => state.borrow_mut().results.push(returned.clone()),
            Tracking::Untracked => {}
        }
        Ok(returned)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("tracking", &self.tracking)
            .finish()
    }
}

// ============================================================================
// CONSTRUCTORS
// ============================================================================

impl Value {
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Plain object (`class_name == "Object"`).
    pub fn object<K: Into<String>>(properties: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::instance("Object", properties)
    }

    /// Object of a named class.
    pub fn instance<K: Into<String>>(
        class_name: impl Into<String>,
        properties: impl IntoIterator<Item = (K, Value)>,
    ) -> Self {
        Value::Object(Rc::new(RefCell::new(Object {
            class_name: class_name.into(),
            properties: properties
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        })))
    }

    pub fn collection(type_name: impl Into<String>, items: impl IntoIterator<Item = Value>) -> Self {
        Value::Collection(Rc::new(RefCell::new(Collection {
            type_name: type_name.into(),
            items: items.into_iter().collect(),
        })))
    }

    /// Insertion-ordered `Set`. Items are stored as given; no deduplication.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::collection("Set", items)
    }

    pub fn function(name: impl Into<String>, body: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
        let body: NativeFn = Rc::new(body);
        Self::make_function(name.into(), Some(body), Tracking::Untracked)
    }

    /// Spy with no implementation; every call returns `undefined`.
    pub fn spy(name: impl Into<String>) -> Self {
        Self::make_function(name.into(), None, Tracking::Spy(RefCell::default()))
    }

    pub fn spy_with(name: impl Into<String>, body: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
        let body: NativeFn = Rc::new(body);
        Self::make_function(name.into(), Some(body), Tracking::Spy(RefCell::default()))
    }

    /// Mock function with no implementation.
    pub fn mock_fn(name: impl Into<String>) -> Self {
        Self::make_function(name.into(), None, Tracking::Mock(RefCell::default()))
    }

    pub fn mock_with(name: impl Into<String>, body: impl Fn(&[Value]) -> Result<Value> + 'static) -> Self {
        let body: NativeFn = Rc::new(body);
        Self::make_function(name.into(), Some(body), Tracking::Mock(RefCell::default()))
    }

    pub fn host_node(tag: impl Into<String>) -> Self {
        Value::Host(Rc::new(HostNode { tag: tag.into() }))
    }

    fn make_function(name: String, body: Option<NativeFn>, tracking: Tracking) -> Self {
        Value::Function(Rc::new(Function {
            name,
            body,
            tracking,
        }))
    }
}

// ============================================================================
// INSPECTION
// ============================================================================

impl Value {
    /// Concrete runtime type name. Objects report their class, collections
    /// their collection type.
    pub fn type_name(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(_) => "boolean".to_string(),
            Value::Number(_) => "number".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Array(_) => "Array".to_string(),
            Value::Object(obj) => obj.borrow().class_name.clone(),
            Value::Collection(c) => c.borrow().type_name.clone(),
            Value::Function(_) => "Function".to_string(),
            Value::Host(node) => format!("HostNode<{}>", node.tag),
        }
    }

    /// True for non-null values of object type. Functions are callables, not
    /// objects, in this model.
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            Value::Array(_) | Value::Object(_) | Value::Collection(_) | Value::Host(_)
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Produces the value's elements in iteration order, or `None` when the
    /// value does not support iteration.
    pub fn elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) => Some(items.borrow().clone()),
            Value::Collection(c) => Some(c.borrow().items.iter().cloned().collect()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Function>> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn get_property(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => obj.borrow().properties.get(key).cloned(),
            _ => None,
        }
    }

    /// Returns `false` when the value is not an object.
    pub fn set_property(&self, key: impl Into<String>, value: Value) -> bool {
        match self {
            Value::Object(obj) => {
                obj.borrow_mut().properties.insert(key.into(), value);
                true
            }
            _ => false,
        }
    }

    /// Appends to an array or collection. Returns `false` for anything else.
    pub fn push(&self, value: Value) -> bool {
        match self {
            Value::Array(items) => {
                items.borrow_mut().push(value);
                true
            }
            Value::Collection(c) => {
                c.borrow_mut().items.push_back(value);
                true
            }
            _ => false,
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self {
            Value::Function(f) => f.call(args),
            other => Err(AdapterError::engine(format!(
                "{} is not a function",
                other.type_name()
            ))),
        }
    }

    /// New storage holding the same members: mutating the copy's (or the
    /// original's) top level does not affect the other, nested values stay shared.
    /// Non-object values are returned as-is.
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::Array(items) => Value::Array(Rc::new(RefCell::new(items.borrow().clone()))),
            Value::Object(obj) => Value::Object(Rc::new(RefCell::new(obj.borrow().clone()))),
            Value::Collection(c) => Value::Collection(Rc::new(RefCell::new(c.borrow().clone()))),
            other => other.clone(),
        }
    }

    /// Reference identity for shared values; `false` for scalars.
    pub fn same_ref(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Collection(a), Value::Collection(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ============================================================================
// TRAIT IMPLEMENTATIONS
// ============================================================================

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&PrettyPrinter::default().pretty_print(self))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&PrettyPrinter::default().pretty_print(self))
    }
}

/// Deep equality without custom testers.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        Equality::default().equals(self, other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}
