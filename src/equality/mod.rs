//! # Host Equality
//!
//! Deep structural equality with pluggable custom testers.
//!
//! ## Rules
//!
//! - Custom testers run first, at every level of the comparison. The first
//!   tester returning `Some(decision)` wins; `None` defers to the next tester
//!   and finally to the structural rules below.
//! - Numbers: `NaN` equals `NaN`, `0` differs from `-0`.
//! - Arrays compare element-wise, objects compare class name and properties.
//! - Collections expose no enumerable properties, so structurally they only
//!   compare by type name. Element-wise comparison comes from
//!   [`SequenceEquality`].
//! - Functions and host nodes compare by identity.
//!
//! A pair of arrays, objects or collections already being compared further up
//! is assumed equal. Testers recurse through the [`Comparison`] they are
//! handed, so that holds across tester boundaries too.

use std::rc::Rc;

use crate::value::Value;

pub mod sequence;

pub use sequence::SequenceEquality;

/// A pluggable equality extension.
pub trait CustomEquality {
    /// `Some(decision)` when the tester applies, `None` to defer.
    ///
    /// Nested values must be compared through `comparison.equals`.
    fn test(&self, a: &Value, b: &Value, comparison: &mut Comparison<'_>) -> Option<bool>;
}

impl<F> CustomEquality for F
where
    F: Fn(&Value, &Value, &mut Comparison<'_>) -> Option<bool>,
{
    fn test(&self, a: &Value, b: &Value, comparison: &mut Comparison<'_>) -> Option<bool> {
        self(a, b, comparison)
    }
}

#[derive(Clone, Default)]
pub struct Equality {
    testers: Vec<Rc<dyn CustomEquality>>,
}

impl Equality {
    pub fn new(testers: Vec<Rc<dyn CustomEquality>>) -> Self {
        Self { testers }
    }

    pub fn with_tester(mut self, tester: Rc<dyn CustomEquality>) -> Self {
        self.testers.push(tester);
        self
    }

    pub fn equals(&self, a: &Value, b: &Value) -> bool {
        Comparison::new(self).equals(a, b)
    }

    /// Compares two argument lists as if they were arrays.
    pub fn equals_lists(&self, a: &[Value], b: &[Value]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.equals(x, y))
    }
}

// =============================================================================
// COMPARISON
// =============================================================================

/// One deep comparison in progress: the testers plus the pairs of shared
/// values currently open on the recursion path.
pub struct Comparison<'a> {
    equality: &'a Equality,
    stack: Vec<(usize, usize)>,
}

impl<'a> Comparison<'a> {
    pub fn new(equality: &'a Equality) -> Self {
        Self {
            equality,
            stack: Vec::new(),
        }
    }

    pub fn equals(&mut self, a: &Value, b: &Value) -> bool {
        let pair = match (ref_address(a), ref_address(b)) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        };
        if let Some(pair) = pair {
            // Already comparing this pair further up: assume equal.
            if self.stack.contains(&pair) {
                return true;
            }
            self.stack.push(pair);
        }
        let equal = self.decide(a, b);
        if pair.is_some() {
            self.stack.pop();
        }
        equal
    }

    fn decide(&mut self, a: &Value, b: &Value) -> bool {
        let equality = self.equality;
        for tester in &equality.testers {
            if let Some(decision) = tester.test(a, b, self) {
                return decision;
            }
        }

        match (a, b) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => numbers_equal(*x, *y),
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Array(x), Value::Array(y)) => {
                if Rc::ptr_eq(x, y) {
                    return true;
                }
                let (xs, ys) = (x.borrow().clone(), y.borrow().clone());
                xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(l, r)| self.equals(l, r))
            }
            (Value::Object(x), Value::Object(y)) => {
                if Rc::ptr_eq(x, y) {
                    return true;
                }
                let (ox, oy) = (x.borrow().clone(), y.borrow().clone());
                ox.class_name == oy.class_name
                    && ox.properties.len() == oy.properties.len()
                    && ox.properties.iter().all(|(key, l)| {
                        oy.properties
                            .get(key)
                            .is_some_and(|r| self.equals(l, r))
                    })
            }
            (Value::Collection(x), Value::Collection(y)) => {
                Rc::ptr_eq(x, y) || x.borrow().type_name == y.borrow().type_name
            }
            (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
            (Value::Host(x), Value::Host(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }
}

fn ref_address(value: &Value) -> Option<usize> {
    match value {
        Value::Array(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
        Value::Object(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
        Value::Collection(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
        _ => None,
    }
}

fn numbers_equal(a: f64, b: f64) -> bool {
    if a.is_nan() {
        return b.is_nan();
    }
    if a == 0.0 && b == 0.0 {
        return a.is_sign_negative() == b.is_sign_negative();
    }
    a == b
}
