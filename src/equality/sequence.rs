//! Element-wise equality for iterable, sequence-like values.

use crate::equality::{Comparison, CustomEquality};
use crate::value::Value;

/// Compares non-array iterables (sets, custom collections) element by element.
///
/// Applies only when both sides are objects, neither is an array, and both
/// can be iterated. Stateless; the before-each hook registers it for every case.
///
/// # Examples
///
/// ```rust
/// use std::rc::Rc;
/// use specbridge::equality::{Equality, SequenceEquality};
/// use specbridge::value::Value;
///
/// let eq = Equality::default().with_tester(Rc::new(SequenceEquality));
/// assert!(eq.equals(&Value::set([Value::from(1)]), &Value::set([Value::from(1)])));
/// assert!(!eq.equals(&Value::set([Value::from(1)]), &Value::set([Value::from(2)])));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceEquality;

impl CustomEquality for SequenceEquality {
    fn test(&self, a: &Value, b: &Value, comparison: &mut Comparison<'_>) -> Option<bool> {
        if !a.is_object() || !b.is_object() || a.is_array() || b.is_array() {
            return None;
        }
        let (left, right) = (a.elements()?, b.elements()?);
        if a.type_name() != b.type_name() {
            return Some(false);
        }

        let mut right = right.into_iter();
        for item in left {
            match right.next() {
                Some(other) if comparison.equals(&item, &other) => {}
                _ => return Some(false),
            }
        }
        Some(right.next().is_none())
    }
}
