//! Value pretty-printing for diagnostics, snapshots and reports.

use std::rc::Rc;

use crate::value::{Tracking, Value};

/// Renders values for humans. Supplied by the reporter so that every message in
/// a run uses the same notation.
pub trait Formatter {
    fn pretty_print(&self, value: &Value) -> String;
}

/// Single-line printer: `[1, 'a']`, `{x: 1}`, `Point {x: 1}`, `Set [1, 2]`.
#[derive(Debug, Clone)]
pub struct PrettyPrinter {
    /// Containers nested deeper than this print as their type name.
    pub max_depth: usize,
    /// Elements past this many print as `...`.
    pub max_items: usize,
}

impl Default for PrettyPrinter {
    fn default() -> Self {
        Self {
            max_depth: 40,
            max_items: 100,
        }
    }
}

impl Formatter for PrettyPrinter {
    fn pretty_print(&self, value: &Value) -> String {
        let mut out = String::new();
        let mut seen = Vec::new();
        self.write_value(value, 0, &mut seen, &mut out);
        out
    }
}

impl PrettyPrinter {
    fn write_value(&self, value: &Value, depth: usize, seen: &mut Vec<*const ()>, out: &mut String) {
        match value {
            Value::Undefined => out.push_str("undefined"),
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&format_number(*n)),
            Value::String(s) => {
                out.push('\'');
                out.push_str(&s.replace('\'', "\\'"));
                out.push('\'');
            }
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items) as *const ();
                if self.enter(ptr, "Array", depth, seen, out) {
                    self.write_items(items.borrow().iter(), depth, seen, out);
                    seen.pop();
                }
            }
            Value::Object(obj) => {
                let ptr = Rc::as_ptr(obj) as *const ();
                let obj = obj.borrow();
                if !self.enter(ptr, &obj.class_name, depth, seen, out) {
                    return;
                }
                if obj.class_name != "Object" {
                    out.push_str(&obj.class_name);
                    out.push(' ');
                }
                out.push('{');
                for (i, (key, member)) in obj.properties.iter().enumerate() {
                    if i == self.max_items {
                        out.push_str(", ...");
                        break;
                    }
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(key);
                    out.push_str(": ");
                    self.write_value(member, depth + 1, seen, out);
                }
                out.push('}');
                seen.pop();
            }
            Value::Collection(c) => {
                let ptr = Rc::as_ptr(c) as *const ();
                let c = c.borrow();
                if self.enter(ptr, &c.type_name, depth, seen, out) {
                    out.push_str(&c.type_name);
                    out.push(' ');
                    self.write_items(c.items.iter(), depth, seen, out);
                    seen.pop();
                }
            }
            Value::Function(f) => match f.tracking() {
                Tracking::Spy(_) => out.push_str(&format!("spy on {}", f.name())),
                Tracking::Mock(_) => out.push_str(&format!("mock function {}", f.name())),
                Tracking::Untracked if f.name().is_empty() => out.push_str("Function"),
                Tracking::Untracked => out.push_str(&format!("Function '{}'", f.name())),
            },
            Value::Host(node) => {
                out.push('<');
                out.push_str(&node.tag);
                out.push('>');
            }
        }
    }

    /// Returns false (after writing a placeholder) when the container is too
    /// deep or already on the current path.
    fn enter(
        &self,
        ptr: *const (),
        type_name: &str,
        depth: usize,
        seen: &mut Vec<*const ()>,
        out: &mut String,
    ) -> bool {
        if seen.contains(&ptr) {
            out.push_str(&format!("<circular reference: {type_name}>"));
            return false;
        }
        if depth >= self.max_depth {
            out.push_str(type_name);
            return false;
        }
        seen.push(ptr);
        true
    }

    fn write_items<'v>(
        &self,
        items: impl Iterator<Item = &'v Value>,
        depth: usize,
        seen: &mut Vec<*const ()>,
        out: &mut String,
    ) {
        out.push('[');
        for (i, item) in items.enumerate() {
            if i == self.max_items {
                out.push_str(", ...");
                break;
            }
            if i > 0 {
                out.push_str(", ");
            }
            self.write_value(item, depth + 1, seen, out);
        }
        out.push(']');
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let sign = if n > 0.0 { "" } else { "-" };
        format!("{sign}Infinity")
    } else {
        format!("{n}")
    }
}
