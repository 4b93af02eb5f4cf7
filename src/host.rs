//! # Host Collaborators
//!
//! The sandboxed environment and the module loader are provided by the host
//! test runner. This module only names what the adapter needs from them.
//!
//! ## Environment
//!
//! Owns the global namespace the spec file sees, runs scripts inside the sandbox
//! and can temporarily switch fake timers back to real ones. Bootstrap runs
//! entirely inside [`Environment::run_with_real_timers`] so the engine captures
//! the real timer functions.
//!
//! ## Runtime
//!
//! Loads modules by path. The adapter resets its registry before every test
//! case unless the configuration asks for persistence.

use std::fmt;
use std::path::{Path, PathBuf};

use im::OrdMap;

use crate::errors::Result;
use crate::value::Value;

// ============================================================================
// NAMESPACE
// ============================================================================

/// Name-to-value bindings visible to spec files.
#[derive(Debug, Clone, Default)]
pub struct Namespace {
    bindings: OrdMap<String, Value>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Copies every binding of `other` into `self`, overwriting on conflict.
    pub fn merge(&mut self, other: &Namespace) {
        for (name, value) in other.bindings.iter() {
            self.bindings.insert(name.clone(), value.clone());
        }
    }

    /// Binds `alias` to whatever `target` is bound to. Returns false, binding
    /// nothing, when `target` is unbound.
    pub fn alias(&mut self, alias: &str, target: &str) -> bool {
        match self.bindings.get(target).cloned() {
            Some(value) => {
                self.bindings.insert(alias.to_string(), value);
                true
            }
            None => false,
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Source text run by the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub path: PathBuf,
    pub source: String,
}

impl Script {
    pub fn new(path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

pub trait Environment {
    /// Runs `f` with real timers installed, restoring the previous timer mode
    /// afterwards even when `f` fails.
    fn run_with_real_timers(
        &mut self,
        f: &mut dyn FnMut(&mut dyn Environment) -> Result<()>,
    ) -> Result<()>;

    fn run_script(&mut self, script: &Script) -> Result<()>;

    fn global(&self) -> &Namespace;

    fn global_mut(&mut self) -> &mut Namespace;
}

pub trait Runtime {
    fn require_module(&mut self, env: &mut dyn Environment, path: &Path) -> Result<Value>;

    /// Loads a module that belongs to the harness rather than to the project
    /// under test. Defaults to [`Runtime::require_module`].
    fn require_internal_module(&mut self, env: &mut dyn Environment, path: &Path) -> Result<Value> {
        self.require_module(env, path)
    }

    fn reset_module_registry(&mut self);
}

/// Adds bindings to the global namespace once the engine interface is in place.
pub trait GlobalExtension {
    fn install(&self, global: &mut Namespace);
}

/// `xtest` for `xit`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PendingAliases;

impl GlobalExtension for PendingAliases {
    fn install(&self, global: &mut Namespace) {
        global.alias("xtest", "xit");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_copies_existing_binding() {
        let mut global = Namespace::new();
        let it = Value::function("it", |_| Ok(Value::Undefined));
        global.set("it", it.clone());

        assert!(global.alias("test", "it"));
        assert!(global.get("test").is_some_and(|test| test.same_ref(&it)));
        assert!(!global.alias("fit", "missing"));
        assert!(!global.contains("fit"));
    }

    #[test]
    fn merge_overwrites() {
        let mut global = Namespace::new();
        global.set("expect", Value::from(1));
        let mut interface = Namespace::new();
        interface.set("expect", Value::from(2));
        interface.set("describe", Value::from(3));

        global.merge(&interface);
        assert_eq!(global.get("expect"), Some(&Value::from(2)));
        assert_eq!(global.names(), vec!["describe", "expect"]);
    }

    #[test]
    fn pending_aliases_need_xit() {
        let mut global = Namespace::new();
        PendingAliases.install(&mut global);
        assert!(global.is_empty());

        global.set("xit", Value::from(true));
        PendingAliases.install(&mut global);
        assert!(global.contains("xtest"));
    }
}
