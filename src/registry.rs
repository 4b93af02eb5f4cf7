//! Per-case registry of matchers and equality testers.
//!
//! The engine owns one [`ExpectationRegistry`], clears it between cases and
//! hands it to every before-each hook. Nothing here is global: registrations
//! live exactly as long as the case they were made for.

use std::rc::Rc;

use im::OrdMap;

use crate::equality::{CustomEquality, Equality};
use crate::matchers::Matcher;

#[derive(Clone, Default)]
pub struct ExpectationRegistry {
    testers: Vec<Rc<dyn CustomEquality>>,
    matchers: OrdMap<String, Rc<dyn Matcher>>,
}

impl ExpectationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_custom_equality_tester(&mut self, tester: Rc<dyn CustomEquality>) {
        self.testers.push(tester);
    }

    /// Registers `matcher` under `name`, replacing any previous registration.
    pub fn add_matcher(&mut self, name: impl Into<String>, matcher: Rc<dyn Matcher>) {
        self.matchers.insert(name.into(), matcher);
    }

    pub fn matcher(&self, name: &str) -> Option<Rc<dyn Matcher>> {
        self.matchers.get(name).cloned()
    }

    pub fn has_matcher(&self, name: &str) -> bool {
        self.matchers.contains_key(name)
    }

    /// Host equality extended with every registered tester.
    pub fn equality(&self) -> Equality {
        Equality::new(self.testers.clone())
    }

    pub fn clear(&mut self) {
        self.testers.clear();
        self.matchers.clear();
    }
}
