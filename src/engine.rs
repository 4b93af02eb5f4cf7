//! # Engine Contracts
//!
//! The suite/spec/hook engine is loaded into the environment by a bootstrap
//! script and driven through three handles:
//!
//! 1. [`EngineBootstrap`] knows the script and how to obtain the engine core
//!    and its public interface once the script ran;
//! 2. [`Engine`] is the core: it accepts the result post-processor and exposes
//!    the coordination object;
//! 3. [`EngineEnv`] is the coordination object: hooks, reporters, execution.
//!
//! Any of the handles may be missing if the bootstrap script misbehaves; the
//! runner turns that into [`crate::errors::AdapterError::Initialization`].

use std::fmt;
use std::rc::Rc;

use crate::capture::FailureCapture;
use crate::errors::Result;
use crate::host::{Environment, Namespace, Script};
use crate::registry::ExpectationRegistry;
use crate::reporter::Reporter;

/// Before-each hook. Receives the registry of the case about to run.
pub type Hook = Box<dyn FnMut(&mut ExpectationRegistry) -> Result<()>>;

/// Public surface of the engine: what spec files may call, plus an optional
/// reporter the interface itself wants attached.
#[derive(Default)]
pub struct Interface {
    pub bindings: Namespace,
    pub api_reporter: Option<Rc<dyn Reporter>>,
}

impl fmt::Debug for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interface")
            .field("bindings", &self.bindings.names())
            .field("api_reporter", &self.api_reporter.is_some())
            .finish()
    }
}

pub trait EngineBootstrap {
    fn name(&self) -> &str;

    fn script(&self) -> &Script;

    /// The engine core, looked up in `env` after [`EngineBootstrap::script`] ran.
    fn core(&self, env: &mut dyn Environment) -> Option<Box<dyn Engine>>;

    fn interface(&self, engine: &mut dyn Engine) -> Interface;
}

pub trait Engine {
    /// Installs the post-processing step applied to every expectation result.
    fn install_result_processor(&mut self, capture: FailureCapture);

    fn env(&mut self) -> Option<&mut dyn EngineEnv>;
}

pub trait EngineEnv {
    fn before_each(&mut self, hook: Hook);

    fn add_reporter(&mut self, reporter: Rc<dyn Reporter>);

    /// Runs every loaded spec, reporting to the attached reporters.
    fn execute(&mut self) -> Result<()>;
}
