//! # Spec-File Runner
//!
//! Drives one spec file from an empty environment to a [`RunResult`].
//!
//! ## Phases
//!
//! ```text
//! Uninitialized -> Bootstrapped -> SpecLoaded -> Executed -> Reported
//! ```
//!
//! - **Bootstrapped**: the engine script ran with real timers, the engine
//!   interface is merged into the global namespace, aliases and the setup
//!   script are in place.
//! - **SpecLoaded**: the before-each hook and the collecting reporter are
//!   attached, internal modules and the spec file itself are loaded.
//! - **Executed**: the engine ran every spec.
//! - **Reported**: results are collected and the snapshot state finalized.
//!
//! Any error before `Reported` aborts the run; there are no retries and no
//! partial results.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::aggregate::{aggregate, RunResult};
use crate::capture::FailureCapture;
use crate::config::RunConfig;
use crate::engine::{Engine, EngineBootstrap, Hook};
use crate::equality::SequenceEquality;
use crate::errors::{AdapterError, Result};
use crate::host::{Environment, GlobalExtension, PendingAliases, Runtime};
use crate::matchers::install_call_matchers;
use crate::registry::ExpectationRegistry;
use crate::reporter::{CollectingReporter, Reporter};
use crate::snapshot::{SnapshotFile, SnapshotMatcher, SnapshotState, TO_MATCH_SNAPSHOT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunPhase {
    Uninitialized,
    Bootstrapped,
    SpecLoaded,
    Executed,
    Reported,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunPhase::Uninitialized => "uninitialized",
            RunPhase::Bootstrapped => "bootstrapped",
            RunPhase::SpecLoaded => "spec loaded",
            RunPhase::Executed => "executed",
            RunPhase::Reported => "reported",
        };
        f.write_str(label)
    }
}

pub struct SpecRunner {
    bootstrap: Box<dyn EngineBootstrap>,
    capture: FailureCapture,
    extensions: Vec<Box<dyn GlobalExtension>>,
    internal_modules: Vec<PathBuf>,
    phase: Cell<RunPhase>,
}

impl fmt::Debug for SpecRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecRunner")
            .field("engine", &self.bootstrap.name())
            .field("internal_modules", &self.internal_modules)
            .field("phase", &self.phase.get())
            .finish_non_exhaustive()
    }
}

impl SpecRunner {
    /// Runner with the default failure capture and the pending-test aliases.
    pub fn new(bootstrap: Box<dyn EngineBootstrap>) -> Self {
        Self {
            bootstrap,
            capture: FailureCapture::default(),
            extensions: vec![Box::new(PendingAliases)],
            internal_modules: Vec::new(),
            phase: Cell::new(RunPhase::Uninitialized),
        }
    }

    pub fn with_capture(mut self, capture: FailureCapture) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_extension(mut self, extension: Box<dyn GlobalExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Harness module loaded right before the spec file.
    pub fn with_internal_module(mut self, path: impl Into<PathBuf>) -> Self {
        self.internal_modules.push(path.into());
        self
    }

    /// Phase reached by the latest run.
    pub fn phase(&self) -> RunPhase {
        self.phase.get()
    }

    fn advance(&self, phase: RunPhase, test_path: &Path) {
        debug!(test_path = %test_path.display(), %phase, "run phase");
        self.phase.set(phase);
    }

    fn initialization_error(&self) -> AdapterError {
        AdapterError::Initialization {
            engine: self.bootstrap.name().to_string(),
        }
    }

    pub fn run_spec_file(
        &self,
        config: &RunConfig,
        environment: &mut dyn Environment,
        runtime: Rc<RefCell<dyn Runtime>>,
        test_path: &Path,
    ) -> Result<RunResult> {
        self.phase.set(RunPhase::Uninitialized);

        let mut engine = self.bootstrap_engine(config, environment, &runtime)?;
        self.advance(RunPhase::Bootstrapped, test_path);

        let snapshots = Rc::new(RefCell::new(SnapshotFile::for_test(test_path, config)?));
        let reporter = Rc::new(CollectingReporter::new(test_path, config));
        let engine_env = engine.env().ok_or_else(|| self.initialization_error())?;

        let hook_state: Rc<RefCell<dyn SnapshotState>> = snapshots.clone();
        let hook_runtime = Rc::clone(&runtime);
        let formatter = reporter.formatter();
        let persist = config.persist_module_registry;
        let hook: Hook = Box::new(move |registry: &mut ExpectationRegistry| {
            registry.add_custom_equality_tester(Rc::new(SequenceEquality));
            registry.add_matcher(
                TO_MATCH_SNAPSHOT,
                Rc::new(SnapshotMatcher::new(Rc::clone(&hook_state), Rc::clone(&formatter))),
            );
            install_call_matchers(registry, Rc::clone(&formatter));
            if !persist {
                hook_runtime.borrow_mut().reset_module_registry();
            }
            Ok(())
        });
        engine_env.before_each(hook);
        debug!(persist_module_registry = persist, "installed before-each hook");

        engine_env.add_reporter(reporter.clone());
        for module in &self.internal_modules {
            runtime
                .borrow_mut()
                .require_internal_module(environment, module)?;
        }
        runtime.borrow_mut().require_module(environment, test_path)?;
        self.advance(RunPhase::SpecLoaded, test_path);

        engine_env.execute()?;
        self.advance(RunPhase::Executed, test_path);

        let results = reporter.results()?;
        let run = aggregate(
            results,
            &mut *snapshots.borrow_mut(),
            config.update_snapshot,
        )?;
        self.advance(RunPhase::Reported, test_path);
        Ok(run)
    }

    /// Runs the bootstrap script with real timers and wires the engine into the
    /// global namespace.
    fn bootstrap_engine(
        &self,
        config: &RunConfig,
        environment: &mut dyn Environment,
        runtime: &Rc<RefCell<dyn Runtime>>,
    ) -> Result<Box<dyn Engine>> {
        let mut engine: Option<Box<dyn Engine>> = None;
        environment.run_with_real_timers(&mut |env: &mut dyn Environment| -> Result<()> {
            env.run_script(self.bootstrap.script())?;
            let mut core = self
                .bootstrap
                .core(env)
                .ok_or_else(|| self.initialization_error())?;
            core.install_result_processor(self.capture.clone());
            if core.env().is_none() {
                return Err(self.initialization_error());
            }

            let interface = self.bootstrap.interface(core.as_mut());
            env.global_mut().merge(&interface.bindings);
            if let (Some(api_reporter), Some(engine_env)) = (interface.api_reporter, core.env()) {
                engine_env.add_reporter(api_reporter);
            }
            for extension in &self.extensions {
                extension.install(env.global_mut());
            }
            env.global_mut().alias("test", "it");

            if let Some(setup) = &config.setup_test_framework_script_file {
                runtime.borrow_mut().require_module(env, setup)?;
                debug!(setup = %setup.display(), "loaded setup script");
            }
            engine = Some(core);
            Ok(())
        })?;
        engine.ok_or_else(|| self.initialization_error())
    }
}
