//! # Specbridge Test Fixture
//!
//! In-memory stand-ins for the host collaborators:
//!
//! - [`TestEnvironment`]: a namespace, a fake/real timer flag and a log of the
//!   scripts it ran;
//! - [`ModuleTable`]: a module loader whose "modules" are Rust closures;
//! - [`FakeBootstrap`]: a tiny suite/spec engine exposing `it`, `xit` and
//!   `expect` to spec modules.
//!
//! `expect` takes `(actual, matcher name, [expected...], negated)`.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};

use specbridge::capture::{ExpectationResult, FailureCapture};
use specbridge::config::RunConfig;
use specbridge::engine::{Engine, EngineBootstrap, EngineEnv, Hook, Interface};
use specbridge::errors::{AdapterError, Result};
use specbridge::host::{Environment, Namespace, Runtime, Script};
use specbridge::matchers::{evaluate, MatchOutcome, MatcherContext};
use specbridge::pretty::{Formatter, PrettyPrinter};
use specbridge::registry::ExpectationRegistry;
use specbridge::reporter::{Reporter, SpecResult, SpecStatus};
use specbridge::{RunResult, SpecRunner, Value};

// =============================================================================
// ENVIRONMENT
// =============================================================================

#[derive(Debug, Default)]
pub struct TestEnvironment {
    global: Namespace,
    pub fake_timers: bool,
    /// Paths of every script run, with the fake-timer flag at that moment.
    pub scripts: Vec<(PathBuf, bool)>,
}

impl TestEnvironment {
    pub fn with_fake_timers() -> Self {
        Self {
            fake_timers: true,
            ..Self::default()
        }
    }
}

impl Environment for TestEnvironment {
    fn run_with_real_timers(
        &mut self,
        f: &mut dyn FnMut(&mut dyn Environment) -> Result<()>,
    ) -> Result<()> {
        let previous = self.fake_timers;
        self.fake_timers = false;
        let result = f(self);
        self.fake_timers = previous;
        result
    }

    fn run_script(&mut self, script: &Script) -> Result<()> {
        self.scripts.push((script.path.clone(), self.fake_timers));
        Ok(())
    }

    fn global(&self) -> &Namespace {
        &self.global
    }

    fn global_mut(&mut self) -> &mut Namespace {
        &mut self.global
    }
}

// =============================================================================
// MODULE LOADER
// =============================================================================

pub type ModuleFn = Rc<dyn Fn(&mut dyn Environment) -> Result<Value>>;

#[derive(Default)]
pub struct ModuleTable {
    modules: HashMap<PathBuf, ModuleFn>,
    pub loaded: Vec<PathBuf>,
    pub internal: Vec<PathBuf>,
    pub resets: usize,
}

impl ModuleTable {
    pub fn define(
        &mut self,
        path: impl Into<PathBuf>,
        module: impl Fn(&mut dyn Environment) -> Result<Value> + 'static,
    ) {
        self.modules.insert(path.into(), Rc::new(module));
    }

    fn load(&mut self, env: &mut dyn Environment, path: &Path) -> Result<Value> {
        let module = self
            .modules
            .get(path)
            .cloned()
            .ok_or_else(|| AdapterError::module(path, "module not found"))?;
        self.loaded.push(path.to_path_buf());
        module(env)
    }
}

impl Runtime for ModuleTable {
    fn require_module(&mut self, env: &mut dyn Environment, path: &Path) -> Result<Value> {
        self.load(env, path)
    }

    fn require_internal_module(&mut self, env: &mut dyn Environment, path: &Path) -> Result<Value> {
        self.internal.push(path.to_path_buf());
        self.load(env, path)
    }

    fn reset_module_registry(&mut self) {
        self.resets += 1;
    }
}

// =============================================================================
// ENGINE
// =============================================================================

struct SpecDef {
    description: String,
    body: Option<Value>,
}

#[derive(Default)]
struct Core {
    specs: RefCell<Vec<SpecDef>>,
    hooks: RefCell<Vec<Hook>>,
    registry: RefCell<ExpectationRegistry>,
    current: RefCell<Option<SpecResult>>,
    reporters: RefCell<Vec<Rc<dyn Reporter>>>,
    capture: RefCell<Option<FailureCapture>>,
}

impl Core {
    fn reporters(&self) -> Vec<Rc<dyn Reporter>> {
        self.reporters.borrow().clone()
    }

    fn expect(&self, args: &[Value]) -> Result<Value> {
        let [actual, name, expected, negated] = args else {
            return Err(AdapterError::engine("expect takes four arguments"));
        };
        let name = name
            .as_str()
            .ok_or_else(|| AdapterError::engine("matcher name must be a string"))?;
        let expected = expected.elements().unwrap_or_default();
        let negated = negated.as_bool().unwrap_or(false);

        let (matcher, equality) = {
            let registry = self.registry.borrow();
            let matcher = registry
                .matcher(name)
                .ok_or_else(|| AdapterError::engine(format!("unknown matcher {name}")))?;
            (matcher, registry.equality())
        };
        let spec_name = self
            .current
            .borrow()
            .as_ref()
            .map(|spec| spec.full_name.clone());
        let context = MatcherContext {
            equality: &equality,
            spec_name: spec_name.as_deref(),
        };
        let mut result = evaluate(name, matcher.as_ref(), actual, &expected, &context, negated)?;
        if let Some(capture) = self.capture.borrow().as_ref() {
            result = capture.apply(result);
        }
        self.record(result);
        Ok(Value::Undefined)
    }

    fn record(&self, result: ExpectationResult) {
        if let Some(spec) = self.current.borrow_mut().as_mut() {
            if result.passed {
                spec.passed_expectations.push(result);
            } else {
                spec.failed_expectations.push(result);
            }
        }
    }

    fn prepare_case(&self) -> Result<()> {
        let mut registry = self.registry.borrow_mut();
        registry.clear();
        registry.add_matcher("toEqual", Rc::new(to_equal));
        for hook in self.hooks.borrow_mut().iter_mut() {
            hook(&mut *registry)?;
        }
        Ok(())
    }

    fn execute(&self) -> Result<()> {
        let specs: Vec<(String, Option<Value>)> = self
            .specs
            .borrow()
            .iter()
            .map(|spec| (spec.description.clone(), spec.body.clone()))
            .collect();
        for reporter in self.reporters() {
            reporter.run_started(specs.len());
        }

        for (index, (description, body)) in specs.into_iter().enumerate() {
            let mut spec = SpecResult::new(format!("spec{index}"), description, Vec::new());
            let Some(body) = body else {
                for reporter in self.reporters() {
                    reporter.spec_done(&spec);
                }
                continue;
            };

            self.prepare_case()?;
            for reporter in self.reporters() {
                reporter.spec_started(&spec);
            }
            *self.current.borrow_mut() = Some(spec);
            let outcome = body.call(&[]);
            spec = self
                .current
                .borrow_mut()
                .take()
                .ok_or_else(|| AdapterError::engine("spec vanished"))?;
            outcome?;

            spec.status = if spec.failed_expectations.is_empty() {
                SpecStatus::Passed
            } else {
                SpecStatus::Failed
            };
            for reporter in self.reporters() {
                reporter.spec_done(&spec);
            }
        }

        for reporter in self.reporters() {
            reporter.run_done();
        }
        Ok(())
    }
}

fn to_equal(actual: &Value, expected: &[Value], context: &MatcherContext<'_>) -> Result<MatchOutcome> {
    let expected = expected.first().cloned().unwrap_or_default();
    let passed = context.equality.equals(actual, &expected);
    let printer = PrettyPrinter::default();
    let (actual, expected) = (printer.pretty_print(actual), printer.pretty_print(&expected));
    Ok(MatchOutcome::new(passed, move || {
        if passed {
            format!("Expected {actual} not to equal {expected}.")
        } else {
            format!("Expected {actual} to equal {expected}.")
        }
    }))
}

fn upgrade(core: &Weak<Core>) -> Result<Rc<Core>> {
    core.upgrade()
        .ok_or_else(|| AdapterError::engine("engine was dropped"))
}

fn register_spec(core: &Weak<Core>, args: &[Value], pending: bool) -> Result<Value> {
    let description = args
        .first()
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::engine("spec needs a description"))?
        .to_string();
    let body = if pending { None } else { args.get(1).cloned() };
    upgrade(core)?
        .specs
        .borrow_mut()
        .push(SpecDef { description, body });
    Ok(Value::Undefined)
}

struct FakeEngine {
    env: Option<FakeEngineEnv>,
}

struct FakeEngineEnv {
    core: Rc<Core>,
}

impl Engine for FakeEngine {
    fn install_result_processor(&mut self, capture: FailureCapture) {
        if let Some(env) = &self.env {
            *env.core.capture.borrow_mut() = Some(capture);
        }
    }

    fn env(&mut self) -> Option<&mut dyn EngineEnv> {
        self.env.as_mut().map(|env| env as &mut dyn EngineEnv)
    }
}

impl EngineEnv for FakeEngineEnv {
    fn before_each(&mut self, hook: Hook) {
        self.core.hooks.borrow_mut().push(hook);
    }

    fn add_reporter(&mut self, reporter: Rc<dyn Reporter>) {
        self.core.reporters.borrow_mut().push(reporter);
    }

    fn execute(&mut self) -> Result<()> {
        self.core.execute()
    }
}

pub struct FakeBootstrap {
    script: Script,
    provides_engine: bool,
    provides_env: bool,
    api_reporter: Option<Rc<RecordingReporter>>,
    core: RefCell<Option<Rc<Core>>>,
}

impl FakeBootstrap {
    /// The bootstrap script defines nothing.
    pub fn without_engine() -> Self {
        Self {
            provides_engine: false,
            ..Self::default()
        }
    }

    /// The engine exists but has no coordination object.
    pub fn without_env() -> Self {
        Self {
            provides_env: false,
            ..Self::default()
        }
    }

    pub fn with_api_reporter(reporter: &Rc<RecordingReporter>) -> Self {
        Self {
            api_reporter: Some(Rc::clone(reporter)),
            ..Self::default()
        }
    }
}

impl Default for FakeBootstrap {
    fn default() -> Self {
        Self {
            script: Script::new("engine/bootstrap.js", "/* engine */"),
            provides_engine: true,
            provides_env: true,
            api_reporter: None,
            core: RefCell::new(None),
        }
    }
}

impl EngineBootstrap for FakeBootstrap {
    fn name(&self) -> &str {
        "fake-engine"
    }

    fn script(&self) -> &Script {
        &self.script
    }

    fn core(&self, _env: &mut dyn Environment) -> Option<Box<dyn Engine>> {
        if !self.provides_engine {
            return None;
        }
        let core = Rc::new(Core::default());
        *self.core.borrow_mut() = Some(Rc::clone(&core));
        let env = self.provides_env.then(|| FakeEngineEnv { core });
        Some(Box::new(FakeEngine { env }))
    }

    fn interface(&self, _engine: &mut dyn Engine) -> Interface {
        let mut bindings = Namespace::new();
        let core = self
            .core
            .borrow()
            .as_ref()
            .map(Rc::downgrade)
            .unwrap_or_default();

        let it_core = core.clone();
        bindings.set(
            "it",
            Value::function("it", move |args| register_spec(&it_core, args, false)),
        );
        let xit_core = core.clone();
        bindings.set(
            "xit",
            Value::function("xit", move |args| register_spec(&xit_core, args, true)),
        );
        bindings.set(
            "expect",
            Value::function("expect", move |args| upgrade(&core)?.expect(args)),
        );

        Interface {
            bindings,
            api_reporter: self
                .api_reporter
                .clone()
                .map(|reporter| reporter as Rc<dyn Reporter>),
        }
    }
}

/// Logs every callback it receives and keeps finished specs.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: RefCell<Vec<String>>,
    pub specs: RefCell<Vec<SpecResult>>,
}

impl Reporter for RecordingReporter {
    fn run_started(&self, total_specs: usize) {
        self.events.borrow_mut().push(format!("run_started {total_specs}"));
    }

    fn spec_done(&self, spec: &SpecResult) {
        self.events
            .borrow_mut()
            .push(format!("spec_done {} {}", spec.full_name, spec.status));
        self.specs.borrow_mut().push(spec.clone());
    }

    fn run_done(&self) {
        self.events.borrow_mut().push("run_done".to_string());
    }

    fn formatter(&self) -> Rc<dyn Formatter> {
        Rc::new(PrettyPrinter::default())
    }
}

// =============================================================================
// SPEC-MODULE HELPERS
// =============================================================================

/// Looks up a global the engine interface installed.
pub fn global(env: &dyn Environment, name: &str) -> Value {
    env.global().get(name).cloned().unwrap_or_default()
}

/// `expect(actual)[matcher](...expected)`, optionally negated.
pub fn expect(expect: &Value, actual: Value, matcher: &str, expected: Vec<Value>, negated: bool) -> Result<Value> {
    expect.call(&[
        actual,
        Value::from(matcher),
        Value::array(expected),
        Value::from(negated),
    ])
}

/// Registers `body` as a spec named `description` through the global `it`.
pub fn spec(
    it: &Value,
    description: &str,
    body: impl Fn(&[Value]) -> Result<Value> + 'static,
) -> Result<Value> {
    it.call(&[Value::from(description), Value::function(description, body)])
}

// =============================================================================
// RUN FIXTURE
// =============================================================================

pub struct Fixture {
    pub dir: tempfile::TempDir,
    pub test_path: PathBuf,
    pub env: TestEnvironment,
    pub runtime: Rc<RefCell<ModuleTable>>,
    pub config: RunConfig,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let test_path = dir.path().join("widget.test.js");
        Self {
            dir,
            test_path,
            env: TestEnvironment::default(),
            runtime: Rc::new(RefCell::new(ModuleTable::default())),
            config: RunConfig {
                use_colors: false,
                ..RunConfig::default()
            },
        }
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.config.snapshot_path(&self.test_path)
    }

    /// Defines the spec module at `test_path`.
    pub fn spec_file(&self, module: impl Fn(&mut dyn Environment) -> Result<Value> + 'static) {
        self.runtime.borrow_mut().define(&self.test_path, module);
    }

    pub fn run_with(&mut self, runner: &SpecRunner) -> Result<RunResult> {
        let runtime: Rc<RefCell<dyn Runtime>> = self.runtime.clone();
        runner.run_spec_file(&self.config, &mut self.env, runtime, &self.test_path)
    }

    pub fn run(&mut self) -> Result<RunResult> {
        self.run_with(&SpecRunner::new(Box::new(FakeBootstrap::default())))
    }
}
