pub use crate::aggregate::{aggregate, RunResult, SnapshotSummary};
pub use crate::errors::{AdapterError, Result};
pub use crate::runner::{RunPhase, SpecRunner};
pub use crate::value::Value;

pub mod aggregate;
pub mod calls;
pub mod capture;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod equality;
pub mod errors;
pub mod host;
pub mod matchers;
pub mod pretty;
pub mod registry;
pub mod reporter;
pub mod runner;
pub mod snapshot;
pub mod value;
