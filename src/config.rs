//! Per-run configuration.
//!
//! Loaded by the host from YAML or JSON (camelCase keys); every field has a
//! default so an empty document is a valid configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::Result;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    /// Rewrite mismatching snapshots and drop obsolete ones.
    pub update_snapshot: bool,
    /// Keep the module registry between test cases.
    pub persist_module_registry: bool,
    /// Module loaded once after the engine interface is installed.
    pub setup_test_framework_script_file: Option<PathBuf>,
    pub use_colors: bool,
    pub snapshot_dir: String,
    pub snapshot_extension: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            update_snapshot: false,
            persist_module_registry: false,
            setup_test_framework_script_file: None,
            use_colors: atty::is(atty::Stream::Stderr),
            snapshot_dir: "__snapshots__".to_string(),
            snapshot_extension: "snap".to_string(),
        }
    }
}

impl RunConfig {
    /// Parses YAML, which includes JSON documents.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// `<test dir>/<snapshot_dir>/<test file name>.<snapshot_extension>`
    pub fn snapshot_path(&self, test_path: &Path) -> PathBuf {
        let file_name = test_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        test_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(&self.snapshot_dir)
            .join(format!("{file_name}.{}", self.snapshot_extension))
    }
}
