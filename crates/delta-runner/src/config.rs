//! Runner options

use delta_vm::RuntimeContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Host-facing runner configuration
///
/// Changing options marks them pending; they are applied to the core
/// configuration once, right before the next batch compiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerOptions {
    /// Module the program lives in; its directory is searched first
    pub root_module_path: Option<PathBuf>,
    /// Further directories to search, in order
    pub search_directories: Vec<PathBuf>,
    /// Options handed through to the core untouched
    pub pass_through: BTreeMap<String, serde_json::Value>,
    /// Accept raw statements instead of graph edits
    pub interpreter_mode: bool,
    /// How often one statement may be re-evaluated within a batch
    pub max_update_passes: usize,
    /// Deepest allowed function call nesting
    pub max_call_depth: usize,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        let context = RuntimeContext::default();
        Self {
            root_module_path: None,
            search_directories: Vec::new(),
            pass_through: BTreeMap::new(),
            interpreter_mode: false,
            max_update_passes: context.max_update_passes,
            max_call_depth: context.max_call_depth,
        }
    }
}

impl RunnerOptions {
    /// Default options: graph mode, no search directories
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root module path
    #[inline]
    #[must_use]
    pub fn with_root_module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_module_path = Some(path.into());
        self
    }

    /// Append a search directory
    #[inline]
    #[must_use]
    pub fn with_search_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.search_directories.push(directory.into());
        self
    }

    /// Add an option handed through to the core
    #[inline]
    #[must_use]
    pub fn with_pass_through(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.pass_through.insert(key.into(), value);
        self
    }

    /// Switch interpreter mode on or off
    #[inline]
    #[must_use]
    pub fn with_interpreter_mode(mut self, enabled: bool) -> Self {
        self.interpreter_mode = enabled;
        self
    }

    /// Limit re-evaluations per statement and batch
    #[inline]
    #[must_use]
    pub fn with_max_update_passes(mut self, passes: usize) -> Self {
        self.max_update_passes = passes;
        self
    }

    /// Limit call nesting
    #[inline]
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Parse options from JSON; missing fields take their defaults
    ///
    /// # Errors
    /// Returns the JSON error for malformed input.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Configuration the core actually runs with
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoreConfiguration {
    /// Root module directory first, then the search directories
    pub include_directories: Vec<PathBuf>,
    /// Pass-through options as given
    pub pass_through: BTreeMap<String, serde_json::Value>,
    /// Limits handed to the interpreter
    pub runtime: RuntimeContext,
}

impl CoreConfiguration {
    /// Bring the configuration in line with `options`
    pub fn apply(&mut self, options: &RunnerOptions) {
        let root_dir = options
            .root_module_path
            .as_ref()
            .and_then(|path| path.parent())
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(PathBuf::from);

        self.include_directories.clear();
        for dir in root_dir.into_iter().chain(options.search_directories.iter().cloned()) {
            if !self.include_directories.contains(&dir) {
                self.include_directories.push(dir);
            }
        }
        self.pass_through.clone_from(&options.pass_through);
        self.runtime = RuntimeContext::default()
            .with_max_update_passes(options.max_update_passes)
            .with_max_call_depth(options.max_call_depth);
    }
}
