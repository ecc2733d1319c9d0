// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Audit configuration, loaded from TOML and overridden on the command line.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::dependencies::{
    default_project_dirs, DEFAULT_CONFIGURATION, DEFAULT_DEPENDENCY_TIMEOUT,
};

/// Name of the configuration file picked up from the project root.
pub const CONFIG_FILE_NAME: &str = "pagesize-audit.toml";
/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "PAGESIZE_AUDIT_CONFIG";

const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {path:?}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {path:?}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuditConfig {
    /// Explicit ELF introspection tool; discovered from the NDK when unset.
    pub tool: Option<PathBuf>,
    /// Worker threads for library inspection; available parallelism when unset.
    pub jobs: Option<NonZeroUsize>,
    pub tool_timeout_secs: u64,
    pub resolve_dependencies: bool,
    pub dependency_timeout_secs: u64,
    pub dependency_configuration: String,
    /// Platform build trees, relative to the project root.
    pub build_dirs: Vec<PathBuf>,
    /// Directories of prebuilt libraries added by hand, relative to the project root.
    pub manual_dirs: Vec<PathBuf>,
    /// Candidate Gradle project directories for dependency resolution.
    pub android_project_dirs: Vec<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            tool: None,
            jobs: None,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            resolve_dependencies: true,
            dependency_timeout_secs: DEFAULT_DEPENDENCY_TIMEOUT.as_secs(),
            dependency_configuration: DEFAULT_CONFIGURATION.to_string(),
            build_dirs: paths(&["platforms/android", "app/build"]),
            manual_dirs: paths(&[
                "App_Resources/Android/libs",
                "App_Resources/Android/src/main/jniLibs",
                "app/src/main/jniLibs",
            ]),
            android_project_dirs: default_project_dirs(),
        }
    }
}

fn paths(dirs: &[&str]) -> Vec<PathBuf> {
    dirs.iter().map(PathBuf::from).collect()
}

impl AuditConfig {
    /// Load a configuration file; missing keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Resolve the configuration for a run on `root`.
    ///
    /// An explicit file wins, then the file named by `PAGESIZE_AUDIT_CONFIG`,
    /// then `pagesize-audit.toml` in the project root, then the defaults.
    ///
    /// # Errors
    /// Returns an error if a selected file cannot be loaded.
    pub fn resolve(explicit: Option<&Path>, root: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from_file(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load_from_file(Path::new(&path));
        }
        let in_root = root.join(CONFIG_FILE_NAME);
        if in_root.is_file() {
            return Self::load_from_file(&in_root);
        }
        Ok(Self::default())
    }

    #[must_use]
    pub fn jobs(&self) -> usize {
        self.jobs
            .or_else(|| std::thread::available_parallelism().ok())
            .map_or(1, NonZeroUsize::get)
    }

    #[must_use]
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    #[must_use]
    pub fn dependency_timeout(&self) -> Duration {
        Duration::from_secs(self.dependency_timeout_secs)
    }
}
