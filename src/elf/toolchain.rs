// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Locates an ELF introspection tool from the Android NDK or `PATH`.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::version::Version;

/// Variables naming an NDK root directly, in lookup order.
const NDK_ROOT_VARS: [&str; 3] = ["ANDROID_NDK_HOME", "ANDROID_NDK_ROOT", "NDK_HOME"];
/// Variables naming an SDK root containing `ndk/<version>` directories.
const SDK_ROOT_VARS: [&str; 2] = ["ANDROID_HOME", "ANDROID_SDK_ROOT"];
/// Default SDK locations relative to the home directory.
const HOME_SDK_DIRS: [&str; 2] = ["Library/Android/sdk", "Android/Sdk"];
/// Tool names in order of preference.
const TOOL_NAMES: [&str; 2] = ["llvm-readelf", "llvm-objdump"];
const PATH_TOOL_NAMES: [&str; 2] = ["llvm-readelf", "readelf"];

/// Probes candidate installation roots for an introspection tool.
///
/// The environment is captured at construction so discovery is a pure function
/// of the locator's inputs; nothing is cached across runs.
#[derive(Debug, Clone, Default)]
pub struct ToolLocator {
    vars: HashMap<String, OsString>,
    home: Option<PathBuf>,
}

impl ToolLocator {
    /// Locator reading the process environment and home directory.
    #[must_use]
    pub fn from_env() -> Self {
        let vars = NDK_ROOT_VARS
            .iter()
            .chain(SDK_ROOT_VARS.iter())
            .chain(std::iter::once(&"PATH"))
            .filter_map(|name| std::env::var_os(name).map(|value| ((*name).to_string(), value)))
            .collect();
        Self {
            vars,
            home: dirs::home_dir(),
        }
    }

    /// Locator with an explicit environment, used to make discovery reproducible.
    #[must_use]
    pub fn with_env<K, V>(vars: impl IntoIterator<Item = (K, V)>, home: Option<PathBuf>) -> Self
    where
        K: Into<String>,
        V: Into<OsString>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
            home,
        }
    }

    /// Resolve the tool path for this run.
    ///
    /// An existing `explicit` path wins; otherwise NDK roots from the environment,
    /// then the newest versioned NDK below any known SDK root, then `PATH`.
    #[must_use]
    pub fn resolve(&self, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(explicit) = explicit {
            if explicit.is_file() {
                info!(tool = %explicit.display(), "Using configured introspection tool");
                return Some(explicit.to_path_buf());
            }
            warn!(tool = %explicit.display(), "Configured introspection tool not found, probing NDK installations");
        }

        let found = self
            .ndk_roots()
            .iter()
            .find_map(|ndk| Self::tool_in_ndk(ndk))
            .or_else(|| self.tool_on_path());
        match &found {
            Some(tool) => info!(tool = %tool.display(), "Introspection tool located"),
            None => warn!("No ELF introspection tool found, alignment checks will be skipped"),
        }
        found
    }

    /// Candidate NDK roots in lookup order.
    fn ndk_roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = NDK_ROOT_VARS
            .iter()
            .filter_map(|name| self.vars.get(*name))
            .map(PathBuf::from)
            .collect();

        let sdk_roots = SDK_ROOT_VARS
            .iter()
            .filter_map(|name| self.vars.get(*name).map(PathBuf::from))
            .chain(
                self.home
                    .iter()
                    .flat_map(|home| HOME_SDK_DIRS.iter().map(move |dir| home.join(dir))),
            );

        // Newest version across all SDK roots; the sort is stable so earlier roots win ties.
        let mut versioned: Vec<(Version, PathBuf)> = sdk_roots
            .flat_map(|sdk| Self::versioned_ndks(&sdk.join("ndk")))
            .collect();
        versioned.sort_by(|a, b| b.0.cmp(&a.0));
        roots.extend(versioned.into_iter().map(|(_, path)| path));
        roots
    }

    fn versioned_ndks(ndk_dir: &Path) -> Vec<(Version, PathBuf)> {
        let Ok(entries) = fs::read_dir(ndk_dir) else {
            return Vec::new();
        };
        entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let version = Version::parse(entry.file_name().to_str()?)?;
                Some((version, entry.path()))
            })
            .collect()
    }

    fn tool_in_ndk(ndk: &Path) -> Option<PathBuf> {
        let prebuilt = ndk.join("toolchains/llvm/prebuilt");
        let mut hosts: Vec<PathBuf> = fs::read_dir(&prebuilt)
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| entry.path().join("bin"))
            .filter(|bin| bin.is_dir())
            .collect();
        hosts.sort();
        debug!(ndk = %ndk.display(), hosts = hosts.len(), "Probing NDK");
        TOOL_NAMES.iter().find_map(|name| {
            hosts
                .iter()
                .map(|bin| bin.join(executable_name(name)))
                .find(|candidate| candidate.is_file())
        })
    }

    fn tool_on_path(&self) -> Option<PathBuf> {
        let path = self.vars.get("PATH")?;
        let dirs: Vec<PathBuf> = std::env::split_paths(path).collect();
        PATH_TOOL_NAMES.iter().find_map(|name| {
            dirs.iter()
                .map(|dir| dir.join(executable_name(name)))
                .find(|candidate| candidate.is_file())
        })
    }
}

fn executable_name(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}
