// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection profiles for the coordination store
//!
//! Profiles live in a TOML services file keyed by section name, so the
//! same worker binary can target different stores per deployment. An
//! empty default profile is valid for in-process stores.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from profile loading
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("cannot read profile file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid profile file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no section [{section}] in profile file {path}")]
    SectionNotFound { path: PathBuf, section: String },
}

/// Parameters for one store connection
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub service: Option<String>,
}

impl ConnectionProfile {
    /// Load a single section from a services file
    pub fn from_file(path: &Path, section: &str) -> Result<Self, ProfileError> {
        let file = ProfileFile::load(path)?;
        file.profile(section)
            .cloned()
            .ok_or_else(|| ProfileError::SectionNotFound {
                path: path.to_path_buf(),
                section: section.to_string(),
            })
    }
}

/// A services file holding named connection profiles
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileFile {
    #[serde(flatten)]
    sections: HashMap<String, ConnectionProfile>,
}

impl ProfileFile {
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = std::fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ProfileError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn profile(&self, section: &str) -> Option<&ConnectionProfile> {
        self.sections.get(section)
    }

    pub fn section_names(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
