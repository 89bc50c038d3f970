//! Assembly options, loadable from TOML.
//!
//! ```toml
//! hierarchy = "always"
//! keyframes = "auto"
//! labels = "never"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Whether an optional annotation table is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emission {
    /// Emit when at least one input owner carries the annotation.
    #[default]
    Auto,
    Always,
    Never,
}

impl Emission {
    pub fn resolve(self, any_present: bool) -> bool {
        match self {
            Emission::Auto => any_present,
            Emission::Always => true,
            Emission::Never => false,
        }
    }
}

/// Which annotation tables an assembly produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssemblyOptions {
    /// `cluster_extra1_arr`.
    pub hierarchy: Emission,
    /// `cluster_extra2_arr`, `*_node_extra1_arr` and the keyframe tables.
    pub keyframes: Emission,
    /// `cluster_extra3_arr`, `*_node_extra2_arr` and the label blob.
    pub labels: Emission,
}

impl AssemblyOptions {
    /// Emit every annotation table.
    pub fn all() -> Self {
        Self {
            hierarchy: Emission::Always,
            keyframes: Emission::Always,
            labels: Emission::Always,
        }
    }

    /// Emit only the core cluster, node and edge tables.
    pub fn bare() -> Self {
        Self {
            hierarchy: Emission::Never,
            keyframes: Emission::Never,
            labels: Emission::Never,
        }
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
