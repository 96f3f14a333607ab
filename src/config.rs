// THEORY:
// Every default the engine relies on lives here, enumerated, instead of being
// scattered through the core as constants: where exports land, what the Node
// executable is called, where the encode/validate scripts sit. The core
// modules stay environment-free; only this layer looks at `$HOME`, and only
// to compute the default export directory. Hosts can override any field
// through an optional JSON config file, with every missing field falling
// back to its default independently.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Where exports land and which toolchain steps run afterwards.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Directory receiving the sidecar set.
    pub export_dir: PathBuf,
    /// Explicit base name for the sidecar files. `None` (or blank) derives
    /// one from the document name.
    pub base_name: Option<String>,
    /// Run the encoder after the sidecars are written.
    pub run_encode: bool,
    /// Run the validator after the encode step.
    pub run_validate: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            export_dir: default_export_dir(),
            base_name: None,
            run_encode: false,
            run_validate: false,
        }
    }
}

/// Locations of the external toolchain pieces.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Node executable used to launch both scripts.
    pub node_path: String,
    pub encode_script: String,
    pub validate_script: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            node_path: "node".to_string(),
            encode_script: "tools/bin/grin-encode.js".to_string(),
            validate_script: "tools/bin/grin-validate.js".to_string(),
        }
    }
}

/// The full configuration bundle a host can load from disk.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub export: ExportConfig,
    pub toolchain: ToolchainConfig,
}

impl RunConfig {
    /// Loads a bundle from a JSON file. Missing fields keep their defaults;
    /// a missing or malformed file is an error the caller decides about.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// `$HOME/grin-exports`, falling back to a relative `grin-exports` when the
/// environment carries no home directory.
pub fn default_export_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => Path::new(&home).join("grin-exports"),
        _ => PathBuf::from("grin-exports"),
    }
}
