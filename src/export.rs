// THEORY:
// The `export` module turns one document's metadata into the portable sidecar
// set the downstream toolchain consumes. An `ExportPlan` is pure path
// arithmetic: directory plus base name in, five canonical paths out. The
// writers then materialize the visual PNG, the two grayscale map PNGs, and
// the rules JSON at those paths. Planning never touches the filesystem, so
// every host can show the user exactly what will be written before anything
// is.
//
// Key architectural principles:
// 1.  **Deterministic layout**: The same directory and base name always
//     produce the same five paths and the same default rules text,
//     byte for byte. Downstream tools and diffs depend on this.
// 2.  **Encode in memory, write once**: PNGs are encoded into a buffer and
//     written with a single async write. A failed encode never leaves a
//     truncated file behind.
// 3.  **Every failure names its path**: Partial exports are meaningful
//     states. Each error variant carries the path and step that failed so
//     callers can report precisely what is missing.

use crate::core_modules::sampler::sampler::SampleBuffer;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default tick duration for the rules payload, in microseconds (~30 Hz).
pub const DEFAULT_TICK_MICROS: u32 = 33333;
/// Default opcode set the rules payload targets.
pub const DEFAULT_OPCODE_SET_ID: u32 = 0;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("could not create export directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not encode PNG for {path}: {source}")]
    EncodePng {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("could not write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not serialize rules payload for {path}: {source}")]
    SerializeRules {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The five sidecar paths derived from one export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPlan {
    pub base_name: String,
    /// Full visual composite, `<base>.png`.
    pub visual_path: PathBuf,
    /// Grayscale group map, `<base>.groups.png`.
    pub groups_path: PathBuf,
    /// Grayscale lock map, `<base>.lock.png`.
    pub lock_path: PathBuf,
    /// Rules sidecar, `<base>.rules.json`.
    pub rules_path: PathBuf,
    /// Encoded artifact the toolchain produces, `<base>.grin`.
    pub encoded_path: PathBuf,
}

impl ExportPlan {
    pub fn new(export_dir: &Path, base_name: &str) -> Self {
        let with_suffix = |suffix: &str| export_dir.join(format!("{base_name}{suffix}"));
        Self {
            base_name: base_name.to_string(),
            visual_path: with_suffix(".png"),
            groups_path: with_suffix(".groups.png"),
            lock_path: with_suffix(".lock.png"),
            rules_path: with_suffix(".rules.json"),
            encoded_path: with_suffix(".grin"),
        }
    }
}

/// Strips the final extension from a document name: `scene.v2.png` becomes
/// `scene.v2`. Names without an extension (or dotfiles) pass through.
pub fn derive_base_name(document_name: &str) -> String {
    match document_name.rfind('.') {
        Some(index) if index > 0 => document_name[..index].to_string(),
        _ => document_name.to_string(),
    }
}

/// Picks the export base name: an explicitly supplied non-blank name wins,
/// anything blank falls back to the document name with its extension
/// stripped.
pub fn resolve_base_name(requested: Option<&str>, document_name: &str) -> String {
    match requested {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => derive_base_name(document_name),
    }
}

/// One timed opcode dispatch consumed by the downstream encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    /// Bitmask over group IDs 0-15 the rule applies to.
    pub group_mask: u16,
    pub opcode: u8,
    /// Timing slot for the dispatch, in ticks.
    pub timing: u32,
}

/// The rules sidecar content. Materialized with stable defaults even when
/// no rules have been authored, because the encoder reads it
/// unconditionally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesPayload {
    pub tick_micros: u32,
    pub opcode_set_id: u32,
    pub rules: Vec<Rule>,
}

impl Default for RulesPayload {
    fn default() -> Self {
        Self {
            tick_micros: DEFAULT_TICK_MICROS,
            opcode_set_id: DEFAULT_OPCODE_SET_ID,
            rules: Vec::new(),
        }
    }
}

impl RulesPayload {
    /// Serializes with the 2-space indentation downstream diffs rely on.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Creates the export directory and any missing parents. Succeeds when the
/// directory already exists.
pub async fn ensure_export_dir(path: &Path) -> Result<(), ExportError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| ExportError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

/// Encodes interleaved RGBA bytes as a PNG and writes it to `path`.
pub async fn write_rgba_png(
    path: &Path,
    width: u32,
    height: u32,
    bytes: &[u8],
) -> Result<(), ExportError> {
    let encoded = encode_png(path, width, height, bytes, ExtendedColorType::Rgba8)?;
    write_bytes(path, encoded).await
}

/// Encodes a grayscale sample buffer as an 8-bit PNG and writes it to
/// `path`.
pub async fn write_grayscale_png(
    path: &Path,
    width: u32,
    height: u32,
    samples: &SampleBuffer,
) -> Result<(), ExportError> {
    let encoded = encode_png(path, width, height, samples, ExtendedColorType::L8)?;
    write_bytes(path, encoded).await
}

/// Writes the rules sidecar as pretty-printed JSON.
pub async fn write_rules_json(path: &Path, payload: &RulesPayload) -> Result<(), ExportError> {
    let json = payload
        .to_pretty_json()
        .map_err(|source| ExportError::SerializeRules {
            path: path.to_path_buf(),
            source,
        })?;
    write_bytes(path, json.into_bytes()).await
}

fn encode_png(
    path: &Path,
    width: u32,
    height: u32,
    bytes: &[u8],
    color: ExtendedColorType,
) -> Result<Vec<u8>, ExportError> {
    let mut encoded = Vec::new();
    PngEncoder::new(&mut encoded)
        .write_image(bytes, width, height, color)
        .map_err(|source| ExportError::EncodePng {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(encoded)
}

async fn write_bytes(path: &Path, bytes: Vec<u8>) -> Result<(), ExportError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| ExportError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
}
