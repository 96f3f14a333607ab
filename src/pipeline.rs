// THEORY:
// The `pipeline` module is the final, top-level API for the metadata engine.
// It encapsulates the full stack into a single, easy-to-use interface: hand
// it a document (anything implementing `LayerLocator`) and it will locate
// the metadata layers, sample them, summarize usage, and run the export
// workflow end to end. Hosts never talk to the core modules directly; this
// facade is the one seam they integrate against.
//
// Summarization and export are independent on purpose. A failed summary
// (say, mismatched map dimensions) never blocks a later export attempt, and
// a failed export never poisons preview reporting. Within one export, the
// sidecar writes target disjoint paths and run concurrently; the external
// encode and validate invocations stay strictly sequential, encode first,
// because the validator reads what the encoder produced.

use crate::config::{ExportConfig, ToolchainConfig};
use crate::core_modules::channel_codec::channel_codec::GroupId;
use crate::core_modules::layers;
use crate::core_modules::sampler::sampler::{SampleBuffer, sample_channel};
use crate::core_modules::summarizer::summarize_maps;
use crate::core_modules::tags;
use crate::export::{
    ExportError, ExportPlan, RulesPayload, ensure_export_dir, resolve_base_name,
    write_grayscale_png, write_rgba_png, write_rules_json,
};
use crate::toolchain::{ToolOutcome, encode_command, run_tool, validate_command};
use futures::future::{BoxFuture, try_join_all};
use tracing::{debug, info};

// Re-export key data structures for the public API.
pub use crate::core_modules::layers::LayerLocator;
pub use crate::core_modules::sampler::sampler::{PixelRegion, RasterRegion};
pub use crate::core_modules::summarizer::{MapSummary, SummaryError};
pub use crate::core_modules::tags::{TagMetadata, TagSource};

/// Configuration for the MetadataPipeline, allowing hosts to rename the
/// metadata layers and tune tag fallbacks.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Names accepted for the group map layer, checked case-insensitively.
    pub group_layer_names: Vec<String>,
    /// Names accepted for the lock map layer, checked case-insensitively.
    pub lock_layer_names: Vec<String>,
    /// Fallback group ID for tag text without a group tag.
    pub default_group: GroupId,
    /// Fallback lock state for tag text without lock tags.
    pub default_locked: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            group_layer_names: layers::default_group_layer_names(),
            lock_layer_names: layers::default_lock_layer_names(),
            default_group: 0,
            default_locked: false,
        }
    }
}

/// Everything produced by one export run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub plan: ExportPlan,
    /// Encoder invocation result, when the encode step was requested.
    pub encode: Option<ToolOutcome>,
    /// Validator invocation result, when the validate step was requested.
    pub validate: Option<ToolOutcome>,
}

/// One sampled metadata layer with the dimensions it was read at.
struct SampledMap {
    width: u32,
    height: u32,
    samples: SampleBuffer,
}

/// The main, top-level struct for the metadata engine.
pub struct MetadataPipeline {
    config: PipelineConfig,
}

impl MetadataPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Samples whichever metadata layers the document has and aggregates
    /// them into a `MapSummary`. Missing layers degrade to zeroed
    /// statistics.
    pub fn summarize(&self, document: &dyn LayerLocator) -> Result<MapSummary, SummaryError> {
        let group_map = self.sample_map(document, &self.config.group_layer_names);
        let lock_map = self.sample_map(document, &self.config.lock_layer_names);
        summarize_maps(
            group_map.as_ref().map(|map| &map.samples),
            lock_map.as_ref().map(|map| &map.samples),
        )
    }

    /// Resolves group/lock hints from an item's name and note text using
    /// the configured fallbacks.
    pub fn resolve_item_tags(&self, name: &str, note: &str) -> TagMetadata {
        tags::resolve_tags(
            name,
            note,
            self.config.default_group,
            self.config.default_locked,
        )
    }

    /// Runs the full export workflow: resolve the base name, plan the
    /// sidecar paths, create the export directory, write the visual
    /// composite plus whichever maps exist and the rules sidecar, then run
    /// the requested encode and validate steps, in that order.
    ///
    /// The first filesystem failure halts all remaining steps. Tool runs
    /// never fail the export; their outcomes come back for display.
    pub async fn export(
        &self,
        document: &dyn LayerLocator,
        visual: &RasterRegion,
        document_name: &str,
        export_config: &ExportConfig,
        toolchain_config: &ToolchainConfig,
    ) -> Result<ExportOutcome, ExportError> {
        let base_name = resolve_base_name(export_config.base_name.as_deref(), document_name);
        let plan = ExportPlan::new(&export_config.export_dir, &base_name);
        info!(
            "exporting '{}' into {}",
            plan.base_name,
            export_config.export_dir.display()
        );

        ensure_export_dir(&export_config.export_dir).await?;

        let group_map = self.sample_map(document, &self.config.group_layer_names);
        let lock_map = self.sample_map(document, &self.config.lock_layer_names);
        let rules = RulesPayload::default();

        // Sidecar paths are disjoint, so the writes run concurrently.
        let mut writes: Vec<BoxFuture<'_, Result<(), ExportError>>> = vec![
            Box::pin(write_rgba_png(
                &plan.visual_path,
                visual.width(),
                visual.height(),
                visual.bytes(),
            )),
            Box::pin(write_rules_json(&plan.rules_path, &rules)),
        ];
        if let Some(map) = &group_map {
            writes.push(Box::pin(write_grayscale_png(
                &plan.groups_path,
                map.width,
                map.height,
                &map.samples,
            )));
        }
        if let Some(map) = &lock_map {
            writes.push(Box::pin(write_grayscale_png(
                &plan.lock_path,
                map.width,
                map.height,
                &map.samples,
            )));
        }
        try_join_all(writes).await?;
        debug!("sidecars written for '{}'", plan.base_name);

        let encode = if export_config.run_encode {
            let command = encode_command(
                &toolchain_config.node_path,
                &toolchain_config.encode_script,
                &plan.visual_path,
                &plan.encoded_path,
                &plan.groups_path,
                &plan.rules_path,
            );
            Some(run_tool(&command).await)
        } else {
            None
        };

        let validate = if export_config.run_validate {
            let command = validate_command(
                &toolchain_config.node_path,
                &toolchain_config.validate_script,
                &plan.encoded_path,
            );
            Some(run_tool(&command).await)
        } else {
            None
        };

        Ok(ExportOutcome {
            plan,
            encode,
            validate,
        })
    }

    fn sample_map(&self, document: &dyn LayerLocator, names: &[String]) -> Option<SampledMap> {
        let region = document.find_by_names(names)?;
        Some(SampledMap {
            width: region.width(),
            height: region.height(),
            samples: sample_channel(region),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::layers::name_matches;

    struct StubDocument {
        layers: Vec<(String, RasterRegion)>,
    }

    impl StubDocument {
        fn new(layers: Vec<(&str, RasterRegion)>) -> Self {
            Self {
                layers: layers
                    .into_iter()
                    .map(|(name, region)| (name.to_string(), region))
                    .collect(),
            }
        }
    }

    impl LayerLocator for StubDocument {
        fn find_by_names(&self, names: &[String]) -> Option<&dyn PixelRegion> {
            self.layers
                .iter()
                .find(|(name, _)| name_matches(name, names))
                .map(|(_, region)| region as &dyn PixelRegion)
        }
    }

    fn gray(width: u32, height: u32, samples: Vec<u8>) -> RasterRegion {
        RasterRegion::new(width, height, 1, samples).expect("valid gray raster")
    }

    fn rgba(width: u32, height: u32) -> RasterRegion {
        let mut bytes = Vec::new();
        for index in 0..(width * height) {
            bytes.extend_from_slice(&[index as u8, 0, 0, 255]);
        }
        RasterRegion::new(width, height, 4, bytes).expect("valid rgba raster")
    }

    #[test]
    fn summarize_finds_layers_case_insensitively() {
        let document = StubDocument::new(vec![
            ("background", gray(3, 1, vec![9, 9, 9])),
            ("GRIN_GROUPS", gray(3, 1, vec![3, 3, 3])),
            ("grin_lock", gray(3, 1, vec![0, 128, 255])),
        ]);
        let pipeline = MetadataPipeline::new(PipelineConfig::default());

        let summary = pipeline.summarize(&document).expect("maps agree");
        assert_eq!(summary.total_pixels, 3);
        assert_eq!(summary.group_counts[3], 3);
        assert_eq!(summary.locked_pixels, 2);
        assert_eq!(summary.unlocked_pixels, 1);
    }

    #[test]
    fn summarize_degrades_without_metadata_layers() {
        let document = StubDocument::new(vec![("background", gray(2, 2, vec![1, 2, 3, 4]))]);
        let pipeline = MetadataPipeline::new(PipelineConfig::default());

        let summary = pipeline.summarize(&document).expect("nothing to mismatch");
        assert_eq!(summary, MapSummary::empty());
    }

    #[test]
    fn summarize_without_lock_map_keeps_lock_counters_zero() {
        let document = StubDocument::new(vec![("GRIN_GROUP_MAP", gray(2, 1, vec![15, 16]))]);
        let pipeline = MetadataPipeline::new(PipelineConfig::default());

        let summary = pipeline.summarize(&document).expect("no lock map");
        assert_eq!(summary.total_pixels, 2);
        assert_eq!(summary.group_counts[15], 1);
        assert_eq!(summary.group_counts[1], 1);
        assert_eq!(summary.locked_pixels, 0);
        assert_eq!(summary.unlocked_pixels, 0);
    }

    #[test]
    fn summarize_rejects_mismatched_map_sizes() {
        let document = StubDocument::new(vec![
            ("GRIN_GROUPS", gray(2, 1, vec![1, 2])),
            ("GRIN_LOCK", gray(1, 1, vec![255])),
        ]);
        let pipeline = MetadataPipeline::new(PipelineConfig::default());

        let error = pipeline.summarize(&document).expect_err("sizes differ");
        assert!(matches!(error, SummaryError::LengthMismatch { .. }));
    }

    #[test]
    fn item_tags_honor_configured_fallbacks() {
        let pipeline = MetadataPipeline::new(PipelineConfig {
            default_group: 2,
            default_locked: true,
            ..PipelineConfig::default()
        });

        let untagged = pipeline.resolve_item_tags("plain item", "");
        assert_eq!(untagged.group_id, 2);
        assert!(untagged.locked);
        assert_eq!(untagged.source, TagSource::Default);

        let tagged = pipeline.resolve_item_tags("hero [G9] UNLOCK", "");
        assert_eq!(tagged.group_id, 9);
        assert!(!tagged.locked);
        assert_eq!(tagged.source, TagSource::Name);
    }

    #[tokio::test]
    async fn export_writes_the_full_sidecar_set() {
        let root = tempfile::tempdir().expect("tempdir");
        let document = StubDocument::new(vec![
            ("GRIN_GROUPS", gray(2, 2, vec![1, 2, 3, 4])),
            ("GRIN_LOCK", gray(2, 2, vec![0, 255, 0, 255])),
        ]);
        let pipeline = MetadataPipeline::new(PipelineConfig::default());
        let export_config = ExportConfig {
            export_dir: root.path().join("exports"),
            ..ExportConfig::default()
        };

        let outcome = pipeline
            .export(
                &document,
                &rgba(2, 2),
                "scene.png",
                &export_config,
                &ToolchainConfig::default(),
            )
            .await
            .expect("export succeeds");

        assert_eq!(outcome.plan.base_name, "scene");
        assert!(outcome.plan.visual_path.is_file());
        assert!(outcome.plan.groups_path.is_file());
        assert!(outcome.plan.lock_path.is_file());
        assert!(outcome.plan.rules_path.is_file());
        assert!(!outcome.plan.encoded_path.exists());
        assert!(outcome.encode.is_none());
        assert!(outcome.validate.is_none());

        let groups = image::open(&outcome.plan.groups_path)
            .expect("groups map reopens")
            .into_luma8();
        assert_eq!(groups.into_raw(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn export_skips_maps_the_document_lacks() {
        let root = tempfile::tempdir().expect("tempdir");
        let document = StubDocument::new(vec![("GRIN_GROUPS", gray(1, 1, vec![7]))]);
        let pipeline = MetadataPipeline::new(PipelineConfig::default());
        let export_config = ExportConfig {
            export_dir: root.path().to_path_buf(),
            base_name: Some("tile".to_string()),
            ..ExportConfig::default()
        };

        let outcome = pipeline
            .export(
                &document,
                &rgba(1, 1),
                "ignored.png",
                &export_config,
                &ToolchainConfig::default(),
            )
            .await
            .expect("export succeeds");

        assert_eq!(outcome.plan.base_name, "tile");
        assert!(outcome.plan.groups_path.is_file());
        assert!(!outcome.plan.lock_path.exists());
    }

    #[tokio::test]
    async fn export_runs_encode_then_validate() {
        let root = tempfile::tempdir().expect("tempdir");
        let document = StubDocument::new(vec![("GRIN_GROUPS", gray(1, 1, vec![0]))]);
        let pipeline = MetadataPipeline::new(PipelineConfig::default());
        let export_config = ExportConfig {
            export_dir: root.path().to_path_buf(),
            base_name: Some("clip".to_string()),
            run_encode: true,
            run_validate: true,
        };
        // `echo` stands in for node: the invocation succeeds and echoes its
        // argument vector back as output.
        let toolchain_config = ToolchainConfig {
            node_path: "echo".to_string(),
            encode_script: "enc.js".to_string(),
            validate_script: "val.js".to_string(),
        };

        let outcome = pipeline
            .export(
                &document,
                &rgba(1, 1),
                "clip.png",
                &export_config,
                &toolchain_config,
            )
            .await
            .expect("export succeeds");

        let encode = outcome.encode.expect("encode ran");
        assert!(encode.succeeded());
        assert!(encode.output.contains("enc.js"));
        assert!(encode.output.contains("--groups"));
        assert!(encode.output.contains("--rules"));
        assert_eq!(encode.command[0], "echo");

        let validate = outcome.validate.expect("validate ran");
        assert!(validate.succeeded());
        assert!(validate.output.contains("val.js"));
        assert!(validate.output.contains("clip.grin"));
    }

    #[tokio::test]
    async fn export_halts_when_the_directory_cannot_be_created() {
        let root = tempfile::tempdir().expect("tempdir");
        let blocker = root.path().join("blocker");
        tokio::fs::write(&blocker, b"a file, not a directory")
            .await
            .expect("write blocker");

        let document = StubDocument::new(vec![("GRIN_GROUPS", gray(1, 1, vec![0]))]);
        let pipeline = MetadataPipeline::new(PipelineConfig::default());
        let export_config = ExportConfig {
            export_dir: blocker.join("exports"),
            base_name: Some("doomed".to_string()),
            run_encode: true,
            run_validate: true,
        };

        let error = pipeline
            .export(
                &document,
                &rgba(1, 1),
                "doomed.png",
                &export_config,
                &ToolchainConfig::default(),
            )
            .await
            .expect_err("directory creation fails");
        assert!(matches!(error, ExportError::CreateDir { .. }));
    }
}
