// THEORY (Command-Line Host):
//
// The pipeline is host-agnostic: it only ever sees `PixelRegion` and
// `LayerLocator`. This binary is the simplest possible host, one that reads
// its layers from PNG files on disk instead of from a live editor document.
// It exists for two reasons: batch use (re-exporting a directory of clips
// from a script) and debugging (reproducing an editor-side report without
// booting the editor).
//
// The mapping is direct. The required positional argument is the visual
// layer, and the optional `--groups` / `--lock` PNGs are registered under
// the canonical metadata layer names so the pipeline discovers them exactly
// as it would inside an editor.

use anyhow::Context;
use grin_meta::config::RunConfig;
use grin_meta::core_modules::layers::{GROUP_LAYER_NAMES, LOCK_LAYER_NAMES, name_matches};
use grin_meta::pipeline::{
    LayerLocator, MetadataPipeline, PipelineConfig, PixelRegion, RasterRegion,
};
use std::env;
use std::path::PathBuf;

/// A document assembled from loose PNG files, fulfilling the same contract
/// an editor-backed document would.
struct FileDocument {
    layers: Vec<(String, RasterRegion)>,
}

impl LayerLocator for FileDocument {
    fn find_by_names(&self, names: &[String]) -> Option<&dyn PixelRegion> {
        self.layers
            .iter()
            .find(|(name, _)| name_matches(name, names))
            .map(|(_, region)| region as &dyn PixelRegion)
    }
}

struct CliOptions {
    visual: PathBuf,
    groups: Option<PathBuf>,
    lock: Option<PathBuf>,
    config_file: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    base_name: Option<String>,
    export: bool,
    encode: bool,
    validate: bool,
    node_path: Option<String>,
    encode_script: Option<String>,
    validate_script: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Logging & Argument Parsing ---
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }
    let options = match CliOptions::parse(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{message}");
            print_usage();
            std::process::exit(1);
        }
    };

    // --- 2. Configuration Layering ---
    // Defaults, then the optional config file, then explicit flags on top.
    let mut run_config = match &options.config_file {
        Some(path) => RunConfig::load(path)
            .with_context(|| format!("could not load config {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(dir) = &options.export_dir {
        run_config.export.export_dir = dir.clone();
    }
    if let Some(base) = &options.base_name {
        run_config.export.base_name = Some(base.clone());
    }
    if options.encode {
        run_config.export.run_encode = true;
    }
    if options.validate {
        run_config.export.run_validate = true;
    }
    if let Some(node) = &options.node_path {
        run_config.toolchain.node_path = node.clone();
    }
    if let Some(script) = &options.encode_script {
        run_config.toolchain.encode_script = script.clone();
    }
    if let Some(script) = &options.validate_script {
        run_config.toolchain.validate_script = script.clone();
    }

    // --- 3. Document Assembly ---
    let visual = image::open(&options.visual)
        .with_context(|| format!("could not open visual image {}", options.visual.display()))?
        .to_rgba8();
    let visual_region = RasterRegion::from(visual);

    let mut layers: Vec<(String, RasterRegion)> = Vec::new();
    if let Some(path) = &options.groups {
        let map = image::open(path)
            .with_context(|| format!("could not open group map {}", path.display()))?
            .into_luma8();
        layers.push((GROUP_LAYER_NAMES[0].to_string(), RasterRegion::from(map)));
    }
    if let Some(path) = &options.lock {
        let map = image::open(path)
            .with_context(|| format!("could not open lock map {}", path.display()))?
            .into_luma8();
        layers.push((LOCK_LAYER_NAMES[0].to_string(), RasterRegion::from(map)));
    }
    let document = FileDocument { layers };

    let document_name = options
        .visual
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "untitled".to_string());

    // --- 4. Summary Report ---
    // A report failure (mismatched maps) is worth seeing but must not stop
    // an export the user asked for.
    let pipeline = MetadataPipeline::new(PipelineConfig::default());
    match pipeline.summarize(&document) {
        Ok(summary) => println!("{}", summary.render_report()),
        Err(error) => eprintln!("summary unavailable: {error}"),
    }

    // --- 5. Export & Toolchain ---
    let should_export =
        options.export || run_config.export.run_encode || run_config.export.run_validate;
    if !should_export {
        return Ok(());
    }

    let outcome = pipeline
        .export(
            &document,
            &visual_region,
            &document_name,
            &run_config.export,
            &run_config.toolchain,
        )
        .await?;

    println!(
        "Exported '{}' to {}",
        outcome.plan.base_name,
        run_config.export.export_dir.display()
    );
    if let Some(encode) = &outcome.encode {
        println!("grin-encode output:\n{}", encode.output);
        match encode.exit_code {
            Some(0) => {}
            Some(code) => println!("grin-encode exited with code {code}"),
            None => println!("grin-encode could not be started"),
        }
    }
    if let Some(validate) = &outcome.validate {
        println!("grin-validate output:\n{}", validate.output);
        match validate.exit_code {
            Some(0) => {}
            Some(code) => println!("grin-validate exited with code {code}"),
            None => println!("grin-validate could not be started"),
        }
    }

    Ok(())
}

impl CliOptions {
    fn parse(args: &[String]) -> Result<Self, String> {
        let mut visual: Option<PathBuf> = None;
        let mut groups = None;
        let mut lock = None;
        let mut config_file = None;
        let mut export_dir = None;
        let mut base_name = None;
        let mut export = false;
        let mut encode = false;
        let mut validate = false;
        let mut node_path = None;
        let mut encode_script = None;
        let mut validate_script = None;

        let mut index = 0;
        while index < args.len() {
            match args[index].as_str() {
                "--groups" => groups = Some(PathBuf::from(take_value(args, &mut index)?)),
                "--lock" => lock = Some(PathBuf::from(take_value(args, &mut index)?)),
                "--config" => config_file = Some(PathBuf::from(take_value(args, &mut index)?)),
                "--out" => export_dir = Some(PathBuf::from(take_value(args, &mut index)?)),
                "--base" => base_name = Some(take_value(args, &mut index)?.to_string()),
                "--export" => export = true,
                "--encode" => encode = true,
                "--validate" => validate = true,
                "--node" => node_path = Some(take_value(args, &mut index)?.to_string()),
                "--encode-script" => {
                    encode_script = Some(take_value(args, &mut index)?.to_string());
                }
                "--validate-script" => {
                    validate_script = Some(take_value(args, &mut index)?.to_string());
                }
                flag if flag.starts_with("--") => return Err(format!("unknown option: {flag}")),
                positional => {
                    if visual.is_some() {
                        return Err(format!("unexpected argument: {positional}"));
                    }
                    visual = Some(PathBuf::from(positional));
                }
            }
            index += 1;
        }

        let visual = visual.ok_or_else(|| "missing required <visual.png> argument".to_string())?;
        Ok(Self {
            visual,
            groups,
            lock,
            config_file,
            export_dir,
            base_name,
            export,
            encode,
            validate,
            node_path,
            encode_script,
            validate_script,
        })
    }
}

/// Consumes the value following a flag, advancing the cursor past it.
fn take_value<'a>(args: &'a [String], index: &mut usize) -> Result<&'a str, String> {
    let flag = &args[*index];
    *index += 1;
    args.get(*index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing value for {flag}"))
}

fn print_usage() {
    println!("Usage: grin_meta <visual.png> [options]");
    println!();
    println!("Reports group/lock map statistics for an image and optionally exports");
    println!("the GRIN sidecar set (visual, maps, rules, encoded clip).");
    println!();
    println!("Options:");
    println!("  --groups <path>           group map PNG (grayscale, one byte per pixel)");
    println!("  --lock <path>             lock map PNG (grayscale, one byte per pixel)");
    println!("  --config <path>           JSON configuration file");
    println!("  --out <dir>               export directory (default: ~/grin-exports)");
    println!("  --base <name>             base name for exported files");
    println!("  --export                  write the sidecar set");
    println!("  --encode                  run grin-encode after exporting");
    println!("  --validate                run grin-validate after encoding");
    println!("  --node <path>             node executable (default: node)");
    println!("  --encode-script <path>    path to grin-encode.js");
    println!("  --validate-script <path>  path to grin-validate.js");
}
