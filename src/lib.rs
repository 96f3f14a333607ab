// THEORY:
// This file is the main entry point for the `grin_meta` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the
// public API that will be exposed to external consumers (host adapters and
// the bundled CLI).
//
// The primary goal is to export the `MetadataPipeline` and its associated
// data structures (`PipelineConfig`, `MapSummary`, `ExportOutcome`, etc.) as
// the clean, high-level interface for the entire metadata engine. The
// internal building blocks (`core_modules`) stay encapsulated behind the
// pipeline facade, providing a clean separation of concerns; `config`,
// `export`, and `toolchain` are public because hosts legitimately reach for
// their types when wiring configuration or displaying tool results.

pub mod config;
pub mod core_modules;
pub mod export;
pub mod pipeline;
pub mod toolchain;
