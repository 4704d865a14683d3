// THEORY:
// This file is the main entry point for the `trap_vision` library crate. It
// exposes two layers:
//
// - `pipeline` and `parallel_pipeline`: the high-level interface. A
//   `TrapAnalyzer` offers the five operations an HTTP or CLI front end needs
//   (segment, classify, forecast, community trend, heat stress), and a
//   `SegmentationPool` segments many uploads concurrently.
// - `core_modules`: the pure building blocks behind those operations. They are
//   public so callers can compose them directly, but none of them performs I/O
//   apart from the segmenter's image decode.
//
// Persistence is abstracted behind `store::ReadingStore`; the crate ships an
// in-memory implementation and depends on no database.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod store;

pub use config::AppConfig;
pub use error::{ConfigError, DecodeError, StoreError, ValidationError};
pub use pipeline::{TrapAnalyzer, UploadAnalysis};
