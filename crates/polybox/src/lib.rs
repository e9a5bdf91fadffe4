#![doc = include_str!("../README.md")]

pub mod config;
pub mod pipeline;
pub mod source;
pub mod telemetry;

pub use pipeline::{PipelineConfig, run};
pub use polybox_core;
