//! Token Radar Library
//!
//! Near-real-time analysis pipeline for newly discovered tokens: external
//! analyzer orchestration, composite scoring, pattern classification, and
//! alert gating.

pub mod alert;
pub mod analyzers;
pub mod cache;
pub mod config;
pub mod error;
pub mod limiter;
pub mod models;
pub mod notify;
pub mod pattern;
pub mod pipeline;
pub mod scoring;
pub mod storage;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use models::{AnalysisRecord, TokenCandidate};
pub use pipeline::Orchestrator;
