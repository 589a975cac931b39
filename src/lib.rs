//! Phishing Defense - Clone Detection Core
//!
//! Detects phishing clones of a known legitimate website by rendering
//! candidate domains and scoring how closely each resembles a trusted
//! baseline snapshot across four weighted signals: visible text (TF-IDF
//! cosine), screenshot pixels, DOM structure and brand keywords.
//!
//! Rendering and durable storage are consumed through the [`renderer::Renderer`]
//! and [`store::Store`] boundaries; [`engine::DetectionEngine`] is the surface
//! an API layer embeds.

pub mod baseline;
pub mod checker;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod renderer;
pub mod scheduler;
pub mod similarity;
pub mod storage;
pub mod store;
pub mod types;

#[cfg(test)]
pub mod testutil;

pub use config::EngineConfig;
pub use engine::DetectionEngine;
pub use error::{EngineError, EngineResult};
pub use scheduler::StartOutcome;
pub use storage::FileStore;
pub use types::{
    Baseline, CheckRecord, FeatureSet, MonitoringStatus, Screenshot, SimilarityResult, Snapshot,
    ThreatLevel, WatchedDomain,
};
