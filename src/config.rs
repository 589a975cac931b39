//! Engine configuration.
//!
//! Defaults mirror the production deployment; every knob can be overridden
//! from the environment. Weights and thresholds are calibration values, not
//! protocol constants, so they live here rather than in the similarity
//! engine.

use serde::{Deserialize, Serialize};
use std::env;

// ============================================================================
// DEFAULTS
// ============================================================================

/// Default legitimate site the baseline is captured from.
pub const DEFAULT_LEGITIMATE_SITE: &str = "https://combankdigital.com";

/// Default monitoring interval (1 hour).
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Default per-check render timeout (30 seconds).
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 30_000;

/// Default perceptual tolerance for the pixel diff.
pub const DEFAULT_PIXEL_TOLERANCE: f32 = 0.1;

/// Score reported when screenshots cannot be compared (dimension mismatch).
pub const DEFAULT_VISUAL_FALLBACK_SCORE: u8 = 50;

/// Default cap on simultaneously rendering checks.
pub const DEFAULT_MAX_CONCURRENT_CHECKS: usize = 4;

fn default_brand_keywords() -> Vec<String> {
    ["combank", "commercial", "bank", "digital", "login", "account"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

// ============================================================================
// CONFIG TYPES
// ============================================================================

/// Relative weight of each similarity signal; must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub text: f64,
    pub visual: f64,
    pub dom: f64,
    pub keyword: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            text: 0.30,
            visual: 0.30,
            dom: 0.20,
            keyword: 0.20,
        }
    }
}

impl SimilarityWeights {
    pub fn sum(&self) -> f64 {
        self.text + self.visual + self.dom + self.keyword
    }
}

/// Composite-score cutoffs for threat classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThreatThresholds {
    pub high: u8,
    pub medium: u8,
}

impl Default for ThreatThresholds {
    fn default() -> Self {
        Self { high: 75, medium: 50 }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// URL the baseline snapshot is captured from.
    pub legitimate_site_url: String,
    pub weights: SimilarityWeights,
    pub thresholds: ThreatThresholds,
    /// Monitoring cycle interval in milliseconds.
    pub check_interval_ms: u64,
    /// Per-check render timeout in milliseconds.
    pub render_timeout_ms: u64,
    /// Fixed vocabulary counted by the feature extractor.
    pub brand_keywords: Vec<String>,
    /// Perceptual tolerance for the pixel diff (pixelmatch-style).
    pub visual_pixel_tolerance: f32,
    /// Score reported when raster dimensions differ.
    pub visual_fallback_score: u8,
    /// Cap on simultaneously rendering checks.
    pub max_concurrent_checks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            legitimate_site_url: DEFAULT_LEGITIMATE_SITE.to_string(),
            weights: SimilarityWeights::default(),
            thresholds: ThreatThresholds::default(),
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            render_timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
            brand_keywords: default_brand_keywords(),
            visual_pixel_tolerance: DEFAULT_PIXEL_TOLERANCE,
            visual_fallback_score: DEFAULT_VISUAL_FALLBACK_SCORE,
            max_concurrent_checks: DEFAULT_MAX_CONCURRENT_CHECKS,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            legitimate_site_url: env::var("PHISH_LEGITIMATE_SITE")
                .unwrap_or(defaults.legitimate_site_url),
            check_interval_ms: env::var("PHISH_CHECK_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.check_interval_ms),
            render_timeout_ms: env::var("PHISH_RENDER_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.render_timeout_ms),
            brand_keywords: env::var("PHISH_BRAND_KEYWORDS")
                .map(|s| {
                    s.split(',')
                        .map(|t| t.trim().to_lowercase())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.brand_keywords),
            visual_pixel_tolerance: env::var("PHISH_PIXEL_TOLERANCE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.visual_pixel_tolerance),
            max_concurrent_checks: env::var("PHISH_MAX_CONCURRENT_CHECKS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_checks),
            weights: defaults.weights,
            thresholds: defaults.thresholds,
            visual_fallback_score: defaults.visual_fallback_score,
        }
    }

    /// Reject configurations the similarity engine cannot honor.
    pub fn validate(&self) -> Result<(), String> {
        let sum = self.weights.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(format!("similarity weights must sum to 1.0, got {}", sum));
        }
        if self.thresholds.medium > self.thresholds.high {
            return Err(format!(
                "medium threshold {} exceeds high threshold {}",
                self.thresholds.medium, self.thresholds.high
            ));
        }
        if self.max_concurrent_checks == 0 {
            return Err("max_concurrent_checks must be at least 1".to_string());
        }
        Ok(())
    }
}
