//! Data model shared across the detection engine.
//!
//! Snapshots, feature sets, similarity results and check records are
//! immutable once created; a check never mutates what it captured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Fixed-size raster screenshot, RGBA8 row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Screenshot {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Screenshot {
    pub fn total_pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// A raster is usable only when the buffer matches its dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() as u64 == self.total_pixels() * 4
    }
}

/// One captured page: raw markup, visible text and a screenshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub source_url: String,
    pub html: String,
    pub visible_text: String,
    pub screenshot: Screenshot,
    pub captured_at: DateTime<Utc>,
}

// ============================================================================
// FEATURES
// ============================================================================

/// Occurrence count for one configured brand term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub term: String,
    pub count: u32,
}

/// Counts of the six structural element kinds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomCounts {
    pub meta_tags: u32,
    pub links: u32,
    pub images: u32,
    pub forms: u32,
    pub inputs: u32,
    pub buttons: u32,
}

impl DomCounts {
    /// The six metrics in a fixed order, for pairwise comparison.
    pub fn as_array(&self) -> [u32; 6] {
        [
            self.meta_tags,
            self.links,
            self.images,
            self.forms,
            self.inputs,
            self.buttons,
        ]
    }
}

/// One input field found inside a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub field_type: String,
    pub name: String,
    pub placeholder: String,
}

/// Comparable features derived deterministically from a Snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    pub brand_keywords: Vec<KeywordCount>,
    pub dom_counts: DomCounts,
    pub form_fields: Vec<FormField>,
}

impl FeatureSet {
    /// Count recorded for a term, zero when absent.
    pub fn keyword_count(&self, term: &str) -> u32 {
        self.brand_keywords
            .iter()
            .find(|k| k.term == term)
            .map(|k| k.count)
            .unwrap_or(0)
    }
}

// ============================================================================
// BASELINE
// ============================================================================

/// The trusted reference capture of the legitimate site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baseline {
    pub snapshot: Snapshot,
    pub features: FeatureSet,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// SIMILARITY RESULT
// ============================================================================

/// Categorical classification derived from the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreatLevel::Low => write!(f, "low"),
            ThreatLevel::Medium => write!(f, "medium"),
            ThreatLevel::High => write!(f, "high"),
        }
    }
}

/// Four sub-scores plus the weighted composite, all integers in [0,100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityResult {
    pub text_similarity: u8,
    pub visual_similarity: u8,
    pub dom_similarity: u8,
    pub keyword_similarity: u8,
    pub composite: u8,
    pub threat_level: ThreatLevel,
}

// ============================================================================
// CHECK RECORDS
// ============================================================================

/// The unit appended to check history; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRecord {
    pub domain: String,
    pub result: SimilarityResult,
    /// Opaque artifact name resolvable by the external static-file layer.
    pub screenshot_ref: String,
    pub checked_at: DateTime<Utc>,
}

/// Current state of one watched domain, updated in place per check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchedDomain {
    pub domain: String,
    pub current_similarity: u8,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub current_screenshot_ref: Option<String>,
}

impl WatchedDomain {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            current_similarity: 0,
            last_checked_at: None,
            current_screenshot_ref: None,
        }
    }
}

// ============================================================================
// MONITORING
// ============================================================================

/// Reported by the scheduler's status operation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MonitoringStatus {
    pub running: bool,
    pub baseline_loaded: bool,
}
