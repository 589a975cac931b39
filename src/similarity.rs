//! Similarity Engine - pure scoring of a target capture against the baseline.
//!
//! Four independent signals (text, pixels, DOM topology, brand keywords) are
//! each scored 0..100 and folded into a weighted composite. No I/O happens
//! here; raster problems are absorbed as fallback scores, never surfaced as
//! errors.

use crate::config::{SimilarityWeights, ThreatThresholds};
use crate::types::{Baseline, FeatureSet, Screenshot, SimilarityResult, Snapshot, ThreatLevel};
use std::collections::{HashMap, HashSet};

// ============================================================================
// ENGINE
// ============================================================================

/// Scoring configuration captured once at engine construction.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    weights: SimilarityWeights,
    thresholds: ThreatThresholds,
    /// Perceptual tolerance for the pixel diff, 0.0 = exact match required.
    pixel_tolerance: f32,
    /// Reported when raster dimensions differ and no comparison is possible.
    fallback_score: u8,
}

impl SimilarityEngine {
    pub fn new(
        weights: SimilarityWeights,
        thresholds: ThreatThresholds,
        pixel_tolerance: f32,
        fallback_score: u8,
    ) -> Self {
        Self {
            weights,
            thresholds,
            pixel_tolerance,
            fallback_score,
        }
    }

    /// Score a target capture against the baseline. Deterministic: the same
    /// inputs always produce the same result.
    pub fn score(
        &self,
        baseline: &Baseline,
        target_snapshot: &Snapshot,
        target_features: &FeatureSet,
    ) -> SimilarityResult {
        let text = text_similarity(
            &baseline.snapshot.visible_text,
            &target_snapshot.visible_text,
        );
        let visual = visual_similarity(
            &baseline.snapshot.screenshot,
            &target_snapshot.screenshot,
            self.pixel_tolerance,
            self.fallback_score,
        );
        let dom = dom_similarity(&baseline.features, target_features);
        let keyword = keyword_similarity(&baseline.features, target_features);

        let composite = composite_score(&self.weights, text, visual, dom, keyword);

        SimilarityResult {
            text_similarity: text,
            visual_similarity: visual,
            dom_similarity: dom,
            keyword_similarity: keyword,
            composite,
            threat_level: classify(composite, &self.thresholds),
        }
    }
}

/// Threat level is a pure function of the composite under the configured
/// thresholds.
pub fn classify(composite: u8, thresholds: &ThreatThresholds) -> ThreatLevel {
    if composite >= thresholds.high {
        ThreatLevel::High
    } else if composite >= thresholds.medium {
        ThreatLevel::Medium
    } else {
        ThreatLevel::Low
    }
}

fn composite_score(weights: &SimilarityWeights, text: u8, visual: u8, dom: u8, keyword: u8) -> u8 {
    let weighted = text as f64 * weights.text
        + visual as f64 * weights.visual
        + dom as f64 * weights.dom
        + keyword as f64 * weights.keyword;
    weighted.round().clamp(0.0, 100.0) as u8
}

// ============================================================================
// TEXT SIMILARITY (TF-IDF COSINE)
// ============================================================================

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn term_counts(tokens: &[String]) -> HashMap<&str, f64> {
    let mut counts: HashMap<&str, f64> = HashMap::new();
    for token in tokens {
        *counts.entry(token.as_str()).or_insert(0.0) += 1.0;
    }
    counts
}

/// TF-IDF cosine similarity over the two-document corpus, scaled to 0..100.
///
/// tf is the raw term count; idf = 1 + ln(N/df) with N = 2 and df in {1,2}.
/// The additive constant keeps shared vocabulary weighted — plain ln(N/df)
/// would zero every term both documents contain, scoring identical pages 0.
pub fn text_similarity(text_a: &str, text_b: &str) -> u8 {
    let tokens_a = tokenize(text_a);
    let tokens_b = tokenize(text_b);
    let counts_a = term_counts(&tokens_a);
    let counts_b = term_counts(&tokens_b);

    let vocabulary: HashSet<&str> = counts_a.keys().chain(counts_b.keys()).copied().collect();

    let mut dot = 0.0f64;
    let mut magnitude_a = 0.0f64;
    let mut magnitude_b = 0.0f64;

    for term in vocabulary {
        let tf_a = counts_a.get(term).copied().unwrap_or(0.0);
        let tf_b = counts_b.get(term).copied().unwrap_or(0.0);
        let df = (tf_a > 0.0) as u32 + (tf_b > 0.0) as u32;
        let idf = 1.0 + (2.0 / df as f64).ln();

        let weight_a = tf_a * idf;
        let weight_b = tf_b * idf;
        dot += weight_a * weight_b;
        magnitude_a += weight_a * weight_a;
        magnitude_b += weight_b * weight_b;
    }

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0;
    }

    let cosine = dot / (magnitude_a.sqrt() * magnitude_b.sqrt());
    (cosine * 100.0).round().clamp(0.0, 100.0) as u8
}

// ============================================================================
// VISUAL SIMILARITY (PERCEPTUAL PIXEL DIFF)
// ============================================================================

// YIQ conversion as used by the pixelmatch algorithm.
fn rgb2y(r: f32, g: f32, b: f32) -> f32 {
    r * 0.298_895_31 + g * 0.586_622_47 + b * 0.114_482_23
}
fn rgb2i(r: f32, g: f32, b: f32) -> f32 {
    r * 0.595_977_99 - g * 0.274_176_10 - b * 0.321_801_89
}
fn rgb2q(r: f32, g: f32, b: f32) -> f32 {
    r * 0.211_470_17 - g * 0.522_617_11 + b * 0.311_146_94
}

/// Squared perceptual color distance between two RGBA pixels, alpha blended
/// onto white.
fn color_delta(a: &[u8], b: &[u8]) -> f32 {
    let blend = |px: &[u8], i: usize| -> f32 {
        let alpha = px[3] as f32 / 255.0;
        255.0 + (px[i] as f32 - 255.0) * alpha
    };
    let (r1, g1, b1) = (blend(a, 0), blend(a, 1), blend(a, 2));
    let (r2, g2, b2) = (blend(b, 0), blend(b, 1), blend(b, 2));

    let dy = rgb2y(r1, g1, b1) - rgb2y(r2, g2, b2);
    let di = rgb2i(r1, g1, b1) - rgb2i(r2, g2, b2);
    let dq = rgb2q(r1, g1, b1) - rgb2q(r2, g2, b2);

    0.5053 * dy * dy + 0.299 * di * di + 0.1957 * dq * dq
}

/// Pixel-level similarity of two rasters, 0..100.
///
/// Dimension mismatch means the captures are not comparable; the configured
/// fallback signals "assume partial risk" instead of a confident 0 or 100.
/// An undecodable raster (buffer length not matching the dimensions) scores 0.
pub fn visual_similarity(
    baseline: &Screenshot,
    target: &Screenshot,
    tolerance: f32,
    fallback_score: u8,
) -> u8 {
    if baseline.width != target.width || baseline.height != target.height {
        return fallback_score;
    }
    if !baseline.is_valid() || !target.is_valid() {
        return 0;
    }
    let total = baseline.total_pixels();
    if total == 0 {
        return 0;
    }

    // 35215 is the maximum possible YIQ delta; tolerance scales it the same
    // way pixelmatch does.
    let max_delta = 35215.0 * tolerance * tolerance;

    let mut diff_count: u64 = 0;
    for (a, b) in baseline
        .pixels
        .chunks_exact(4)
        .zip(target.pixels.chunks_exact(4))
    {
        if color_delta(a, b) > max_delta {
            diff_count += 1;
        }
    }

    let similarity = (1.0 - diff_count as f64 / total as f64) * 100.0;
    similarity.round().clamp(0.0, 100.0) as u8
}

// ============================================================================
// DOM STRUCTURAL SIMILARITY
// ============================================================================

/// Average the per-metric agreement over the six structural counts.
pub fn dom_similarity(baseline: &FeatureSet, target: &FeatureSet) -> u8 {
    let base = baseline.dom_counts.as_array();
    let tgt = target.dom_counts.as_array();

    let mut total = 0.0f64;
    for (&a, &b) in base.iter().zip(tgt.iter()) {
        total += if a == 0 && b == 0 {
            100.0
        } else if a == 0 || b == 0 {
            0.0
        } else {
            let diff = a.abs_diff(b) as f64;
            let max = a.max(b) as f64;
            ((1.0 - diff / max) * 100.0).max(0.0)
        };
    }

    (total / base.len() as f64).round() as u8
}

// ============================================================================
// KEYWORD SIMILARITY
// ============================================================================

/// Fraction of the baseline's recorded brand terms that also occur in the
/// target, as a percentage. An empty baseline table scores 0 — there is
/// nothing to match against.
pub fn keyword_similarity(baseline: &FeatureSet, target: &FeatureSet) -> u8 {
    let total = baseline.brand_keywords.len();
    if total == 0 {
        return 0;
    }

    let matches = baseline
        .brand_keywords
        .iter()
        .filter(|k| target.keyword_count(&k.term) > 0)
        .count();

    ((matches as f64 / total as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DomCounts, KeywordCount};
    use chrono::Utc;

    fn screenshot(width: u32, height: u32, rgba: [u8; 4]) -> Screenshot {
        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgba);
        }
        Screenshot {
            width,
            height,
            pixels,
        }
    }

    fn snapshot(text: &str, shot: Screenshot) -> Snapshot {
        Snapshot {
            source_url: "https://example.com".into(),
            html: String::new(),
            visible_text: text.into(),
            screenshot: shot,
            captured_at: Utc::now(),
        }
    }

    fn features(keywords: &[(&str, u32)], dom: DomCounts) -> FeatureSet {
        FeatureSet {
            brand_keywords: keywords
                .iter()
                .map(|(t, c)| KeywordCount {
                    term: t.to_string(),
                    count: *c,
                })
                .collect(),
            dom_counts: dom,
            form_fields: Vec::new(),
        }
    }

    fn default_engine() -> SimilarityEngine {
        SimilarityEngine::new(
            SimilarityWeights::default(),
            ThreatThresholds::default(),
            0.1,
            50,
        )
    }

    // --- text ---

    #[test]
    fn test_identical_text_scores_100() {
        let text = "Welcome to Example Bank. Login to your account.";
        assert_eq!(text_similarity(text, text), 100);
    }

    #[test]
    fn test_disjoint_text_scores_0() {
        assert_eq!(
            text_similarity("Welcome to Example Bank", "Buy shoes online now"),
            0
        );
    }

    #[test]
    fn test_empty_text_scores_0() {
        assert_eq!(text_similarity("", ""), 0);
        assert_eq!(text_similarity("some words", ""), 0);
    }

    #[test]
    fn test_partial_overlap_scores_between() {
        let s = text_similarity(
            "secure bank login portal",
            "secure bank login portal for shoes",
        );
        assert!(s > 0 && s < 100, "got {}", s);
    }

    // --- visual ---

    #[test]
    fn test_identical_screenshots_score_100() {
        let a = screenshot(100, 100, [10, 120, 200, 255]);
        let b = a.clone();
        assert_eq!(visual_similarity(&a, &b, 0.1, 50), 100);
    }

    #[test]
    fn test_inverted_screenshots_score_0() {
        let a = screenshot(100, 100, [0, 0, 0, 255]);
        let b = screenshot(100, 100, [255, 255, 255, 255]);
        assert_eq!(visual_similarity(&a, &b, 0.1, 50), 0);
    }

    #[test]
    fn test_dimension_mismatch_uses_fallback() {
        let a = screenshot(100, 100, [0, 0, 0, 255]);
        let b = screenshot(50, 100, [0, 0, 0, 255]);
        assert_eq!(visual_similarity(&a, &b, 0.1, 50), 50);
        // Fallback applies regardless of pixel content.
        let c = screenshot(50, 100, [255, 255, 255, 255]);
        assert_eq!(visual_similarity(&a, &c, 0.1, 50), 50);
    }

    #[test]
    fn test_invalid_buffer_scores_0() {
        let a = screenshot(10, 10, [0, 0, 0, 255]);
        let mut b = a.clone();
        b.pixels.truncate(7);
        assert_eq!(visual_similarity(&a, &b, 0.1, 50), 0);
    }

    #[test]
    fn test_near_identical_within_tolerance() {
        // Anti-aliasing scale noise should not register as a diff.
        let a = screenshot(10, 10, [100, 100, 100, 255]);
        let b = screenshot(10, 10, [102, 101, 100, 255]);
        assert_eq!(visual_similarity(&a, &b, 0.1, 50), 100);
    }

    // --- dom ---

    #[test]
    fn test_all_zero_dom_counts_score_100() {
        let a = features(&[], DomCounts::default());
        let b = features(&[], DomCounts::default());
        assert_eq!(dom_similarity(&a, &b), 100);
    }

    #[test]
    fn test_one_sided_metric_contributes_0() {
        let a = features(
            &[],
            DomCounts {
                links: 10,
                ..Default::default()
            },
        );
        let b = features(&[], DomCounts::default());
        // links contributes 0, the other five metrics contribute 100.
        assert_eq!(dom_similarity(&a, &b), 83);
    }

    #[test]
    fn test_proportional_dom_agreement() {
        let a = features(
            &[],
            DomCounts {
                meta_tags: 10,
                links: 10,
                images: 10,
                forms: 10,
                inputs: 10,
                buttons: 10,
            },
        );
        let b = features(
            &[],
            DomCounts {
                meta_tags: 5,
                links: 5,
                images: 5,
                forms: 5,
                inputs: 5,
                buttons: 5,
            },
        );
        assert_eq!(dom_similarity(&a, &b), 50);
    }

    // --- keyword ---

    #[test]
    fn test_empty_baseline_vocabulary_scores_0() {
        let a = features(&[], DomCounts::default());
        let b = features(&[("bank", 5)], DomCounts::default());
        assert_eq!(keyword_similarity(&a, &b), 0);
    }

    #[test]
    fn test_keyword_overlap_fraction() {
        let a = features(&[("bank", 3), ("login", 1), ("account", 2), ("digital", 1)], DomCounts::default());
        let b = features(&[("bank", 9), ("login", 2)], DomCounts::default());
        assert_eq!(keyword_similarity(&a, &b), 50);
    }

    // --- composite / classification ---

    #[test]
    fn test_identity_scores_100_everywhere() {
        let shot = screenshot(100, 100, [40, 80, 160, 255]);
        let text = "Welcome to Example Bank. Login to your account.";
        let dom = DomCounts {
            meta_tags: 4,
            links: 12,
            images: 3,
            forms: 1,
            inputs: 2,
            buttons: 1,
        };
        let feats = features(&[("bank", 2), ("login", 1), ("account", 1)], dom);

        let baseline = Baseline {
            snapshot: snapshot(text, shot.clone()),
            features: feats.clone(),
            created_at: Utc::now(),
        };
        let target = snapshot(text, shot);

        let result = default_engine().score(&baseline, &target, &feats);
        assert_eq!(result.text_similarity, 100);
        assert_eq!(result.visual_similarity, 100);
        assert_eq!(result.dom_similarity, 100);
        assert_eq!(result.keyword_similarity, 100);
        assert_eq!(result.composite, 100);
        assert_eq!(result.threat_level, ThreatLevel::High);
    }

    #[test]
    fn test_composite_weighting() {
        // 100*0.3 + 50*0.3 + 0*0.2 + 0*0.2 = 45
        let weights = SimilarityWeights::default();
        assert_eq!(composite_score(&weights, 100, 50, 0, 0), 45);
    }

    #[test]
    fn test_threat_level_thresholds() {
        let t = ThreatThresholds::default();
        assert_eq!(classify(0, &t), ThreatLevel::Low);
        assert_eq!(classify(49, &t), ThreatLevel::Low);
        assert_eq!(classify(50, &t), ThreatLevel::Medium);
        assert_eq!(classify(74, &t), ThreatLevel::Medium);
        assert_eq!(classify(75, &t), ThreatLevel::High);
        assert_eq!(classify(100, &t), ThreatLevel::High);
    }

    #[test]
    fn test_threat_level_monotonic_in_composite() {
        let t = ThreatThresholds::default();
        let mut previous = classify(0, &t);
        for composite in 1..=100u8 {
            let level = classify(composite, &t);
            assert!(level >= previous);
            previous = level;
        }
    }

    #[test]
    fn test_all_scores_bounded() {
        // Degenerate inputs must still land in [0,100].
        let empty = features(&[], DomCounts::default());
        let shot = Screenshot {
            width: 0,
            height: 0,
            pixels: Vec::new(),
        };
        let baseline = Baseline {
            snapshot: snapshot("", shot.clone()),
            features: empty.clone(),
            created_at: Utc::now(),
        };
        let target = snapshot("", shot);

        let result = default_engine().score(&baseline, &target, &empty);
        for score in [
            result.text_similarity,
            result.visual_similarity,
            result.dom_similarity,
            result.keyword_similarity,
            result.composite,
        ] {
            assert!(score <= 100);
        }
    }
}
