//! Feature Extractor - comparable features from a rendered page.
//!
//! Pure and deterministic: the same Snapshot always yields the same
//! FeatureSet. Malformed markup never fails extraction; whatever the parser
//! cannot make sense of simply contributes zero to the affected counts.

use scraper::{Html, Selector};

use crate::types::{DomCounts, FeatureSet, FormField, KeywordCount, Snapshot};

/// Derives a `FeatureSet` from a `Snapshot` against a fixed brand vocabulary.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    vocabulary: Vec<String>,
}

impl FeatureExtractor {
    /// Vocabulary terms are matched case-insensitively; they are stored
    /// lowercased so extraction cost stays flat per check.
    pub fn new(vocabulary: &[String]) -> Self {
        Self {
            vocabulary: vocabulary.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn extract(&self, snapshot: &Snapshot) -> FeatureSet {
        let document = Html::parse_document(&snapshot.html);
        FeatureSet {
            brand_keywords: self.extract_brand_keywords(&snapshot.visible_text),
            dom_counts: extract_dom_counts(&document),
            form_fields: extract_form_fields(&document),
        }
    }

    /// Count case-insensitive occurrences of each configured term in the
    /// visible text. Only terms that actually occur are recorded.
    fn extract_brand_keywords(&self, visible_text: &str) -> Vec<KeywordCount> {
        let lowered = visible_text.to_lowercase();
        let mut keywords = Vec::new();
        for term in &self.vocabulary {
            let count = lowered.matches(term.as_str()).count() as u32;
            if count > 0 {
                keywords.push(KeywordCount {
                    term: term.clone(),
                    count,
                });
            }
        }
        keywords
    }
}

fn count_selector(document: &Html, selector: &str) -> u32 {
    match Selector::parse(selector) {
        Ok(sel) => document.select(&sel).count() as u32,
        Err(_) => 0,
    }
}

fn extract_dom_counts(document: &Html) -> DomCounts {
    DomCounts {
        meta_tags: count_selector(document, "meta"),
        links: count_selector(document, "a"),
        images: count_selector(document, "img"),
        forms: count_selector(document, "form"),
        inputs: count_selector(document, "input"),
        buttons: count_selector(document, "button"),
    }
}

/// Every input belonging to a form, flattened in document order. The field
/// name falls back to the element id when no name attribute is present.
fn extract_form_fields(document: &Html) -> Vec<FormField> {
    let form_selector = match Selector::parse("form") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let input_selector = match Selector::parse("input") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let mut fields = Vec::new();
    for form in document.select(&form_selector) {
        for input in form.select(&input_selector) {
            let value = input.value();
            fields.push(FormField {
                field_type: value.attr("type").unwrap_or("text").to_string(),
                name: value
                    .attr("name")
                    .or_else(|| value.attr("id"))
                    .unwrap_or("")
                    .to_string(),
                placeholder: value.attr("placeholder").unwrap_or("").to_string(),
            });
        }
    }
    fields
}
