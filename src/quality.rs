//! Heuristic content analysis for fetched procurement pages.
//!
//! Extracts the fields a procurement record is expected to carry
//! (solicitation identifiers, deadlines, contacts, dollar amounts) from the
//! page text and scores how complete the page is. The completeness score is
//! a weighted fraction of expected fields present, and the quality tier is
//! a coarse bucket over that score.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::FetchResult;

/// At most this many matches are kept per field.
const MAX_FIELD_MATCHES: usize = 5;

static SOLICITATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:RFP|RFQ|IFB|ITB|BID|SOL(?:ICITATION)?)[-\s#:.]*\d[\d\w-]*")
        .expect("Failed to compile solicitation regex")
});
static DEADLINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:due|deadline|closing|closes?|submitt?als?)\b[^.\n]{0,80}?(?:\d{1,2}[/-]\d{1,2}[/-]\d{2,4}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2},?\s+\d{4})",
    )
    .expect("Failed to compile deadline regex")
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
        .expect("Failed to compile email regex")
});
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}").expect("Failed to compile phone regex")
});
static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\s?\d[\d,]*(?:\.\d{2})?").expect("Failed to compile money regex")
});

/// Coarse quality tier for a scraped record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    High,
    Medium,
    Low,
}

impl DataQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataQuality::High => "high",
            DataQuality::Medium => "medium",
            DataQuality::Low => "low",
        }
    }

    /// Buckets a completeness score into a tier.
    pub fn from_score(score: f64) -> Self {
        if score >= 0.75 {
            DataQuality::High
        } else if score >= 0.4 {
            DataQuality::Medium
        } else {
            DataQuality::Low
        }
    }
}

/// Fields pulled out of the page text.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractedFields {
    pub solicitation_ids: Vec<String>,
    pub deadlines: Vec<String>,
    pub contact_emails: Vec<String>,
    pub contact_phones: Vec<String>,
    pub dollar_amounts: Vec<String>,
}

/// Result of analyzing one fetched page.
#[derive(Debug, Clone, Serialize)]
pub struct ContentAnalysis {
    pub fields: ExtractedFields,
    /// Weighted fraction of expected fields present, in [0, 1].
    pub completeness: f64,
    pub data_quality: DataQuality,
}

fn collect_matches(re: &Regex, text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in re.find_iter(text) {
        let value = m.as_str().trim().to_string();
        if !out.contains(&value) {
            out.push(value);
        }
        if out.len() >= MAX_FIELD_MATCHES {
            break;
        }
    }
    out
}

/// Analyzes a fetched page's text and title.
///
/// Field weights: a page with a title, a solicitation id, and a deadline
/// already scores 0.65; contacts and amounts round it out. The weights sum
/// to 1.0, so the score needs no normalization.
pub fn analyze(result: &FetchResult) -> ContentAnalysis {
    let text = &result.extracted_text;

    let fields = ExtractedFields {
        solicitation_ids: collect_matches(&SOLICITATION_RE, text),
        deadlines: collect_matches(&DEADLINE_RE, text),
        contact_emails: collect_matches(&EMAIL_RE, text),
        contact_phones: collect_matches(&PHONE_RE, text),
        dollar_amounts: collect_matches(&MONEY_RE, text),
    };

    let mut score: f64 = 0.0;
    if result.title.as_deref().is_some_and(|t| !t.is_empty()) {
        score += 0.15;
    }
    if !fields.solicitation_ids.is_empty() {
        score += 0.25;
    }
    if !fields.deadlines.is_empty() {
        score += 0.25;
    }
    if !fields.contact_emails.is_empty() || !fields.contact_phones.is_empty() {
        score += 0.20;
    }
    if !fields.dollar_amounts.is_empty() {
        score += 0.15;
    }
    let completeness = score.clamp(0.0, 1.0);

    ContentAnalysis {
        fields,
        completeness,
        data_quality: DataQuality::from_score(completeness),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchMetadata, ScrapingMethod};

    fn result_with(text: &str, title: Option<&str>) -> FetchResult {
        FetchResult {
            url: "https://example.gov/bids/1".to_string(),
            final_url: "https://example.gov/bids/1".to_string(),
            status_code: Some(200),
            content_type: Some("text/html".to_string()),
            html: String::new(),
            extracted_text: text.to_string(),
            title: title.map(String::from),
            method: ScrapingMethod::HttpFetch,
            duration_ms: 10,
            success: true,
            error: None,
            metadata: FetchMetadata::empty(),
        }
    }

    #[test]
    fn test_rich_detail_page_scores_high() {
        let text = "RFP 24-017 Janitorial Services. Proposals due May 4, 2026. \
                    Contact purchasing@example.gov or (210) 555-0100. \
                    Estimated value $250,000.00.";
        let analysis = analyze(&result_with(text, Some("RFP 24-017")));

        assert_eq!(analysis.fields.solicitation_ids, vec!["RFP 24-017"]);
        assert_eq!(analysis.fields.contact_emails, vec!["purchasing@example.gov"]);
        assert!(!analysis.fields.deadlines.is_empty());
        assert_eq!(analysis.fields.dollar_amounts, vec!["$250,000.00"]);
        assert!(analysis.completeness >= 0.75, "{}", analysis.completeness);
        assert_eq!(analysis.data_quality, DataQuality::High);
    }

    #[test]
    fn test_sparse_page_scores_low() {
        let analysis = analyze(&result_with("Welcome to the city portal.", None));
        assert_eq!(analysis.completeness, 0.0);
        assert_eq!(analysis.data_quality, DataQuality::Low);
    }

    #[test]
    fn test_partial_page_scores_medium() {
        // Title + solicitation id: 0.40
        let analysis = analyze(&result_with(
            "Bid #4471 street resurfacing project overview",
            Some("Current Bids"),
        ));
        assert_eq!(analysis.data_quality, DataQuality::Medium);
    }

    #[test]
    fn test_quality_tier_thresholds() {
        assert_eq!(DataQuality::from_score(0.75), DataQuality::High);
        assert_eq!(DataQuality::from_score(0.74), DataQuality::Medium);
        assert_eq!(DataQuality::from_score(0.4), DataQuality::Medium);
        assert_eq!(DataQuality::from_score(0.39), DataQuality::Low);
    }

    #[test]
    fn test_duplicate_matches_collapsed() {
        let text = "RFP 24-017 ... RFP 24-017 ... RFP 24-017";
        let analysis = analyze(&result_with(text, None));
        assert_eq!(analysis.fields.solicitation_ids.len(), 1);
    }
}
