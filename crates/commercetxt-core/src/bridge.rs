//! The bridge: renders a post-resolver [`ParseResult`] into a compact
//! AI prompt string and a readiness score, per `spec.md` §4.5.

use crate::types::{ParseResult, TrustFlag};
use serde::{Deserialize, Serialize};

/// A computed readiness assessment: a `[0, 100]` score, a letter grade,
/// and the reasons behind any deductions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessReport {
    /// Integer score in `[0, 100]`.
    pub score: u8,
    /// `"A"` for > 90, `"B"` for > 70, `"C"` otherwise.
    pub grade: &'static str,
    /// Human-readable reasons for each deduction, in the order applied.
    pub issues: Vec<String>,
}

/// Renders prompts and readiness reports from merged, validated
/// documents. Stateless aside from remembering the last score it
/// computed, exposed via [`Bridge::last_readiness_score`] for a host to
/// sample as a metric (`spec.md` §10 supplemental behavior) — the
/// bridge itself never pushes to a metrics backend.
#[derive(Debug, Default)]
pub struct Bridge {
    last_score: Option<u8>,
}

impl Bridge {
    /// A bridge with no recorded score yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the AI prompt text for `doc`, per `spec.md` §4.5.
    #[must_use]
    pub fn prompt(&self, doc: &ParseResult) -> String {
        let store = doc.field("IDENTITY", "Name").unwrap_or("Unknown Store");
        let currency = doc.field("IDENTITY", "Currency").unwrap_or("USD");
        let item = doc.field("PRODUCT", "Name").unwrap_or("Unknown Item");
        let price = doc.field("OFFER", "Price").unwrap_or("N/A");
        let availability = doc.field("OFFER", "Availability").unwrap_or("Unknown");

        let mut lines = vec![
            format!("STORE: {store}"),
            format!("CURRENCY: {currency}"),
            format!("ITEM: {item}"),
            format!("PRICE: {price}"),
            format!("AVAILABILITY: {availability}"),
        ];

        if let Some(url) = doc
            .field("OFFER", "URL")
            .or_else(|| doc.field("PRODUCT", "URL"))
        {
            lines.push(format!("BUY_LINK: {url}"));
        }

        if doc.trust_flags.contains(&TrustFlag::InventoryStale) {
            lines.push("NOTE: Inventory data may be outdated".to_string());
        }

        lines.join("\n")
    }

    /// Computes the readiness score for `doc`, per `spec.md` §4.5, and
    /// records it for [`Self::last_readiness_score`].
    pub fn readiness(&mut self, doc: &ParseResult) -> ReadinessReport {
        let mut score: i32 = 100;
        let mut issues = Vec::new();

        if doc.version.as_deref().unwrap_or("").is_empty() {
            score -= 10;
            issues.push("Missing version directive".to_string());
        }

        let missing_offer = doc.field("OFFER", "Price").is_none() || doc.field("OFFER", "Availability").is_none();
        if missing_offer {
            score -= 30;
            issues.push("Missing core offer data (Price/Availability)".to_string());
        }

        if !doc.errors.is_empty() {
            score -= 20 * i32::try_from(doc.errors.len()).unwrap_or(i32::MAX);
        }

        if doc.trust_flags.contains(&TrustFlag::InventoryStale) {
            score -= 15;
            issues.push("Stale inventory reduces reliability".to_string());
        }

        let score = score.clamp(0, 100) as u8;
        let grade = if score > 90 {
            "A"
        } else if score > 70 {
            "B"
        } else {
            "C"
        };

        self.last_score = Some(score);
        ReadinessReport { score, grade, issues }
    }

    /// The most recently computed score, if [`Self::readiness`] has run.
    #[must_use]
    pub const fn last_readiness_score(&self) -> Option<u8> {
        self.last_score
    }
}
