//! Intelligence aggregation
//!
//! Two views of extracted entities coexist on purpose:
//! - the accumulated set on each session, which only ever grows and drives
//!   the entity count, and
//! - the live view, which shows only what the most recent report found.

mod observer;

pub use observer::{IntelFlash, IntelObserver, FLASH_HOLD};

use crate::analysis::IntelligenceReport;
use serde::{Serialize, Serializer};
use std::collections::HashSet;

// ============================================================================
// Accumulated set
// ============================================================================

/// Insertion-ordered set of entity strings (exact, case-sensitive match)
#[allow(clippy::len_without_is_empty)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntelSet {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl IntelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `entities` into the set, returning how many were new
    pub fn merge<'a>(&mut self, entities: impl IntoIterator<Item = &'a str>) -> usize {
        let before = self.items.len();
        for entity in entities {
            if self.seen.insert(entity.to_string()) {
                self.items.push(entity.to_string());
            }
        }
        self.items.len() - before
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }
}

impl Serialize for IntelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

// ============================================================================
// Live view of the latest report
// ============================================================================

/// Entities from the most recent report only, grouped for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LiveIntelView {
    /// UPI IDs followed by bank details
    pub financial_coordinates: Vec<String>,
    pub crypto_wallets: Vec<String>,
    pub phishing_vectors: Vec<String>,
    pub comm_nodes: Vec<String>,
}

impl LiveIntelView {
    pub fn from_report(report: Option<&IntelligenceReport>) -> Self {
        let Some(report) = report else {
            return Self::default();
        };
        let extraction = &report.intelligence_extraction;
        Self {
            financial_coordinates: extraction
                .upi_ids
                .iter()
                .chain(&extraction.bank_details)
                .cloned()
                .collect(),
            crypto_wallets: extraction.crypto_wallets.clone(),
            phishing_vectors: extraction.phishing_links.clone(),
            comm_nodes: extraction.phone_numbers.clone(),
        }
    }
}

/// Reasoning panel contents from the most recent report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestAssessment {
    pub reasoning_trace: Option<String>,
    pub emotional_state: String,
    pub next_action: String,
}

impl LatestAssessment {
    pub fn from_report(report: Option<&IntelligenceReport>) -> Self {
        match report {
            Some(report) => Self {
                reasoning_trace: Some(report.analysis.reasoning_trace.clone()),
                emotional_state: report.response_strategy.emotional_state.clone(),
                next_action: report.response_strategy.next_action.clone(),
            },
            None => Self {
                reasoning_trace: None,
                emotional_state: "NEUTRAL".to_string(),
                next_action: "MONITOR".to_string(),
            },
        }
    }
}

// ============================================================================
// Confidence display
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    Low,
    Elevated,
    High,
}

/// Confidence clamped to [0, 100] percent for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfidenceDisplay {
    pub percent: u8,
    pub band: ConfidenceBand,
}

impl ConfidenceDisplay {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to 0..=100
    pub fn from_score(score: f64) -> Self {
        let clamped = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        let percent = (clamped * 100.0).round() as u8;
        let band = if percent > 70 {
            ConfidenceBand::High
        } else if percent > 40 {
            ConfidenceBand::Elevated
        } else {
            ConfidenceBand::Low
        };
        Self { percent, band }
    }
}
