//! Effects produced by state transitions

use crate::analysis::{AnalysisRequest, InlineImage, IntelligenceReport};

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Append the operator's turn
    AppendHumanTurn {
        content: String,
        image: Option<InlineImage>,
    },

    /// Ask the analysis engine for a report
    RequestAnalysis {
        ticket: usize,
        request: AnalysisRequest,
    },

    /// Append the model's turn carrying its report
    AppendModelTurn { report: Box<IntelligenceReport> },

    /// Refresh status and classification, fold extracted entities
    ApplyReport { report: Box<IntelligenceReport> },

    /// Surface a failed analysis; no turn is appended
    ReportFailure {
        ticket: usize,
        kind: String,
        message: String,
    },
}

impl Effect {
    pub fn report_arrived(report: Box<IntelligenceReport>) -> [Self; 2] {
        [
            Effect::AppendModelTurn {
                report: report.clone(),
            },
            Effect::ApplyReport { report },
        ]
    }
}
