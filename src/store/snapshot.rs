//! Read-only snapshots handed to the presentation layer

use crate::intel::{ConfidenceDisplay, LatestAssessment, LiveIntelView};
use crate::state_machine::{Message, Session, SessionStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of the session list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub status: SessionStatus,
    pub category: String,
    /// Latest confidence as received
    pub confidence: f64,
    pub confidence_display: ConfidenceDisplay,
    pub persona: String,
    pub last_activity: DateTime<Utc>,
    /// Size of the accumulated intel set
    pub intel_count: usize,
    pub analysis_pending: bool,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id().to_string(),
            status: session.status(),
            category: session.category().to_string(),
            confidence: session.confidence(),
            confidence_display: ConfidenceDisplay::from_score(session.confidence()),
            persona: session.persona().to_string(),
            last_activity: session.last_activity(),
            intel_count: session.extracted_intel().len(),
            analysis_pending: session.turn().is_awaiting(),
        }
    }
}

/// Full view of one session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub summary: SessionSummary,
    pub messages: Vec<Message>,
    pub extracted_intel: Vec<String>,
    pub live_intel: LiveIntelView,
    pub assessment: LatestAssessment,
}

impl From<&Session> for SessionDetail {
    fn from(session: &Session) -> Self {
        Self {
            summary: SessionSummary::from(session),
            messages: session.messages().to_vec(),
            extracted_intel: session.extracted_intel().as_slice().to_vec(),
            live_intel: LiveIntelView::from_report(session.latest_report()),
            assessment: LatestAssessment::from_report(session.latest_report()),
        }
    }
}

/// Accumulated set next to the latest report's live view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntelSnapshot {
    pub session_id: String,
    pub accumulated: Vec<String>,
    pub live: LiveIntelView,
}

impl From<&Session> for IntelSnapshot {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id().to_string(),
            accumulated: session.extracted_intel().as_slice().to_vec(),
            live: LiveIntelView::from_report(session.latest_report()),
        }
    }
}
