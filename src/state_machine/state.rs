//! Session state types

use super::transition::{transition, TransitionError, TransitionResult};
use super::{Effect, SessionEvent};
use crate::analysis::{AnalysisRequest, InlineImage, IntelligenceReport};
use crate::intel::IntelSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Messages
// ============================================================================

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "threat_actor")]
    ThreatActor,
    #[serde(rename = "asi_gemini")]
    AsiGemini,
}

/// One turn in a session's thread. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<InlineImage>,
    pub timestamp: DateTime<Utc>,
    /// Present only on model turns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Box<IntelligenceReport>>,
}

impl Message {
    pub fn human(content: String, image: Option<InlineImage>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::ThreatActor,
            content,
            image,
            timestamp,
            metadata: None,
        }
    }

    pub fn model(report: &IntelligenceReport, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::AsiGemini,
            content: report.generated_response.clone(),
            image: None,
            timestamp,
            metadata: Some(Box::new(report.clone())),
        }
    }
}

// ============================================================================
// Session State
// ============================================================================

/// Session status as shown in the session list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No report received yet
    #[default]
    Analyzing,
    /// Last report detected an active scam
    Engaging,
    /// Last report detected no scam
    Archived,
}

impl SessionStatus {
    pub fn from_detection(scam_detected: bool) -> Self {
        if scam_detected {
            SessionStatus::Engaging
        } else {
            SessionStatus::Archived
        }
    }
}

/// Where the session is in its submit/report cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnState {
    /// Ready for a submission
    #[default]
    Idle,

    /// Human turn `ticket` is waiting for its report
    AwaitingReport { ticket: usize },
}

impl TurnState {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, TurnState::AwaitingReport { .. })
    }
}

/// Observable consequence of executing effects
#[derive(Debug, Clone)]
pub enum SessionChange {
    TurnAppended(Message),
    ReportApplied { new_entities: usize },
    AnalysisRequested { ticket: usize, request: AnalysisRequest },
    AnalysisFailed { ticket: usize, kind: String, message: String },
}

/// One investigation
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    status: SessionStatus,
    category: String,
    confidence: f64,
    persona: String,
    last_activity: DateTime<Utc>,
    messages: Vec<Message>,
    extracted_intel: IntelSet,
    turn: TurnState,
}

impl Session {
    /// Session with no turns and no report yet
    pub fn draft(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: SessionStatus::Analyzing,
            category: String::new(),
            confidence: 0.0,
            persona: String::new(),
            last_activity: now,
            messages: Vec::new(),
            extracted_intel: IntelSet::new(),
            turn: TurnState::Idle,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// Latest report's confidence, as received
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn extracted_intel(&self) -> &IntelSet {
        &self.extracted_intel
    }

    pub fn turn(&self) -> &TurnState {
        &self.turn
    }

    /// Report on the latest turn; `None` while the latest turn is human
    pub fn latest_report(&self) -> Option<&IntelligenceReport> {
        self.messages.last().and_then(|m| m.metadata.as_deref())
    }

    /// Run `event` through the transition function and execute its effects.
    /// On error nothing changes.
    pub fn apply(
        &mut self,
        event: SessionEvent,
        now: DateTime<Utc>,
    ) -> Result<Vec<SessionChange>, TransitionError> {
        let result = transition(&self.turn, &self.messages, event)?;
        Ok(self.execute(result, now))
    }

    fn execute(&mut self, result: TransitionResult, now: DateTime<Utc>) -> Vec<SessionChange> {
        self.turn = result.new_state;
        let mut changes = Vec::with_capacity(result.effects.len());

        for effect in result.effects {
            match effect {
                Effect::AppendHumanTurn { content, image } => {
                    changes.push(self.append(Message::human(content, image, now)));
                }
                Effect::RequestAnalysis { ticket, request } => {
                    changes.push(SessionChange::AnalysisRequested { ticket, request });
                }
                Effect::AppendModelTurn { report } => {
                    changes.push(self.append(Message::model(&report, now)));
                }
                Effect::ApplyReport { report } => {
                    self.status = SessionStatus::from_detection(report.analysis.scam_detected);
                    self.category.clone_from(&report.analysis.scam_category);
                    self.confidence = report.analysis.confidence_score;
                    self.persona
                        .clone_from(&report.response_strategy.current_persona);
                    self.last_activity = now;
                    let extraction = &report.intelligence_extraction;
                    let new_entities = if extraction.is_empty() {
                        0
                    } else {
                        self.extracted_intel.merge(extraction.entities())
                    };
                    changes.push(SessionChange::ReportApplied { new_entities });
                }
                Effect::ReportFailure {
                    ticket,
                    kind,
                    message,
                } => {
                    changes.push(SessionChange::AnalysisFailed {
                        ticket,
                        kind,
                        message,
                    });
                }
            }
        }

        changes
    }

    fn append(&mut self, message: Message) -> SessionChange {
        self.last_activity = message.timestamp;
        self.messages.push(message.clone());
        SessionChange::TurnAppended(message)
    }
}
