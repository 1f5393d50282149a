//! Pure state transition function
//!
//! A session accepts one submission at a time. The submission's ticket is the
//! index its human turn will occupy, so a result can only ever be applied to
//! the analysis it answers.

use super::state::{Message, Role};
use super::{Effect, SessionEvent, TurnState};
use crate::analysis::{AnalysisRequest, HistoryTurn};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("an analysis is already in flight for this session")]
    AnalysisInFlight,
    #[error("result for ticket {got} does not answer outstanding ticket {expected}")]
    StaleTicket { expected: usize, got: usize },
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same turn state, thread and event it always produces the same
/// result, with no I/O side effects.
pub fn transition(
    state: &TurnState,
    thread: &[Message],
    event: SessionEvent,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Submissions
        // ============================================================

        // Idle + Submit -> AwaitingReport
        (TurnState::Idle, SessionEvent::Submit(submission)) => {
            let ticket = thread.len();
            let request = AnalysisRequest {
                input: submission.text().to_string(),
                image: submission.image().cloned(),
                history: build_history(thread),
            };
            Ok(TransitionResult::new(TurnState::AwaitingReport { ticket })
                .with_effect(Effect::AppendHumanTurn {
                    content: submission.display_content(),
                    image: submission.image().cloned(),
                })
                .with_effect(Effect::RequestAnalysis { ticket, request }))
        }

        (TurnState::AwaitingReport { .. }, SessionEvent::Submit(_)) => {
            Err(TransitionError::AnalysisInFlight)
        }

        // ============================================================
        // Analysis results
        // ============================================================

        // AwaitingReport + ReportArrived -> Idle
        (TurnState::AwaitingReport { ticket }, SessionEvent::ReportArrived { ticket: got, report }) => {
            check_ticket(*ticket, got)?;
            Ok(TransitionResult::new(TurnState::Idle).with_effects(Effect::report_arrived(report)))
        }

        // AwaitingReport + AnalysisFailed -> Idle, human turn stays
        (
            TurnState::AwaitingReport { ticket },
            SessionEvent::AnalysisFailed {
                ticket: got,
                kind,
                message,
            },
        ) => {
            check_ticket(*ticket, got)?;
            Ok(TransitionResult::new(TurnState::Idle).with_effect(Effect::ReportFailure {
                ticket: got,
                kind,
                message,
            }))
        }

        (TurnState::Idle, SessionEvent::ReportArrived { ticket, .. })
        | (TurnState::Idle, SessionEvent::AnalysisFailed { ticket, .. }) => {
            Err(TransitionError::InvalidTransition(format!(
                "analysis result for ticket {ticket} with no analysis outstanding"
            )))
        }
    }
}

fn check_ticket(expected: usize, got: usize) -> Result<(), TransitionError> {
    if expected == got {
        Ok(())
    } else {
        Err(TransitionError::StaleTicket { expected, got })
    }
}

/// Replay prior turns, content only
fn build_history(thread: &[Message]) -> Vec<HistoryTurn> {
    thread
        .iter()
        .map(|message| match message.role {
            Role::ThreatActor => HistoryTurn::user(message.content.clone()),
            Role::AsiGemini => HistoryTurn::model(message.content.clone()),
        })
        .collect()
}
