//! Session store
//!
//! Owns every session and the single active selection. All mutations go
//! through each session's state machine under one write lock, and every
//! change is broadcast so presentation consumers can re-render.

mod snapshot;

pub use snapshot::{IntelSnapshot, SessionDetail, SessionSummary};

use crate::analysis::{AnalysisError, AnalysisGateway, AnalysisRequest, IntelligenceReport};
use crate::state_machine::{
    Message, Session, SessionChange, SessionEvent, Submission, TransitionError,
};
use chrono::Utc;
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

const EVENT_CAPACITY: usize = 128;

/// Failure kind reported when the analysis call itself panicked
const TASK_FAILED_KIND: &str = "task_failed";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session not found: {0}")]
    SessionNotFound(String),
    #[error("an analysis is already in flight for this session")]
    Busy,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("session state rejected the result: {0}")]
    Transition(TransitionError),
    #[error("analysis task failed: {0}")]
    TaskFailed(String),
}

impl From<TransitionError> for StoreError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AnalysisInFlight => StoreError::Busy,
            other => StoreError::Transition(other),
        }
    }
}

/// Change notification for presentation consumers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    SessionCreated {
        session: SessionSummary,
    },
    TurnAppended {
        session_id: String,
        message: Message,
    },
    SessionUpdated {
        session: SessionSummary,
        new_entities: usize,
    },
    ActiveChanged {
        session_id: Option<String>,
    },
    /// `session_id` is `None` when a new session failed to start
    AnalysisFailed {
        session_id: Option<String>,
        kind: String,
        message: String,
    },
}

impl StoreEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            StoreEvent::SessionCreated { .. } => "session_created",
            StoreEvent::TurnAppended { .. } => "turn_appended",
            StoreEvent::SessionUpdated { .. } => "session_updated",
            StoreEvent::ActiveChanged { .. } => "active_changed",
            StoreEvent::AnalysisFailed { .. } => "analysis_failed",
        }
    }

    /// Whether the active session's intel count may have moved
    pub fn touches_intel(&self) -> bool {
        matches!(
            self,
            StoreEvent::SessionCreated { .. }
                | StoreEvent::SessionUpdated { .. }
                | StoreEvent::ActiveChanged { .. }
        )
    }
}

#[derive(Default)]
struct StoreState {
    /// Newest first
    sessions: VecDeque<Session>,
    active: Option<String>,
}

impl StoreState {
    fn find(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }
}

struct Shared {
    state: RwLock<StoreState>,
    gateway: Arc<dyn AnalysisGateway>,
    events: broadcast::Sender<StoreEvent>,
}

/// Cheap to clone; clones share the same sessions
#[derive(Clone)]
pub struct SessionStore {
    shared: Arc<Shared>,
}

impl SessionStore {
    pub fn new(gateway: Arc<dyn AnalysisGateway>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(StoreState::default()),
                gateway,
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.shared.events.subscribe()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Analyze first contact and, on success, insert the new session at the
    /// front and make it active. On failure no session exists.
    pub async fn create_session(&self, submission: Submission) -> Result<SessionDetail, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut draft = Session::draft(id, Utc::now());
        let changes = draft.apply(SessionEvent::Submit(submission), Utc::now())?;
        let (ticket, request) = requested_analysis(changes)?;

        // Runs to completion even if the caller goes away
        let store = self.clone();
        tokio::spawn(async move { store.finish_create(draft, ticket, request).await })
            .await
            .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }

    async fn finish_create(
        &self,
        mut draft: Session,
        ticket: usize,
        request: AnalysisRequest,
    ) -> Result<SessionDetail, StoreError> {
        let started = Instant::now();
        let outcome = match self.run_analysis(&request).await {
            Ok(outcome) => outcome,
            Err(panic) => {
                tracing::error!(
                    error = %panic,
                    duration_ms = %started.elapsed().as_millis(),
                    "Analysis task panicked, no session created"
                );
                let _ = self.shared.events.send(StoreEvent::AnalysisFailed {
                    session_id: None,
                    kind: TASK_FAILED_KIND.to_string(),
                    message: panic.clone(),
                });
                return Err(StoreError::TaskFailed(panic));
            }
        };
        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!(
                    kind = e.kind(),
                    error = %e,
                    duration_ms = %started.elapsed().as_millis(),
                    "Analysis failed, no session created"
                );
                let _ = self.shared.events.send(StoreEvent::AnalysisFailed {
                    session_id: None,
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let event = SessionEvent::ReportArrived {
            ticket,
            report: Box::new(report),
        };
        draft.apply(event, Utc::now())?;

        let detail = SessionDetail::from(&draft);
        let id = draft.id().to_string();
        tracing::info!(
            session_id = %id,
            status = ?draft.status(),
            intel_count = draft.extracted_intel().len(),
            duration_ms = %started.elapsed().as_millis(),
            "Session created"
        );

        let mut state = self.shared.state.write().await;
        state.sessions.push_front(draft);
        state.active = Some(id.clone());
        let _ = self.shared.events.send(StoreEvent::SessionCreated {
            session: detail.summary.clone(),
        });
        let _ = self.shared.events.send(StoreEvent::ActiveChanged {
            session_id: Some(id),
        });

        Ok(detail)
    }

    /// Append the human turn now, then analyze it against the session's
    /// history. The human turn stays even if analysis fails.
    pub async fn reply_in_session(
        &self,
        session_id: &str,
        submission: Submission,
    ) -> Result<SessionDetail, StoreError> {
        let (ticket, request) = {
            let mut state = self.shared.state.write().await;
            let session = state
                .find_mut(session_id)
                .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))?;
            let changes = session.apply(SessionEvent::Submit(submission), Utc::now())?;
            let requested = self.publish(session, changes);
            requested.ok_or_else(|| {
                StoreError::Transition(TransitionError::InvalidTransition(
                    "submission did not request analysis".to_string(),
                ))
            })?
        };

        tracing::debug!(session_id, ticket, "Reply appended, analysis requested");

        let store = self.clone();
        let id = session_id.to_string();
        tokio::spawn(async move { store.finish_reply(id, ticket, request).await })
            .await
            .map_err(|e| StoreError::TaskFailed(e.to_string()))?
    }

    async fn finish_reply(
        &self,
        session_id: String,
        ticket: usize,
        request: AnalysisRequest,
    ) -> Result<SessionDetail, StoreError> {
        let started = Instant::now();
        let outcome = self.run_analysis(&request).await;

        let mut state = self.shared.state.write().await;
        let session = state
            .find_mut(&session_id)
            .ok_or_else(|| StoreError::SessionNotFound(session_id.clone()))?;

        let (kind, message, error) = match outcome {
            Ok(Ok(report)) => {
                let event = SessionEvent::ReportArrived {
                    ticket,
                    report: Box::new(report),
                };
                let changes = session.apply(event, Utc::now())?;
                self.publish(session, changes);
                tracing::info!(
                    session_id = %session_id,
                    ticket,
                    intel_count = session.extracted_intel().len(),
                    duration_ms = %started.elapsed().as_millis(),
                    "Reply analyzed"
                );
                return Ok(SessionDetail::from(&*session));
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    session_id = %session_id,
                    ticket,
                    kind = e.kind(),
                    error = %e,
                    duration_ms = %started.elapsed().as_millis(),
                    "Reply analysis failed, human turn kept"
                );
                (e.kind().to_string(), e.to_string(), StoreError::from(e))
            }
            Err(panic) => {
                tracing::error!(
                    session_id = %session_id,
                    ticket,
                    error = %panic,
                    duration_ms = %started.elapsed().as_millis(),
                    "Reply analysis panicked, human turn kept"
                );
                (
                    TASK_FAILED_KIND.to_string(),
                    panic.clone(),
                    StoreError::TaskFailed(panic),
                )
            }
        };

        // Back to idle so the operator can resubmit
        let event = SessionEvent::AnalysisFailed {
            ticket,
            kind,
            message,
        };
        let changes = session.apply(event, Utc::now())?;
        self.publish(session, changes);
        Err(error)
    }

    /// Call the gateway, turning a panic into an error message
    async fn run_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<Result<IntelligenceReport, AnalysisError>, String> {
        AssertUnwindSafe(self.shared.gateway.analyze(request))
            .catch_unwind()
            .await
            .map_err(|payload| panic_message(payload.as_ref()))
    }

    /// Point the active selection at `session_id`, or clear it
    pub async fn select_session(&self, session_id: Option<String>) -> Result<(), StoreError> {
        let mut state = self.shared.state.write().await;
        if let Some(id) = &session_id {
            if state.find(id).is_none() {
                return Err(StoreError::SessionNotFound(id.clone()));
            }
        }
        if state.active != session_id {
            state.active.clone_from(&session_id);
            let _ = self.shared.events.send(StoreEvent::ActiveChanged { session_id });
        }
        Ok(())
    }

    /// Broadcast `changes`, returning the analysis they request, if any
    fn publish(
        &self,
        session: &Session,
        changes: Vec<SessionChange>,
    ) -> Option<(usize, AnalysisRequest)> {
        let mut requested = None;
        let mut updated = false;
        let mut new_entities = 0;

        for change in changes {
            match change {
                SessionChange::TurnAppended(message) => {
                    updated = true;
                    let _ = self.shared.events.send(StoreEvent::TurnAppended {
                        session_id: session.id().to_string(),
                        message,
                    });
                }
                SessionChange::ReportApplied { new_entities: n } => {
                    updated = true;
                    new_entities += n;
                }
                SessionChange::AnalysisRequested { ticket, request } => {
                    requested = Some((ticket, request));
                }
                SessionChange::AnalysisFailed {
                    ticket,
                    kind,
                    message,
                } => {
                    updated = true;
                    tracing::debug!(session_id = %session.id(), ticket, %kind, "Analysis failure recorded");
                    let _ = self.shared.events.send(StoreEvent::AnalysisFailed {
                        session_id: Some(session.id().to_string()),
                        kind,
                        message,
                    });
                }
            }
        }

        if updated {
            let _ = self.shared.events.send(StoreEvent::SessionUpdated {
                session: SessionSummary::from(session),
                new_entities,
            });
        }
        requested
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Newest first
    pub async fn list(&self) -> Vec<SessionSummary> {
        let state = self.shared.state.read().await;
        state.sessions.iter().map(SessionSummary::from).collect()
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionDetail> {
        let state = self.shared.state.read().await;
        state.find(session_id).map(SessionDetail::from)
    }

    pub async fn intel(&self, session_id: &str) -> Option<IntelSnapshot> {
        let state = self.shared.state.read().await;
        state.find(session_id).map(IntelSnapshot::from)
    }

    pub async fn active(&self) -> Option<String> {
        self.shared.state.read().await.active.clone()
    }

    /// Active session id with its accumulated intel count
    pub async fn active_intel_count(&self) -> Option<(String, usize)> {
        let state = self.shared.state.read().await;
        let id = state.active.as_deref()?;
        state
            .find(id)
            .map(|s| (id.to_string(), s.extracted_intel().len()))
    }

    pub async fn session_count(&self) -> usize {
        self.shared.state.read().await.sessions.len()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail: &str = if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    };
    format!("analysis panicked: {detail}")
}

fn requested_analysis(changes: Vec<SessionChange>) -> Result<(usize, AnalysisRequest), StoreError> {
    changes
        .into_iter()
        .find_map(|change| match change {
            SessionChange::AnalysisRequested { ticket, request } => Some((ticket, request)),
            _ => None,
        })
        .ok_or_else(|| {
            StoreError::Transition(TransitionError::InvalidTransition(
                "submission did not request analysis".to_string(),
            ))
        })
}
