//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::state::*;
use super::transition::*;
use super::*;
use crate::analysis::{IntelligenceExtraction, IntelligenceReport, ResponseStrategy, ThreatAnalysis};
use chrono::Utc;
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// Arbitrary Generators
// ============================================================================

/// Small alphabet so reports often repeat entities
fn arb_entities() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-c]{1,2}", 0..4)
}

fn arb_extraction() -> impl Strategy<Value = IntelligenceExtraction> {
    (arb_entities(), arb_entities(), arb_entities(), arb_entities(), arb_entities()).prop_map(
        |(upi_ids, bank_details, crypto_wallets, phishing_links, phone_numbers)| {
            IntelligenceExtraction {
                upi_ids,
                bank_details,
                crypto_wallets,
                phishing_links,
                phone_numbers,
            }
        },
    )
}

fn arb_report() -> impl Strategy<Value = IntelligenceReport> {
    (
        any::<bool>(),
        -0.5f64..1.5,
        "[A-Za-z]{1,10}",
        "[A-Za-z ]{1,20}",
        arb_extraction(),
    )
        .prop_map(|(scam_detected, confidence_score, category, reply, extraction)| {
            IntelligenceReport {
                analysis: ThreatAnalysis {
                    reasoning_trace: "trace".to_string(),
                    scam_detected,
                    confidence_score,
                    scam_category: category,
                },
                response_strategy: ResponseStrategy {
                    current_persona: "Persona".to_string(),
                    emotional_state: "Calm".to_string(),
                    next_action: "Delaying".to_string(),
                },
                generated_response: reply,
                intelligence_extraction: extraction,
            }
        })
}

/// Outcome of one submission
#[derive(Debug, Clone)]
enum Round {
    Report(IntelligenceReport),
    Failure,
}

fn arb_round() -> impl Strategy<Value = Round> {
    prop_oneof![
        3 => arb_report().prop_map(Round::Report),
        1 => Just(Round::Failure),
    ]
}

fn arb_submission() -> impl Strategy<Value = Submission> {
    "[a-zA-Z0-9 ]{1,30}".prop_map(|text| Submission::new(text, None).unwrap())
}

fn arb_state() -> impl Strategy<Value = TurnState> {
    prop_oneof![
        Just(TurnState::Idle),
        (0usize..10).prop_map(|ticket| TurnState::AwaitingReport { ticket }),
    ]
}

fn arb_event() -> impl Strategy<Value = SessionEvent> {
    prop_oneof![
        arb_submission().prop_map(SessionEvent::Submit),
        (0usize..10, arb_report()).prop_map(|(ticket, report)| SessionEvent::ReportArrived {
            ticket,
            report: Box::new(report),
        }),
        (0usize..10).prop_map(|ticket| SessionEvent::AnalysisFailed {
            ticket,
            kind: "gateway_error".to_string(),
            message: "failed".to_string(),
        }),
    ]
}

// ============================================================================
// Helpers
// ============================================================================

/// Submit, then resolve with `round`. Returns the ticket used.
fn run_round(session: &mut Session, submission: Submission, round: Round) -> usize {
    let changes = session
        .apply(SessionEvent::Submit(submission), Utc::now())
        .expect("idle session accepts submission");
    let ticket = changes
        .iter()
        .find_map(|c| match c {
            SessionChange::AnalysisRequested { ticket, .. } => Some(*ticket),
            _ => None,
        })
        .expect("submission requests analysis");

    let event = match round {
        Round::Report(report) => SessionEvent::ReportArrived {
            ticket,
            report: Box::new(report),
        },
        Round::Failure => SessionEvent::AnalysisFailed {
            ticket,
            kind: "malformed_report".to_string(),
            message: "bad json".to_string(),
        },
    };
    session.apply(event, Utc::now()).expect("matching ticket applies");
    ticket
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Without failures the thread strictly alternates human/model
    #[test]
    fn prop_alternation_without_failures(
        rounds in prop::collection::vec((arb_submission(), arb_report()), 1..8)
    ) {
        let mut session = Session::draft("s", Utc::now());
        for (submission, report) in rounds {
            run_round(&mut session, submission, Round::Report(report));
        }
        for (i, message) in session.messages().iter().enumerate() {
            let expected = if i % 2 == 0 { Role::ThreatActor } else { Role::AsiGemini };
            prop_assert_eq!(message.role, expected);
        }
    }

    /// Never two model turns in a row, never a model turn first
    #[test]
    fn prop_model_turn_always_answers_human_turn(
        rounds in prop::collection::vec((arb_submission(), arb_round()), 1..10)
    ) {
        let mut session = Session::draft("s", Utc::now());
        for (submission, round) in rounds {
            run_round(&mut session, submission, round);
        }
        let messages = session.messages();
        prop_assert_eq!(messages[0].role, Role::ThreatActor);
        for pair in messages.windows(2) {
            if pair[1].role == Role::AsiGemini {
                prop_assert_eq!(pair[0].role, Role::ThreatActor);
            }
        }
    }

    /// Accumulated intel only grows and never holds duplicates
    #[test]
    fn prop_intel_monotonic_and_unique(
        rounds in prop::collection::vec((arb_submission(), arb_round()), 1..10)
    ) {
        let mut session = Session::draft("s", Utc::now());
        let mut previous: Vec<String> = Vec::new();
        for (submission, round) in rounds {
            run_round(&mut session, submission, round);
            let current = session.extracted_intel().as_slice();
            prop_assert!(current.len() >= previous.len());
            prop_assert_eq!(&current[..previous.len()], previous.as_slice());
            let unique: HashSet<_> = current.iter().collect();
            prop_assert_eq!(unique.len(), current.len());
            previous = current.to_vec();
        }
    }

    /// Re-applying an identical extraction leaves the set unchanged
    #[test]
    fn prop_dedup_idempotent(submission in arb_submission(), report in arb_report()) {
        let mut session = Session::draft("s", Utc::now());
        run_round(&mut session, submission.clone(), Round::Report(report.clone()));
        let before = session.extracted_intel().clone();
        run_round(&mut session, submission, Round::Report(report));
        prop_assert_eq!(session.extracted_intel(), &before);
    }

    /// A failed round adds exactly the human turn
    #[test]
    fn prop_failure_adds_one_turn(
        setup in prop::collection::vec((arb_submission(), arb_round()), 0..5),
        submission in arb_submission(),
    ) {
        let mut session = Session::draft("s", Utc::now());
        for (s, round) in setup {
            run_round(&mut session, s, round);
        }
        let before = session.clone();
        run_round(&mut session, submission, Round::Failure);

        prop_assert_eq!(session.messages().len(), before.messages().len() + 1);
        prop_assert_eq!(session.status(), before.status());
        prop_assert_eq!(session.category(), before.category());
        prop_assert_eq!(session.extracted_intel(), before.extracted_intel());
    }

    /// Classification always mirrors the latest report
    #[test]
    fn prop_status_reflects_latest_report(
        rounds in prop::collection::vec((arb_submission(), arb_round()), 1..10)
    ) {
        let mut session = Session::draft("s", Utc::now());
        let mut last_report: Option<IntelligenceReport> = None;
        for (submission, round) in rounds {
            if let Round::Report(report) = &round {
                last_report = Some(report.clone());
            }
            run_round(&mut session, submission, round);
        }
        match last_report {
            Some(report) => {
                prop_assert_eq!(
                    session.status(),
                    SessionStatus::from_detection(report.analysis.scam_detected)
                );
                prop_assert_eq!(session.category(), report.analysis.scam_category.as_str());
                prop_assert!(
                    (session.confidence() - report.analysis.confidence_score).abs() < f64::EPSILON
                );
            }
            None => prop_assert_eq!(session.status(), SessionStatus::Analyzing),
        }
    }

    /// Results are accepted only for the outstanding ticket
    #[test]
    fn prop_only_outstanding_ticket_applies(state in arb_state(), event in arb_event()) {
        let outcome = transition(&state, &[], event.clone());
        match (&state, &event) {
            (TurnState::Idle, SessionEvent::Submit(_)) => {
                prop_assert!(outcome.is_ok());
            }
            (TurnState::AwaitingReport { .. }, SessionEvent::Submit(_)) => {
                prop_assert_eq!(outcome.unwrap_err(), TransitionError::AnalysisInFlight);
            }
            (TurnState::AwaitingReport { ticket }, SessionEvent::ReportArrived { ticket: got, .. })
            | (TurnState::AwaitingReport { ticket }, SessionEvent::AnalysisFailed { ticket: got, .. }) => {
                if ticket == got {
                    prop_assert_eq!(outcome.unwrap().new_state, TurnState::Idle);
                } else {
                    let is_stale = matches!(outcome, Err(TransitionError::StaleTicket { .. }));
                    prop_assert!(is_stale);
                }
            }
            (TurnState::Idle, _) => {
                let is_invalid = matches!(outcome, Err(TransitionError::InvalidTransition(_)));
                prop_assert!(is_invalid);
            }
        }
    }

    /// Submissions always leave the session awaiting the new turn's report
    #[test]
    fn prop_ticket_is_new_turn_index(
        setup in prop::collection::vec((arb_submission(), arb_round()), 0..5),
        submission in arb_submission(),
    ) {
        let mut session = Session::draft("s", Utc::now());
        for (s, round) in setup {
            run_round(&mut session, s, round);
        }
        let index = session.messages().len();
        session.apply(SessionEvent::Submit(submission), Utc::now()).unwrap();
        prop_assert_eq!(session.turn(), &TurnState::AwaitingReport { ticket: index });
        prop_assert_eq!(session.messages()[index].role, Role::ThreatActor);
    }
}
