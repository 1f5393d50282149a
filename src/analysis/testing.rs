//! Mock implementations for testing
//!
//! These mocks let the store and API be exercised without a real model.

use super::{
    AnalysisError, AnalysisGateway, AnalysisRequest, IntelligenceExtraction, IntelligenceReport,
    ReportDecodeError, ResponseStrategy, ThreatAnalysis,
};
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

// ============================================================================
// Report builder
// ============================================================================

/// Builder for canned reports
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    report: IntelligenceReport,
}

impl ReportBuilder {
    pub fn scam(category: &str, confidence: f64) -> Self {
        Self {
            report: IntelligenceReport {
                analysis: ThreatAnalysis {
                    reasoning_trace: format!("Matched {category} signature"),
                    scam_detected: true,
                    confidence_score: confidence,
                    scam_category: category.to_string(),
                },
                response_strategy: ResponseStrategy {
                    current_persona: "Elderly Victim".to_string(),
                    emotional_state: "Anxious".to_string(),
                    next_action: "Delaying".to_string(),
                },
                generated_response: "Oh dear, can you explain that again?".to_string(),
                intelligence_extraction: IntelligenceExtraction::default(),
            },
        }
    }

    pub fn benign() -> Self {
        let mut builder = Self::scam("Other", 0.05);
        builder.report.analysis.scam_detected = false;
        builder.report.analysis.reasoning_trace = "No threat signature matched".to_string();
        builder.report.response_strategy.current_persona = "Observer".to_string();
        builder
    }

    pub fn persona(mut self, persona: &str) -> Self {
        self.report.response_strategy.current_persona = persona.to_string();
        self
    }

    pub fn response(mut self, text: &str) -> Self {
        self.report.generated_response = text.to_string();
        self
    }

    pub fn upi(mut self, ids: &[&str]) -> Self {
        self.report.intelligence_extraction.upi_ids = to_strings(ids);
        self
    }

    pub fn bank(mut self, details: &[&str]) -> Self {
        self.report.intelligence_extraction.bank_details = to_strings(details);
        self
    }

    pub fn wallets(mut self, wallets: &[&str]) -> Self {
        self.report.intelligence_extraction.crypto_wallets = to_strings(wallets);
        self
    }

    pub fn links(mut self, links: &[&str]) -> Self {
        self.report.intelligence_extraction.phishing_links = to_strings(links);
        self
    }

    pub fn phones(mut self, phones: &[&str]) -> Self {
        self.report.intelligence_extraction.phone_numbers = to_strings(phones);
        self
    }

    pub fn build(self) -> IntelligenceReport {
        self.report
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

pub fn malformed_error() -> AnalysisError {
    AnalysisError::MalformedReport(ReportDecodeError::Empty)
}

pub fn gateway_error() -> AnalysisError {
    AnalysisError::Gateway(LlmError::network("connection reset"))
}

// ============================================================================
// Mock Analysis Gateway
// ============================================================================

/// Scripted outcome of one mock call
enum Scripted {
    Answer(Result<IntelligenceReport, AnalysisError>),
    Panic(&'static str),
}

/// Mock gateway that returns queued results
pub struct MockAnalysisGateway {
    results: Mutex<VecDeque<Scripted>>,
    /// Record of all requests made
    requests: Mutex<Vec<AnalysisRequest>>,
    /// When set, each call waits for a permit before answering
    gate: Option<Arc<Semaphore>>,
    /// Notified once per call as soon as it is in flight
    pub call_started: Arc<Notify>,
}

impl MockAnalysisGateway {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
            call_started: Arc::new(Notify::new()),
        }
    }

    /// Calls block until [`MockAnalysisGateway::release`] is called
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::new()
        }
    }

    pub fn queue_report(&self, report: IntelligenceReport) {
        self.results.lock().unwrap().push_back(Scripted::Answer(Ok(report)));
    }

    pub fn queue_error(&self, error: AnalysisError) {
        self.results.lock().unwrap().push_back(Scripted::Answer(Err(error)));
    }

    /// The next call panics instead of answering
    pub fn queue_panic(&self, message: &'static str) {
        self.results.lock().unwrap().push_back(Scripted::Panic(message));
    }

    /// Let one gated call complete
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn recorded_requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockAnalysisGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnalysisGateway for MockAnalysisGateway {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<IntelligenceReport, AnalysisError> {
        self.requests.lock().unwrap().push(request.clone());
        self.call_started.notify_one();
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        let next = self.results.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Answer(result)) => result,
            Some(Scripted::Panic(message)) => panic!("{message}"),
            None => Err(AnalysisError::Gateway(LlmError::network("No mock result queued"))),
        }
    }
}

// ============================================================================
// Stub LLM service
// ============================================================================

/// LLM service that answers every request with fixed text
pub struct StubLlmService {
    text: String,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl StubLlmService {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmService for StubLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(LlmResponse {
            content: vec![ContentBlock::text(self.text.clone())],
            usage: Usage::default(),
        })
    }

    fn model_id(&self) -> &str {
        "stub-model"
    }

    fn context_window(&self) -> usize {
        1_000
    }
}
