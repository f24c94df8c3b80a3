//! Summarization gateway.
//!
//! Bridges recent telemetry and an operator question to the completion
//! provider. Stateless per call: gather the window, build the prompt, ask,
//! return the answer or a typed failure.

use chrono::Duration;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use vigil_common::llm_client::{CompletionClient, CompletionError};
use vigil_common::record::Collection;

use crate::prompts;
use crate::repository::{RepoError, TelemetryRepository};

/// Default lookback window for the telemetry context.
pub const DEFAULT_LOOKBACK_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum AnswerError {
    /// The completion provider failed; carries its diagnostic.
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider did not answer within the configured budget.
    #[error("provider timed out after {0} seconds")]
    Timeout(u64),

    /// Gathering the telemetry context failed.
    #[error(transparent)]
    Repository(#[from] RepoError),
}

/// Answers operator questions over the trailing telemetry window.
pub struct Answerer {
    repository: TelemetryRepository,
    client: Arc<dyn CompletionClient>,
    lookback_secs: u64,
}

impl Answerer {
    pub fn new(
        repository: TelemetryRepository,
        client: Arc<dyn CompletionClient>,
        lookback_secs: u64,
    ) -> Self {
        Self {
            repository,
            client,
            lookback_secs,
        }
    }

    /// Answer an operator question from the last `lookback_secs` of
    /// telemetry.
    pub async fn answer(&self, question: &str) -> Result<String, AnswerError> {
        let window = Duration::seconds(self.lookback_secs as i64);

        let metrics = self.repository.find_since(Collection::SystemMetrics, window)?;
        let logs = self.repository.find_since(Collection::Logs, window)?;
        let processes = self
            .repository
            .find_since(Collection::ProcessesSnapshots, window)?;

        info!(
            "Answering with {} metrics, {} logs, {} snapshots in context",
            metrics.len(),
            logs.len(),
            processes.len()
        );

        let system_prompt = prompts::supervisor_preamble(self.lookback_secs);
        let user_prompt = prompts::build_context_prompt(&metrics, &logs, &processes, question);

        match self.client.complete(&system_prompt, &user_prompt).await {
            Ok(answer) => Ok(answer),
            Err(CompletionError::Timeout(secs)) => {
                warn!("Completion provider timed out after {}s", secs);
                Err(AnswerError::Timeout(secs))
            }
            Err(e) => {
                warn!("Completion provider failed: {}", e);
                Err(AnswerError::Provider(e.to_string()))
            }
        }
    }
}
