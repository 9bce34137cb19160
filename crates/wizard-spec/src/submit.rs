use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::spec::wizard::SubmitMethod;

/// Transport failure reported by a [`Submitter`].
#[derive(Debug, Error)]
#[error("submission to '{endpoint}' failed: {message}")]
pub struct SubmitError {
    pub endpoint: String,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SubmitError {
    pub fn new(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Sends the aggregated wizard payload somewhere. Timeouts and retries are the
/// implementation's concern.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        endpoint: &str,
        method: SubmitMethod,
        payload: &Value,
    ) -> Result<Value, SubmitError>;
}

/// What `submit_wizard` did.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The wizard is completed; carries the submitter's response (`Null` when
    /// no endpoint is configured).
    Submitted(Value),
    /// Required steps are neither completed nor skipped; carries their titles.
    Incomplete(Vec<String>),
    /// A submission is already in flight or the wizard is already completed.
    Ignored,
}
