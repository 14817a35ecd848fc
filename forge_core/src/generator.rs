//! External workout generator seam.
//!
//! The generator is a text service: it receives a prompt and a model id and
//! returns raw text that should contain JSON. Everything after the call
//! (fence stripping, validation, budgeting) happens in the engine.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Shape of the JSON the prompt asks for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseShape {
    /// Object keyed by weekday
    Week,
    /// Array of exercise entries for one day
    Day,
}

/// One call to the generator
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub shape: ResponseShape,
}

/// Failure reported by a generator implementation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeneratorError {
    /// The requested model id is not served (retired, overloaded, unknown)
    #[error("Model '{0}' is unavailable")]
    ModelUnavailable(String),

    #[error("Generator call timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Other(String),
}

impl GeneratorError {
    /// Whether switching to the fallback model may help
    pub fn is_retriable(&self) -> bool {
        matches!(self, GeneratorError::ModelUnavailable(_) | GeneratorError::Timeout(_))
    }
}

impl From<GeneratorError> for crate::Error {
    fn from(e: GeneratorError) -> Self {
        crate::Error::Generator(e.to_string())
    }
}

/// Text generation service that produces workout plans
#[async_trait]
pub trait WorkoutGenerator: Send + Sync {
    /// Identifier for logs
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GeneratorError>;
}

/// Run a generator call with a deadline
pub async fn generate_with_timeout(
    generator: &dyn WorkoutGenerator,
    request: &GenerationRequest,
    timeout: Duration,
) -> Result<String, GeneratorError> {
    match tokio::time::timeout(timeout, generator.generate(request)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                "{} did not answer within {}s using {}",
                generator.name(),
                timeout.as_secs(),
                request.model
            );
            Err(GeneratorError::Timeout(timeout.as_secs()))
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Guarded values are only ever replaced whole, so poisoning is ignored
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Last model id that produced a usable plan, trusted for a limited time.
///
/// Shared by reference across planner calls. The lock is only held for the
/// read or write itself, never across a generator call.
#[derive(Debug)]
pub struct ModelCache {
    ttl: Duration,
    entry: Mutex<Option<(String, Instant)>>,
}

impl ModelCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// Cached model id, if it has not expired
    pub fn get(&self) -> Option<String> {
        let mut entry = lock(&self.entry);
        match entry.as_ref() {
            Some((model, stored_at)) if stored_at.elapsed() < self.ttl => Some(model.clone()),
            Some(_) => {
                *entry = None;
                None
            }
            None => None,
        }
    }

    pub fn set(&self, model: &str) {
        *lock(&self.entry) = Some((model.to_string(), Instant::now()));
    }

    pub fn invalidate(&self) {
        if lock(&self.entry).take().is_some() {
            tracing::debug!("Model cache invalidated");
        }
    }
}

/// Serves pre-recorded generator results in order.
///
/// Used by the CLI to process saved responses and by tests to script
/// failures. Requests are recorded for inspection.
#[derive(Debug, Default)]
pub struct ReplayGenerator {
    responses: Mutex<VecDeque<Result<String, GeneratorError>>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ReplayGenerator {
    pub fn new(responses: impl IntoIterator<Item = String>) -> Self {
        Self::with_results(responses.into_iter().map(Ok))
    }

    pub fn with_results(results: impl IntoIterator<Item = Result<String, GeneratorError>>) -> Self {
        Self {
            responses: Mutex::new(results.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replay a single saved response file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        tracing::debug!("Replaying generator response from {:?}", path);
        Ok(Self::new([text]))
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl WorkoutGenerator for ReplayGenerator {
    fn name(&self) -> &str {
        "replay"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GeneratorError> {
        lock(&self.requests).push(request.clone());
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Err(GeneratorError::Other("no recorded response left".into())))
    }
}
