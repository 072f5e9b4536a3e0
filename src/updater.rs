use crate::error::Result;
use crate::schema::DocumentFormat;
use crate::store::{FeedbackRepository, PromptStore};
use crate::{PromptSynthesizer, SynthesisReport};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Retry schedule for store I/O. The synthesis step itself is never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32 << (attempt.saturating_sub(1)).min(16) as u32;
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Runs `op` until it succeeds, fails with a non-transient error, or
    /// the attempts are used up.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {:?}",
                        what, attempt, max_attempts, e, delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Registry of per-document locks. Clones share the same registry, so
/// every updater built from one registry serializes on the same target.
#[derive(Debug, Clone, Default)]
pub struct DocumentLocks {
    locks: Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>,
}

static GLOBAL_LOCKS: OnceLock<DocumentLocks> = OnceLock::new();

impl DocumentLocks {
    /// A fresh registry that shares nothing with the process-wide one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by updaters unless they are given
    /// their own.
    pub fn global() -> Self {
        GLOBAL_LOCKS.get_or_init(DocumentLocks::new).clone()
    }

    pub fn lock_for(&self, target: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(target.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The new prompt was written to the store
    Written(SynthesisReport),
    /// The synthesized prompt equals the stored one; nothing was written
    Unchanged(SynthesisReport),
}

impl UpdateOutcome {
    pub fn report(&self) -> &SynthesisReport {
        match self {
            UpdateOutcome::Written(report) | UpdateOutcome::Unchanged(report) => report,
        }
    }

    pub fn was_written(&self) -> bool {
        matches!(self, UpdateOutcome::Written(_))
    }
}

/// Reads the live prompt and the negative feedback, synthesizes the new
/// prompt and writes it back at most once.
pub struct PromptUpdater<S, R> {
    store: S,
    feedback: R,
    format: DocumentFormat,
    retry: RetryPolicy,
    locks: DocumentLocks,
}

impl<S: PromptStore, R: FeedbackRepository> PromptUpdater<S, R> {
    pub fn new(store: S, feedback: R) -> Self {
        Self {
            store,
            feedback,
            format: DocumentFormat::default(),
            retry: RetryPolicy::default(),
            locks: DocumentLocks::global(),
        }
    }

    pub fn with_format(mut self, format: DocumentFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the process-wide lock registry, e.g. with
    /// `DocumentLocks::new()` to isolate this updater.
    pub fn with_locks(mut self, locks: DocumentLocks) -> Self {
        self.locks = locks;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn feedback(&self) -> &R {
        &self.feedback
    }

    pub async fn update_prompt(&self) -> Result<UpdateOutcome> {
        let target = self.store.target();
        let lock = self.locks.lock_for(&target);
        let _guard = lock.lock().await;
        debug!("Acquired update lock for '{}'", target);

        let current = self.retry.run("Fetching prompt", || self.store.get()).await?;
        let records = self
            .retry
            .run("Fetching feedback", || self.feedback.list_negative_feedback())
            .await?;
        info!(
            "Updating prompt '{}' from {} negative feedback records",
            target,
            records.len()
        );

        let synthesis =
            PromptSynthesizer::new(&self.format).synthesize_with_report(&current, &records)?;

        if synthesis.text == current {
            info!("Prompt '{}' already up to date; skipping write", target);
            return Ok(UpdateOutcome::Unchanged(synthesis.report));
        }

        let text = synthesis.text.as_str();
        self.retry
            .run("Saving prompt", || self.store.set(text))
            .await?;
        info!(
            "Prompt '{}' updated ({} -> {} bytes)",
            target,
            current.len(),
            synthesis.text.len()
        );

        Ok(UpdateOutcome::Written(synthesis.report))
    }
}
