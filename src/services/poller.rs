//! Fitting job status polling.
//!
//! [`poll_until_terminal`] asks a [`JobStatusSource`] for a job's status at a
//! fixed interval until the job reports completed, failed or timeout, or the
//! attempt budget runs out. Every wait observes a [`CancellationToken`] so a
//! superseded poll can be abandoned.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::models::job::FittingJob;
use crate::services::api::ApiError;

/// Anything that can report a fitting job's current status.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn job_status(&self, job_id: i64) -> Result<FittingJob, ApiError>;
}

/// Polling schedule.
#[derive(Debug, Clone)]
pub struct PollOptions {
    /// Delay between status requests.
    pub interval: Duration,
    /// Status requests allowed before giving up. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Retries per attempt for transient transport errors.
    pub transient_retries: u32,
    /// Upper bound on the delay between transient retries.
    pub retry_max_delay: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: 60,
            transient_retries: 0,
            retry_max_delay: Duration::from_secs(30),
        }
    }
}

impl From<&ClientConfig> for PollOptions {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.poll_max_attempts,
            transient_retries: config.transient_retries,
            ..Default::default()
        }
    }
}

/// Double `current`, clamped to `max`.
pub fn next_delay(current: Duration, max: Duration) -> Duration {
    let next_ms = current.as_millis().saturating_mul(2);
    Duration::from_millis(u64::try_from(next_ms).unwrap_or(u64::MAX)).min(max)
}

/// Poll until the job is terminal.
///
/// Returns the terminal job (completed, failed or timeout) as soon as it is
/// observed. `on_progress` sees every job snapshot, terminal or not.
pub async fn poll_until_terminal<S>(
    source: &S,
    job_id: i64,
    options: &PollOptions,
    cancel: &CancellationToken,
    mut on_progress: impl FnMut(&FittingJob) + Send,
) -> Result<FittingJob, PollError>
where
    S: JobStatusSource + ?Sized,
{
    if job_id <= 0 {
        return Err(PollError::InvalidJobId(job_id));
    }

    let max_attempts = options.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let job = fetch_with_retry(source, job_id, options, cancel).await?;
        metrics::counter!("fitting_polls_total").increment(1);
        on_progress(&job);

        if job.status.is_terminal() {
            tracing::info!(job_id, attempt, status = ?job.status, "Fitting job reached terminal status");
            return Ok(job);
        }

        tracing::debug!(job_id, attempt, max_attempts, "Fitting job still processing");

        if attempt < max_attempts {
            tokio::select! {
                _ = cancel.cancelled() => return Err(PollError::Cancelled { job_id }),
                _ = tokio::time::sleep(options.interval) => {}
            }
        }
    }

    tracing::warn!(job_id, attempts = max_attempts, "Polling budget exhausted");
    Err(PollError::Exhausted {
        job_id,
        attempts: max_attempts,
    })
}

async fn fetch_with_retry<S>(
    source: &S,
    job_id: i64,
    options: &PollOptions,
    cancel: &CancellationToken,
) -> Result<FittingJob, PollError>
where
    S: JobStatusSource + ?Sized,
{
    let mut delay = options.interval;
    let mut retries = 0u32;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(PollError::Cancelled { job_id }),
            result = source.job_status(job_id) => result,
        };

        match result {
            Ok(job) => return Ok(job),
            Err(e) if e.is_transient() && retries < options.transient_retries => {
                retries += 1;
                tracing::warn!(
                    job_id,
                    retry = retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient error while polling, retrying",
                );
                tokio::select! {
                    _ = cancel.cancelled() => return Err(PollError::Cancelled { job_id }),
                    _ = tokio::time::sleep(delay) => {}
                }
                delay = next_delay(delay, options.retry_max_delay);
            }
            Err(e) => return Err(PollError::Api(e)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("Invalid fitting job id: {0}")]
    InvalidJobId(i64),

    #[error("Fitting job {job_id} still processing after {attempts} status checks")]
    Exhausted { job_id: i64, attempts: u32 },

    #[error("Polling for fitting job {job_id} was cancelled")]
    Cancelled { job_id: i64 },

    #[error(transparent)]
    Api(#[from] ApiError),
}
