//! Virtual-fitting workflow: slots → start job → poll → outcome.
//!
//! Only one fitting is tracked at a time. Starting a new one, restoring from
//! history or calling [`FittingWorkflow::cancel`] cancels the previous poll,
//! and a cancelled poll never writes workflow state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::models::closet::{Category, ClosetItem};
use crate::models::job::{FittingJob, FittingStatus};
use crate::services::fitting::FittingBackend;
use crate::services::poller::{self, PollError, PollOptions};
use crate::services::progress::{ProgressTicker, DEFAULT_ESTIMATE_SECS, SECS_PER_ITEM};
use crate::services::slots::FittingSlots;
use crate::session::Session;

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Idle,
    /// `job_id` is `None` until the backend has accepted the request.
    Processing { job_id: Option<i64> },
    Completed {
        job_id: i64,
        result_image_url: Option<String>,
        llm_message: Option<String>,
    },
}

/// How a fitting attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum FittingOutcome {
    /// No garments selected; nothing was sent.
    Rejected,
    Completed(FittingJob),
    /// The backend reported the job as failed.
    Failed { job_id: i64, error: Option<String> },
    /// The backend reported the job as timed out.
    TimedOut { job_id: i64 },
    /// The job was still processing when the poll budget ran out.
    PollingExceeded { job_id: i64, attempts: u32 },
    /// Superseded by a newer fitting or an explicit cancel.
    Cancelled { job_id: Option<i64> },
    /// Transport, auth or API error.
    Error { message: String },
}

impl FittingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Alert text for failed outcomes. Budget exhaustion reads like a timeout.
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Completed(_) | Self::Cancelled { .. } => None,
            Self::Rejected => Some("Select at least one item to try on".to_string()),
            Self::Failed { error, .. } => Some(format!(
                "Fitting failed: {}",
                error.as_deref().unwrap_or("unknown error")
            )),
            Self::TimedOut { .. } | Self::PollingExceeded { .. } => {
                Some("Fitting took too long. Please try again.".to_string())
            }
            Self::Error { message } => Some(message.clone()),
        }
    }
}

struct ActivePoll {
    generation: u64,
    cancel: CancellationToken,
}

pub struct FittingWorkflow<B: ?Sized> {
    backend: Arc<B>,
    session: Session,
    options: PollOptions,
    estimated_secs: u64,
    state: Mutex<WorkflowState>,
    active: Mutex<Option<ActivePoll>>,
    generation: AtomicU64,
    progress: ProgressTicker,
}

impl<B> FittingWorkflow<B>
where
    B: FittingBackend + ?Sized,
{
    pub fn new(backend: Arc<B>, session: Session, options: PollOptions) -> Self {
        Self {
            backend,
            session,
            options,
            estimated_secs: DEFAULT_ESTIMATE_SECS,
            state: Mutex::new(WorkflowState::Idle),
            active: Mutex::new(None),
            generation: AtomicU64::new(0),
            progress: ProgressTicker::new(),
        }
    }

    /// Override the progress estimate for new fittings.
    pub fn with_estimate(mut self, estimated_secs: u64) -> Self {
        self.estimated_secs = estimated_secs;
        self
    }

    pub fn state(&self) -> WorkflowState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn slots(&self) -> FittingSlots {
        self.session.slots()
    }

    /// Displayed progress percentage.
    pub fn progress(&self) -> watch::Receiver<f64> {
        self.progress.subscribe()
    }

    /// Toggle a closet item in its slot. Editing after a completed fitting
    /// returns the workflow to idle.
    pub fn select_item(&self, item: &ClosetItem) -> bool {
        let mut changed = false;
        self.session.update_slots(|slots| changed = slots.toggle(item));
        if changed {
            self.leave_completed();
        }
        changed
    }

    pub fn assign(&self, category: Category, item_id: i64) {
        self.session.update_slots(|slots| {
            slots.set(category, item_id);
        });
        self.leave_completed();
    }

    /// Replace the whole slot assignment with `selections`.
    pub fn replace_selection(&self, selections: &[(Category, i64)]) {
        self.session.update_slots(|slots| {
            slots.clear();
            for &(category, item_id) in selections {
                slots.set(category, item_id);
            }
        });
        self.leave_completed();
    }

    pub fn remove(&self, category: Category) {
        self.session.update_slots(|slots| {
            slots.remove(category);
        });
        self.leave_completed();
    }

    /// Abandon any outstanding poll and return to idle.
    pub fn cancel(&self) {
        if let Some(active) = self.active.lock().unwrap_or_else(PoisonError::into_inner).take() {
            tracing::info!("Cancelling outstanding fitting poll");
            active.cancel.cancel();
        }
        self.set_state(WorkflowState::Idle);
        self.progress.reset();
    }

    /// Run a fitting with the currently selected slots.
    pub async fn run(&self) -> FittingOutcome {
        let items = self.session.slots().items();
        if items.is_empty() {
            tracing::info!("Fitting rejected: no items selected");
            return FittingOutcome::Rejected;
        }

        let (generation, cancel) = self.begin_poll();
        self.set_state(WorkflowState::Processing { job_id: None });
        self.progress.start(self.estimated_secs);

        let started = tokio::select! {
            _ = cancel.cancelled() => return FittingOutcome::Cancelled { job_id: None },
            started = self.backend.start_fitting(items) => started,
        };

        let job_id = match started {
            Ok(response) => response.job_id,
            Err(e) => {
                tracing::error!(error = %e, "Failed to start fitting");
                return self.finish(generation, &cancel, Err(PollError::Api(e)), true);
            }
        };

        if !cancel.is_cancelled() {
            self.set_state(WorkflowState::Processing { job_id: Some(job_id) });
        }

        let started_at = Instant::now();
        let result = poller::poll_until_terminal(&*self.backend, job_id, &self.options, &cancel, |job| {
            tracing::debug!(job_id, status = ?job.status, step = ?job.current_step, "Fitting status");
        })
        .await;
        metrics::histogram!("fitting_wait_seconds").record(started_at.elapsed().as_secs_f64());

        self.finish(generation, &cancel, result, true)
    }

    /// Resume from the newest history entry.
    ///
    /// A processing job restores its slots and resumes polling; a completed
    /// job restores its slots and result. Failed and timed-out jobs leave the
    /// workflow idle and return `None`.
    pub async fn restore(&self) -> Option<FittingOutcome> {
        let latest = match self.backend.latest_fitting().await {
            Ok(Some(latest)) => latest,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to restore fitting status");
                return None;
            }
        };

        if matches!(latest.status, FittingStatus::Failed | FittingStatus::Timeout) {
            tracing::debug!(job_id = latest.job_id, status = ?latest.status, "Latest fitting not restorable");
            return None;
        }

        self.session.update_slots(|slots| slots.restore_from(&latest.items));
        let (generation, cancel) = self.begin_poll();

        if latest.status == FittingStatus::Processing {
            let age_secs = latest
                .created()
                .map(|created| (chrono::Utc::now() - created).num_seconds());
            tracing::info!(job_id = latest.job_id, ?age_secs, "Resuming in-flight fitting");
            let estimate = match latest.items.len() as u64 {
                0 => DEFAULT_ESTIMATE_SECS,
                n => n * SECS_PER_ITEM,
            };
            self.set_state(WorkflowState::Processing { job_id: Some(latest.job_id) });
            self.progress.start(estimate);
        }

        let result =
            poller::poll_until_terminal(&*self.backend, latest.job_id, &self.options, &cancel, |_| {}).await;
        Some(self.finish(generation, &cancel, result, false))
    }

    fn begin_poll(&self) -> (u64, CancellationToken) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();
        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(ActivePoll {
                generation,
                cancel: cancel.clone(),
            });
        if let Some(previous) = previous {
            tracing::info!(generation = previous.generation, "Superseding previous fitting poll");
            previous.cancel.cancel();
        }
        (generation, cancel)
    }

    fn finish(
        &self,
        generation: u64,
        cancel: &CancellationToken,
        result: Result<FittingJob, PollError>,
        clear_slots: bool,
    ) -> FittingOutcome {
        if cancel.is_cancelled() {
            let job_id = match &result {
                Ok(job) => Some(job.job_id),
                Err(PollError::Cancelled { job_id }) | Err(PollError::Exhausted { job_id, .. }) => Some(*job_id),
                Err(_) => None,
            };
            tracing::debug!(?job_id, "Discarding result of cancelled fitting poll");
            return FittingOutcome::Cancelled { job_id };
        }

        {
            let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
            if active.as_ref().is_some_and(|a| a.generation == generation) {
                *active = None;
            }
        }

        let outcome = match result {
            Ok(job) if job.status == FittingStatus::Completed => {
                self.set_state(WorkflowState::Completed {
                    job_id: job.job_id,
                    result_image_url: job.result_image_url.clone(),
                    llm_message: job.llm_message.clone(),
                });
                self.progress.complete();
                if clear_slots {
                    self.session.update_slots(FittingSlots::clear);
                }
                metrics::counter!("fitting_jobs_completed").increment(1);
                return FittingOutcome::Completed(job);
            }
            Ok(job) if job.status == FittingStatus::Failed => FittingOutcome::Failed {
                job_id: job.job_id,
                error: job.error,
            },
            // The poller only returns terminal jobs.
            Ok(job) => FittingOutcome::TimedOut { job_id: job.job_id },
            Err(PollError::Exhausted { job_id, attempts }) => FittingOutcome::PollingExceeded { job_id, attempts },
            Err(PollError::Cancelled { job_id }) => return FittingOutcome::Cancelled { job_id: Some(job_id) },
            Err(PollError::InvalidJobId(job_id)) => FittingOutcome::Error {
                message: format!("Backend returned invalid job id {job_id}"),
            },
            Err(PollError::Api(e)) => FittingOutcome::Error {
                message: e.user_message(),
            },
        };

        tracing::warn!(outcome = ?outcome, "Fitting did not complete");
        metrics::counter!("fitting_jobs_failed").increment(1);
        self.set_state(WorkflowState::Idle);
        self.progress.reset();
        outcome
    }

    fn leave_completed(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, WorkflowState::Completed { .. }) {
            *state = WorkflowState::Idle;
            drop(state);
            self.progress.reset();
        }
    }

    fn set_state(&self, next: WorkflowState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{FittingHistoryItem, FittingItem, HistoryItem, StartFittingResponse};
    use crate::services::api::ApiError;
    use crate::services::poller::JobStatusSource;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeBackend {
        statuses: Mutex<VecDeque<FittingStatus>>,
        latest: Mutex<Option<FittingHistoryItem>>,
        starts: AtomicU32,
        submitted: Mutex<Vec<Vec<FittingItem>>>,
        polls: AtomicU32,
        next_job_id: AtomicU64,
    }

    impl FakeBackend {
        fn scripted(statuses: &[FittingStatus]) -> Arc<Self> {
            let backend = Self::default();
            *backend.statuses.lock().unwrap() = statuses.iter().copied().collect();
            backend.next_job_id.store(100, Ordering::SeqCst);
            Arc::new(backend)
        }
    }

    #[async_trait]
    impl JobStatusSource for FakeBackend {
        async fn job_status(&self, job_id: i64) -> Result<FittingJob, ApiError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let status = {
                let mut statuses = self.statuses.lock().unwrap();
                if statuses.len() > 1 {
                    statuses.pop_front().unwrap()
                } else {
                    *statuses.front().unwrap()
                }
            };
            Ok(FittingJob {
                job_id,
                status,
                result_image_url: Some(format!("/results/{job_id}.png")),
                llm_message: Some("Great layering".into()),
                error: None,
                current_step: None,
                failed_step: None,
                created_at: None,
            })
        }
    }

    #[async_trait]
    impl FittingBackend for FakeBackend {
        async fn start_fitting(&self, items: Vec<FittingItem>) -> Result<StartFittingResponse, ApiError> {
            assert!(!items.is_empty());
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.submitted.lock().unwrap().push(items);
            let job_id = self.next_job_id.fetch_add(1, Ordering::SeqCst) as i64;
            Ok(StartFittingResponse { job_id, message: None })
        }

        async fn latest_fitting(&self) -> Result<Option<FittingHistoryItem>, ApiError> {
            Ok(self.latest.lock().unwrap().clone())
        }
    }

    fn options(max_attempts: u32) -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(2000),
            max_attempts,
            ..Default::default()
        }
    }

    fn workflow(backend: Arc<FakeBackend>, max_attempts: u32) -> FittingWorkflow<FakeBackend> {
        FittingWorkflow::new(backend, Session::in_memory(), options(max_attempts))
    }

    #[tokio::test]
    async fn empty_slots_are_rejected_before_any_request() {
        let backend = FakeBackend::scripted(&[FittingStatus::Completed]);
        let flow = workflow(backend.clone(), 60);

        assert_eq!(flow.run().await, FittingOutcome::Rejected);
        assert_eq!(backend.starts.load(Ordering::SeqCst), 0);
        assert_eq!(flow.state(), WorkflowState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_clears_slots_and_snaps_progress() {
        let backend = FakeBackend::scripted(&[FittingStatus::Processing, FittingStatus::Completed]);
        let flow = workflow(backend.clone(), 60);
        flow.assign(Category::Top, 1);
        flow.assign(Category::Outer, 3);

        let outcome = flow.run().await;

        assert!(outcome.is_success());
        assert!(flow.slots().is_empty());
        assert_eq!(*flow.progress().borrow(), 100.0);
        assert_eq!(
            flow.state(),
            WorkflowState::Completed {
                job_id: 100,
                result_image_url: Some("/results/100.png".into()),
                llm_message: Some("Great layering".into()),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn backend_failure_returns_to_idle_and_keeps_slots() {
        let backend = FakeBackend::scripted(&[FittingStatus::Processing, FittingStatus::Failed]);
        let flow = workflow(backend, 60);
        flow.assign(Category::Bottom, 2);

        let outcome = flow.run().await;

        assert!(matches!(outcome, FittingOutcome::Failed { job_id: 100, .. }));
        assert_eq!(flow.state(), WorkflowState::Idle);
        assert_eq!(flow.slots().bottom, Some(2));
        assert_eq!(*flow.progress().borrow(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_is_labelled_like_a_timeout() {
        let backend = FakeBackend::scripted(&[FittingStatus::Processing]);
        let flow = workflow(backend.clone(), 3);
        flow.assign(Category::Top, 1);

        let outcome = flow.run().await;

        assert_eq!(outcome, FittingOutcome::PollingExceeded { job_id: 100, attempts: 3 });
        assert_eq!(
            outcome.user_message(),
            FittingOutcome::TimedOut { job_id: 100 }.user_message()
        );
        assert_eq!(backend.polls.load(Ordering::SeqCst), 3);
        assert_eq!(flow.state(), WorkflowState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_abandons_outstanding_poll() {
        let backend = FakeBackend::scripted(&[FittingStatus::Processing]);
        let flow = Arc::new(workflow(backend.clone(), 60));
        flow.assign(Category::Top, 1);

        let first = {
            let flow = Arc::clone(&flow);
            tokio::spawn(async move { flow.run().await })
        };
        tokio::time::sleep(Duration::from_millis(3000)).await;

        flow.cancel();
        let outcome = first.await.unwrap();
        assert_eq!(outcome, FittingOutcome::Cancelled { job_id: Some(100) });
        assert_eq!(flow.state(), WorkflowState::Idle);

        let polls = backend.polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(backend.polls.load(Ordering::SeqCst), polls);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_run_supersedes_stale_poll() {
        let backend = FakeBackend::scripted(&[FittingStatus::Processing]);
        let flow = Arc::new(workflow(backend.clone(), 60));
        flow.assign(Category::Top, 1);

        let first = {
            let flow = Arc::clone(&flow);
            tokio::spawn(async move { flow.run().await })
        };
        tokio::time::sleep(Duration::from_millis(3000)).await;

        let second = {
            let flow = Arc::clone(&flow);
            tokio::spawn(async move { flow.run().await })
        };
        let outcome = first.await.unwrap();

        assert_eq!(outcome, FittingOutcome::Cancelled { job_id: Some(100) });
        assert_eq!(flow.state(), WorkflowState::Processing { job_id: Some(101) });
        assert_eq!(backend.starts.load(Ordering::SeqCst), 2);
        assert_eq!(flow.slots().top, Some(1));

        flow.cancel();
        assert_eq!(second.await.unwrap(), FittingOutcome::Cancelled { job_id: Some(101) });
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_selection_drops_stale_slots() {
        let backend = FakeBackend::scripted(&[FittingStatus::Completed]);
        let flow = workflow(backend.clone(), 60);
        flow.assign(Category::Bottom, 12);

        flow.replace_selection(&[(Category::Top, 3)]);
        assert!(flow.run().await.is_success());

        assert_eq!(
            *backend.submitted.lock().unwrap(),
            vec![vec![FittingItem { item_id: 3, category: Category::Top }]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restore_completed_job_keeps_slots() {
        let backend = FakeBackend::scripted(&[FittingStatus::Completed]);
        *backend.latest.lock().unwrap() = Some(FittingHistoryItem {
            job_id: 55,
            status: FittingStatus::Completed,
            result_image_url: Some("/results/55.png".into()),
            items: vec![HistoryItem { item_id: 4, category: "top".into(), name: None }],
            created_at: None,
        });
        let flow = workflow(backend.clone(), 60);

        let outcome = flow.restore().await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(backend.polls.load(Ordering::SeqCst), 1);
        assert_eq!(flow.slots().top, Some(4));
        assert_eq!(*flow.progress().borrow(), 100.0);
        assert_eq!(
            flow.state(),
            WorkflowState::Completed {
                job_id: 55,
                result_image_url: Some("/results/55.png".into()),
                llm_message: Some("Great layering".into()),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restore_resumes_processing_job() {
        let backend = FakeBackend::scripted(&[FittingStatus::Processing, FittingStatus::Completed]);
        *backend.latest.lock().unwrap() = Some(FittingHistoryItem {
            job_id: 55,
            status: FittingStatus::Processing,
            result_image_url: None,
            items: vec![
                HistoryItem { item_id: 4, category: "top".into(), name: None },
                HistoryItem { item_id: 6, category: "bottom".into(), name: None },
            ],
            created_at: None,
        });
        let flow = workflow(backend, 60);

        let outcome = flow.restore().await.unwrap();

        assert!(outcome.is_success());
        assert_eq!(flow.slots().top, Some(4));
        assert_eq!(flow.slots().bottom, Some(6));
        assert!(matches!(flow.state(), WorkflowState::Completed { job_id: 55, .. }));
    }

    #[tokio::test]
    async fn restore_ignores_failed_history() {
        let backend = FakeBackend::scripted(&[FittingStatus::Completed]);
        *backend.latest.lock().unwrap() = Some(FittingHistoryItem {
            job_id: 9,
            status: FittingStatus::Failed,
            result_image_url: None,
            items: vec![],
            created_at: None,
        });
        let flow = workflow(backend.clone(), 60);

        assert!(flow.restore().await.is_none());
        assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
        assert_eq!(flow.state(), WorkflowState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn editing_after_completion_returns_to_idle() {
        let backend = FakeBackend::scripted(&[FittingStatus::Completed]);
        let flow = workflow(backend, 60);
        flow.assign(Category::Top, 1);
        assert!(flow.run().await.is_success());

        flow.assign(Category::Bottom, 2);
        assert_eq!(flow.state(), WorkflowState::Idle);
        assert_eq!(*flow.progress().borrow(), 0.0);
    }
}
