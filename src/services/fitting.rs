use async_trait::async_trait;
use garde::Validate;
use tokio_util::sync::CancellationToken;

use crate::models::envelope::{Ack, PageQuery};
use crate::models::job::{
    FittingHistory, FittingHistoryItem, FittingItem, FittingJob, StartFittingRequest,
    StartFittingResponse, StatusPayload,
};
use crate::services::api::{ApiClient, ApiError};
use crate::services::poller::{self, JobStatusSource, PollError, PollOptions};

/// `/virtual-fitting` endpoints.
pub struct FittingApi<'a> {
    api: &'a ApiClient,
}

impl ApiClient {
    pub fn fitting(&self) -> FittingApi<'_> {
        FittingApi { api: self }
    }
}

impl FittingApi<'_> {
    /// Submit a fitting job. An empty selection is rejected without a request.
    pub async fn start(&self, items: Vec<FittingItem>) -> Result<StartFittingResponse, ApiError> {
        let request = StartFittingRequest { items };
        request.validate()?;

        let response: StartFittingResponse = self.api.post_json("/virtual-fitting", &request).await?;
        metrics::counter!("fitting_jobs_started").increment(1);
        tracing::info!(job_id = response.job_id, items = request.items.len(), "Fitting job started");
        Ok(response)
    }

    pub async fn status(&self, job_id: i64) -> Result<FittingJob, ApiError> {
        let payload: StatusPayload = self.api.get(&format!("/virtual-fitting/{job_id}")).await?;
        Ok(payload.into_job(job_id))
    }

    pub async fn history(&self, page: PageQuery) -> Result<FittingHistory, ApiError> {
        self.api.get_query("/virtual-fitting", &page).await
    }

    /// Most recent fitting, if the user has any.
    pub async fn latest(&self) -> Result<Option<FittingHistoryItem>, ApiError> {
        let history = self.history(PageQuery::new(1, 1)).await?;
        Ok(history.fittings.into_iter().next())
    }

    pub async fn delete(&self, job_id: i64) -> Result<Ack, ApiError> {
        self.api.delete(&format!("/virtual-fitting/{job_id}")).await
    }

    /// Poll `job_id` until it reaches a terminal status.
    pub async fn wait(
        &self,
        job_id: i64,
        options: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<FittingJob, PollError> {
        poller::poll_until_terminal(self.api, job_id, options, cancel, |_| {}).await
    }
}

/// What the fitting workflow needs from the backend.
#[async_trait]
pub trait FittingBackend: JobStatusSource {
    async fn start_fitting(&self, items: Vec<FittingItem>) -> Result<StartFittingResponse, ApiError>;

    async fn latest_fitting(&self) -> Result<Option<FittingHistoryItem>, ApiError>;
}

#[async_trait]
impl JobStatusSource for ApiClient {
    async fn job_status(&self, job_id: i64) -> Result<FittingJob, ApiError> {
        self.fitting().status(job_id).await
    }
}

#[async_trait]
impl FittingBackend for ApiClient {
    async fn start_fitting(&self, items: Vec<FittingItem>) -> Result<StartFittingResponse, ApiError> {
        self.fitting().start(items).await
    }

    async fn latest_fitting(&self) -> Result<Option<FittingHistoryItem>, ApiError> {
        self.fitting().latest().await
    }
}
