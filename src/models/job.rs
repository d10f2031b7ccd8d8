use chrono::{DateTime, NaiveDateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::closet::Category;

/// Status of a virtual-fitting job as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FittingStatus {
    #[serde(alias = "pending", alias = "queued")]
    Processing,
    Completed,
    Failed,
    Timeout,
}

impl FittingStatus {
    /// Completed, failed and timeout jobs never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }
}

/// A virtual-fitting job. The client only ever observes it through polling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FittingJob {
    /// Absent from some status payloads; filled in from the request path.
    #[serde(default)]
    pub job_id: i64,
    pub status: FittingStatus,
    #[serde(default)]
    pub result_image_url: Option<String>,
    #[serde(default)]
    pub llm_message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub failed_step: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Status payloads arrive either bare or wrapped as `{"job": {...}}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatusPayload {
    Wrapped { job: FittingJob },
    Bare(FittingJob),
}

impl StatusPayload {
    pub(crate) fn into_job(self, job_id: i64) -> FittingJob {
        let mut job = match self {
            Self::Wrapped { job } => job,
            Self::Bare(job) => job,
        };
        if job.job_id == 0 {
            job.job_id = job_id;
        }
        job
    }
}

/// One garment submitted for fitting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FittingItem {
    pub item_id: i64,
    pub category: Category,
}

/// Body of `POST /virtual-fitting`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct StartFittingRequest {
    #[garde(length(min = 1, max = 3))]
    pub items: Vec<FittingItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartFittingResponse {
    pub job_id: i64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Garment summary attached to a history entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub item_id: i64,
    pub category: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FittingHistoryItem {
    pub job_id: i64,
    pub status: FittingStatus,
    #[serde(default)]
    pub result_image_url: Option<String>,
    #[serde(default)]
    pub items: Vec<HistoryItem>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FittingHistory {
    pub fittings: Vec<FittingHistoryItem>,
    #[serde(default)]
    pub pagination: Option<crate::models::envelope::Pagination>,
}

impl FittingHistoryItem {
    /// Submission time. Timestamps without an offset are taken as UTC.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.and_utc()))
        .ok()
}
