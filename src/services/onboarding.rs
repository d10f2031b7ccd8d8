use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::closet::Season;
use crate::models::outfit::Outfit;
use crate::models::user::{Gender, OnboardingRequest, Tag};
use crate::services::api::{ApiClient, ApiError};

/// Cold-start survey endpoints.
pub struct OnboardingApi<'a> {
    api: &'a ApiClient,
}

impl ApiClient {
    pub fn onboarding(&self) -> OnboardingApi<'_> {
        OnboardingApi { api: self }
    }
}

#[derive(Debug, Deserialize)]
struct TagList {
    tags: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct CoordiList {
    coordis: Vec<Outfit>,
}

#[derive(Debug, Default, Serialize)]
struct CoordiQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    season: Option<Season>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnboardingResult {
    user: OnboardingUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnboardingUser {
    has_completed_onboarding: bool,
}

impl OnboardingApi<'_> {
    pub async fn tags(&self) -> Result<Vec<Tag>, ApiError> {
        let data: TagList = self.api.get("/onboarding/tags").await?;
        Ok(data.tags)
    }

    pub async fn sample_coordis(
        &self,
        gender: Option<Gender>,
        season: Option<Season>,
    ) -> Result<Vec<Outfit>, ApiError> {
        let query = CoordiQuery { gender, season };
        let data: CoordiList = self.api.get_query("/onboarding/sample-coordis", &query).await?;
        Ok(data.coordis)
    }

    /// Submit survey answers. Returns whether onboarding is now complete.
    pub async fn submit(&self, request: &OnboardingRequest) -> Result<bool, ApiError> {
        request.validate()?;
        let data: OnboardingResult = self.api.post_json("/onboarding", request).await?;
        Ok(data.user.has_completed_onboarding)
    }
}
