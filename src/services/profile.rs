use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::envelope::Ack;
use crate::models::user::{PhotoUploadResponse, UpdateProfileRequest, User, UserEnvelope};
use crate::services::api::{ApiClient, ApiError};
use crate::services::upload;

/// Profile endpoints, including the full-body photo used for fitting.
pub struct ProfileApi<'a> {
    api: &'a ApiClient,
}

impl ApiClient {
    pub fn profile(&self) -> ProfileApi<'_> {
        ProfileApi { api: self }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TagIds<'a> {
    tag_ids: &'a [i64],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CoordiIds<'a> {
    coordi_ids: &'a [i64],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferredTags {
    preferred_tags: Vec<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreferredCoordis {
    preferred_coordis: Vec<i64>,
}

impl ProfileApi<'_> {
    pub async fn get(&self) -> Result<User, ApiError> {
        let data: UserEnvelope = self.api.get("/profile").await?;
        Ok(data.user)
    }

    pub async fn update(&self, request: &UpdateProfileRequest) -> Result<User, ApiError> {
        request.validate()?;
        let data: UserEnvelope = self.api.put_json("/profile", request).await?;
        if let Some(name) = &request.name {
            self.api.session().set_user_name(name);
        }
        Ok(data.user)
    }

    /// Upload the user's photo. Returns its absolute URL.
    pub async fn upload_photo(&self, photo: Vec<u8>, file_name: &str) -> Result<String, ApiError> {
        let form = reqwest::multipart::Form::new().part("photo", upload::image_part(photo, file_name)?);
        let data: PhotoUploadResponse = self.api.post_multipart("/users/profile-photo", form).await?;
        tracing::info!(photo_url = %data.photo_url, "Profile photo uploaded");
        Ok(self.api.absolute_url(&data.photo_url))
    }

    pub async fn delete_photo(&self) -> Result<Ack, ApiError> {
        self.api.delete("/profile/photo").await
    }

    pub async fn update_tags(&self, tag_ids: &[i64]) -> Result<Vec<i64>, ApiError> {
        let data: PreferredTags = self.api.put_json("/profile/tags", &TagIds { tag_ids }).await?;
        Ok(data.preferred_tags)
    }

    pub async fn update_coordis(&self, coordi_ids: &[i64]) -> Result<Vec<i64>, ApiError> {
        let data: PreferredCoordis = self.api.put_json("/profile/coordis", &CoordiIds { coordi_ids }).await?;
        Ok(data.preferred_coordis)
    }
}
