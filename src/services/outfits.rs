use serde::{Deserialize, Serialize};

use crate::models::closet::Season;
use crate::models::envelope::PageQuery;
use crate::models::outfit::{FavoriteResponse, Outfit, OutfitPage};
use crate::services::api::{ApiClient, ApiError};

/// Recommendation feed and favorites.
pub struct OutfitsApi<'a> {
    api: &'a ApiClient,
}

impl ApiClient {
    pub fn outfits(&self) -> OutfitsApi<'_> {
        OutfitsApi { api: self }
    }
}

#[derive(Debug, Serialize)]
struct FeedQuery {
    page: u32,
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    season: Option<Season>,
}

#[derive(Debug, Deserialize)]
struct OutfitEnvelope {
    outfit: Outfit,
}

impl OutfitsApi<'_> {
    pub async fn recommendations(&self, page: PageQuery, season: Option<Season>) -> Result<OutfitPage, ApiError> {
        let query = FeedQuery {
            page: page.page,
            limit: page.limit,
            season,
        };
        self.api.get_query("/outfits/recommendations", &query).await
    }

    pub async fn detail(&self, outfit_id: i64) -> Result<Outfit, ApiError> {
        let data: OutfitEnvelope = self.api.get(&format!("/outfits/{outfit_id}")).await?;
        Ok(data.outfit)
    }

    pub async fn add_favorite(&self, outfit_id: i64) -> Result<FavoriteResponse, ApiError> {
        self.api.post(&format!("/outfits/{outfit_id}/favorite")).await
    }

    pub async fn remove_favorite(&self, outfit_id: i64) -> Result<FavoriteResponse, ApiError> {
        self.api.delete(&format!("/outfits/{outfit_id}/favorite")).await
    }

    pub async fn favorites(&self, page: PageQuery) -> Result<OutfitPage, ApiError> {
        self.api.get_query("/outfits/favorites", &page).await
    }
}
