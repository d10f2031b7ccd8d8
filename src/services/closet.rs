use serde::Serialize;

use crate::models::closet::{Category, ClosetItem, Season};
use crate::models::envelope::{Ack, PageQuery, Pagination};
use crate::services::api::{ApiClient, ApiError};
use crate::services::upload;

/// Items requested when filling the closet cache.
const CACHE_PAGE_LIMIT: u32 = 50;

/// `/closet` endpoints.
pub struct ClosetApi<'a> {
    api: &'a ApiClient,
}

impl ApiClient {
    pub fn closet(&self) -> ClosetApi<'_> {
        ClosetApi { api: self }
    }
}

#[derive(Debug, Serialize)]
struct ListQuery<'a> {
    page: u32,
    limit: u32,
    category: &'a str,
}

#[derive(Debug, serde::Deserialize)]
pub struct ClosetPage {
    pub items: Vec<ClosetItem>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, serde::Deserialize)]
struct ItemEnvelope {
    item: ClosetItem,
}

impl ClosetApi<'_> {
    /// List closet items. `None` lists every category.
    pub async fn list(&self, page: PageQuery, category: Option<Category>) -> Result<ClosetPage, ApiError> {
        let query = ListQuery {
            page: page.page,
            limit: page.limit,
            category: category.map_or("all", <&'static str>::from),
        };
        self.api.get_query("/closet", &query).await
    }

    pub async fn get(&self, item_id: i64) -> Result<ClosetItem, ApiError> {
        let data: ItemEnvelope = self.api.get(&format!("/closet/items/{item_id}")).await?;
        Ok(data.item)
    }

    /// Upload a garment photo. The image format is checked before sending.
    pub async fn add(
        &self,
        image: Vec<u8>,
        file_name: &str,
        category: Category,
        season: Season,
    ) -> Result<ClosetItem, ApiError> {
        let part = upload::image_part(image, file_name)?;
        let form = reqwest::multipart::Form::new()
            .part("image", part)
            .text("category", category.to_string())
            .text("season", season.to_string());

        let data: ItemEnvelope = self.api.post_multipart("/closet/items", form).await?;
        tracing::info!(item_id = data.item.id, category = %category, "Closet item added");
        Ok(data.item)
    }

    pub async fn delete(&self, item_id: i64) -> Result<Ack, ApiError> {
        self.api.delete(&format!("/closet/items/{item_id}")).await
    }
}

/// Read-only copy of the closet, refreshed on explicit reload or after a delete.
#[derive(Debug, Default)]
pub struct ClosetCache {
    items: Option<Vec<ClosetItem>>,
}

impl ClosetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.items.is_some()
    }

    /// Cached items, fetching them on first use.
    pub async fn items(&mut self, api: &ApiClient) -> Result<&[ClosetItem], ApiError> {
        if self.items.is_none() {
            self.reload(api).await?;
        }
        Ok(self.items.as_deref().unwrap_or_default())
    }

    pub async fn reload(&mut self, api: &ApiClient) -> Result<(), ApiError> {
        let page = api.closet().list(PageQuery::new(1, CACHE_PAGE_LIMIT), None).await?;
        tracing::debug!(count = page.items.len(), "Closet cache loaded");
        self.items = Some(page.items);
        Ok(())
    }

    /// Delete an item on the backend and drop the cached copy.
    pub async fn delete(&mut self, api: &ApiClient, item_id: i64) -> Result<(), ApiError> {
        api.closet().delete(item_id).await?;
        self.invalidate();
        Ok(())
    }

    pub fn invalidate(&mut self) {
        self.items = None;
    }

    pub fn find(&self, item_id: i64) -> Option<&ClosetItem> {
        self.items.as_deref()?.iter().find(|item| item.id == item_id)
    }

    /// Cached items in `category`, or all of them for `None`.
    pub fn filter(&self, category: Option<Category>) -> Vec<&ClosetItem> {
        self.items
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter(|item| category.is_none() || item.category() == category)
            .collect()
    }
}
