use serde::{Deserialize, Serialize};

use crate::models::closet::Season;
use crate::models::envelope::Pagination;
use crate::models::user::Gender;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutfitItem {
    pub id: i64,
    pub category: String,
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    pub image_url: String,
    #[serde(default)]
    pub purchase_url: Option<String>,
}

/// A recommended coordination ("coordi").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Outfit {
    pub id: i64,
    /// Free-form style label (e.g. "캐주얼", "미니멀").
    pub style: String,
    pub season: Season,
    #[serde(default)]
    pub gender: Option<Gender>,
    pub image_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<OutfitItem>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub llm_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutfitPage {
    pub outfits: Vec<Outfit>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteResponse {
    #[serde(default)]
    pub message: Option<String>,
    pub is_favorite: bool,
}
