use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Clothing category as sent on the wire ("top", "bottom", "outer").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr, EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Top,
    Bottom,
    Outer,
}

impl Category {
    /// Display label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            Self::Top => "상의",
            Self::Bottom => "하의",
            Self::Outer => "아우터",
        }
    }

    /// Reverse of [`Category::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        Self::iter().find(|c| c.label() == label)
    }

    /// Parse a wire token, ignoring anything that is not a fitting category.
    pub fn from_wire(token: &str) -> Option<Self> {
        token.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

/// A garment in the user's closet. Owned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClosetItem {
    pub id: i64,
    /// Raw wire category; see [`ClosetItem::category`] for the typed form.
    #[serde(rename = "category")]
    pub category_raw: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub purchase_url: Option<String>,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ClosetItem {
    /// Typed category, or `None` for items outside the three fitting slots.
    pub fn category(&self) -> Option<Category> {
        Category::from_wire(&self.category_raw)
    }
}
