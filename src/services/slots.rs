use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::models::closet::{Category, ClosetItem};
use crate::models::job::{FittingItem, HistoryItem};

/// Per-category fitting selection: at most one closet item per slot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FittingSlots {
    #[serde(default)]
    pub top: Option<i64>,
    #[serde(default)]
    pub bottom: Option<i64>,
    #[serde(default)]
    pub outer: Option<i64>,
}

impl FittingSlots {
    pub fn get(&self, category: Category) -> Option<i64> {
        match category {
            Category::Top => self.top,
            Category::Bottom => self.bottom,
            Category::Outer => self.outer,
        }
    }

    fn slot_mut(&mut self, category: Category) -> &mut Option<i64> {
        match category {
            Category::Top => &mut self.top,
            Category::Bottom => &mut self.bottom,
            Category::Outer => &mut self.outer,
        }
    }

    /// Assign `item_id` to `category`, returning the item it replaced.
    pub fn set(&mut self, category: Category, item_id: i64) -> Option<i64> {
        self.slot_mut(category).replace(item_id)
    }

    pub fn remove(&mut self, category: Category) -> Option<i64> {
        self.slot_mut(category).take()
    }

    /// Select a closet item into its category's slot. Selecting the item
    /// already in the slot empties it. Returns false for items whose
    /// category has no slot.
    pub fn toggle(&mut self, item: &ClosetItem) -> bool {
        let Some(category) = item.category() else {
            return false;
        };
        let slot = self.slot_mut(category);
        if *slot == Some(item.id) {
            *slot = None;
        } else {
            *slot = Some(item.id);
        }
        true
    }

    pub fn contains(&self, item_id: i64) -> bool {
        Category::iter().any(|c| self.get(c) == Some(item_id))
    }

    pub fn is_empty(&self) -> bool {
        Category::iter().all(|c| self.get(c).is_none())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Filled slots as request items, in top/bottom/outer order.
    pub fn items(&self) -> Vec<FittingItem> {
        Category::iter()
            .filter_map(|category| {
                self.get(category)
                    .map(|item_id| FittingItem { item_id, category })
            })
            .collect()
    }

    /// Overlay the garments of a past fitting onto these slots.
    /// Entries with unknown categories are skipped.
    pub fn restore_from(&mut self, items: &[HistoryItem]) {
        for item in items {
            if let Some(category) = Category::from_wire(&item.category) {
                self.set(category, item.item_id);
            }
        }
    }
}
