use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryCategory {
    Medication,
    Vaccine,
    Food,
    Supply,
    Equipment,
}

/// A stocked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub category: InventoryCategory,
    pub quantity: u32,
    pub unit: String,
    pub reorder_level: u32,
    pub unit_cost_cents: i64,
    pub expires_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires_on.is_some_and(|d| d < today)
    }
}

/// Inventory form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryDraft {
    pub name: String,
    pub sku: String,
    pub category: InventoryCategory,
    pub quantity: u32,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default)]
    pub reorder_level: u32,
    #[serde(default)]
    pub unit_cost_cents: i64,
    #[serde(default)]
    pub expires_on: Option<NaiveDate>,
}

fn default_unit() -> String {
    "unit".to_string()
}

impl InventoryDraft {
    pub fn into_item(self, id: String, now: DateTime<Utc>) -> InventoryItem {
        InventoryItem {
            id,
            name: self.name.trim().to_string(),
            sku: self.sku.trim().to_uppercase(),
            category: self.category,
            quantity: self.quantity,
            unit: self.unit,
            reorder_level: self.reorder_level,
            unit_cost_cents: self.unit_cost_cents,
            expires_on: self.expires_on,
            created_at: now,
        }
    }

    pub fn apply_to(self, item: &mut InventoryItem) {
        item.name = self.name.trim().to_string();
        item.sku = self.sku.trim().to_uppercase();
        item.category = self.category;
        item.quantity = self.quantity;
        item.unit = self.unit;
        item.reorder_level = self.reorder_level;
        item.unit_cost_cents = self.unit_cost_cents;
        item.expires_on = self.expires_on;
    }
}
