use uuid::Uuid;

use crate::id::IdentifierMap;

/// In-memory records produced by the entity readers. Legacy link fields hold
/// the old integer row ids; the resolved `Uuid` parents are filled in by the
/// relationship resolver before anything is written.

#[derive(Debug, Clone)]
pub struct LabelRecord {
    pub id: Uuid,
    pub legacy_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<i64>,
    pub emoji: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HomeRecord {
    pub id: Uuid,
    pub legacy_id: i64,
    pub name: String,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub purchase_date: Option<String>,
    pub purchase_price: Option<String>,
    pub primary_photo: Option<String>,
    pub secondary_photos: String,
    pub is_primary: bool,
    pub color_tag: Option<i64>,
    /// Legacy creation offset, kept in memory only for the most-recently-
    /// created fallback of the single-home selection rule.
    pub created_offset: Option<f64>,
}

impl HomeRecord {
    pub const DEFAULT_NAME: &'static str = "My Home";

    /// The legacy single-active-home selection rule: a home is "real" when
    /// the user renamed it, filled in any address field, or attached a photo.
    pub fn looks_real(&self) -> bool {
        let renamed = !self.name.trim().is_empty() && self.name != Self::DEFAULT_NAME;
        let has_address = [
            &self.address_line1,
            &self.address_line2,
            &self.city,
            &self.region,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .any(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()));
        let has_photo = self.primary_photo.is_some() || self.secondary_photos != "[]";
        renamed || has_address || has_photo
    }
}

#[derive(Debug, Clone)]
pub struct PolicyRecord {
    pub id: Uuid,
    pub legacy_id: i64,
    pub provider: Option<String>,
    pub policy_number: Option<String>,
    pub coverage_dwelling: Option<String>,
    pub coverage_other_structures: Option<String>,
    pub coverage_personal_property: Option<String>,
    pub coverage_loss_of_use: Option<String>,
    pub coverage_liability: Option<String>,
    pub coverage_medical: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Direct home column, present in the mid generations only.
    pub legacy_home_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct LocationRecord {
    pub id: Uuid,
    pub legacy_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub photos: String,
    pub legacy_home_id: Option<i64>,
    pub home_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct ItemRecord {
    pub id: Uuid,
    pub legacy_id: i64,
    pub title: String,
    pub quantity_text: Option<String>,
    pub quantity: i64,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    pub model_number: Option<String>,
    pub make: Option<String>,
    pub price: Option<String>,
    pub insured: bool,
    pub notes: Option<String>,
    pub replacement_cost: Option<String>,
    pub depreciation_rate: Option<String>,
    pub photos: String,
    pub ai_assisted: bool,
    pub created_at: Option<String>,
    pub purchase_date: Option<String>,
    pub warranty_expires: Option<String>,
    pub dimensions: Option<String>,
    pub weight: Option<String>,
    pub color: Option<String>,
    pub fragile: bool,
    pub moving_priority: Option<i64>,
    pub room_destination: Option<String>,
    pub legacy_location_id: Option<i64>,
    pub legacy_home_id: Option<i64>,
    /// Single-label column from the oldest generation.
    pub legacy_label_id: Option<i64>,
    pub location_id: Option<Uuid>,
    pub home_id: Option<Uuid>,
}

/// Everything the readers produced from the legacy store, plus the
/// identifier maps the resolver needs.
#[derive(Debug, Default)]
pub struct LegacySnapshot {
    pub labels: Vec<LabelRecord>,
    pub homes: Vec<HomeRecord>,
    pub policies: Vec<PolicyRecord>,
    pub locations: Vec<LocationRecord>,
    pub items: Vec<ItemRecord>,
    /// Raw join rows as read, still in legacy integer ids.
    pub item_label_pairs: Vec<(i64, i64)>,
    pub home_policy_pairs: Vec<(i64, i64)>,
    pub maps: IdMaps,
}

impl LegacySnapshot {
    pub fn has_content(&self) -> bool {
        !self.labels.is_empty()
            || !self.policies.is_empty()
            || !self.locations.is_empty()
            || !self.items.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct IdMaps {
    pub labels: IdentifierMap,
    pub homes: IdentifierMap,
    pub policies: IdentifierMap,
    pub locations: IdentifierMap,
    pub items: IdentifierMap,
}

impl Default for HomeRecord {
    fn default() -> Self {
        HomeRecord {
            id: Uuid::nil(),
            legacy_id: 0,
            name: Self::DEFAULT_NAME.to_string(),
            address_line1: None,
            address_line2: None,
            city: None,
            region: None,
            postal_code: None,
            country: None,
            purchase_date: None,
            purchase_price: None,
            primary_photo: None,
            secondary_photos: "[]".to_string(),
            is_primary: false,
            color_tag: None,
            created_offset: None,
        }
    }
}
