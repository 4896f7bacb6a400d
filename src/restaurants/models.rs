// src/restaurants/models.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::helpers::{double_option, tags_from_column};

// ============================================================================
// Storage
// ============================================================================

/// Row of the `restaurants` table. Ratings are stored as half-points
/// (0..=20) so the 0.5 grid survives the round trip exactly.
#[derive(Debug, Clone, FromRow)]
pub struct RestaurantRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating_half_points: Option<i64>,
    pub price_range: Option<i64>,
    pub descriptors: Option<String>,
    pub menu_items: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

// ============================================================================
// API shape
// ============================================================================

/// A restaurant as the API returns it, location flattened into
/// `latitude` / `longitude`. Unset values are `null`, never 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub rating: Option<f64>,
    pub price_range: Option<i64>,
    #[serde(default)]
    pub descriptors: Vec<String>,
    #[serde(default)]
    pub menu_items: Vec<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<RestaurantRow> for Restaurant {
    fn from(row: RestaurantRow) -> Self {
        Self {
            descriptors: tags_from_column(row.descriptors.as_deref()),
            menu_items: tags_from_column(row.menu_items.as_deref()),
            rating: row.rating_half_points.map(half_points_to_rating),
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            address: row.address,
            latitude: row.latitude,
            longitude: row.longitude,
            price_range: row.price_range,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Restaurant {
    /// `(longitude, latitude)` when the restaurant has a location
    pub fn lng_lat(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lng), Some(lat)) => Some((lng, lat)),
            _ => None,
        }
    }
}

// ============================================================================
// Request models
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateRestaurant {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub price_range: Option<i64>,
    #[serde(default)]
    pub descriptors: Vec<String>,
    #[serde(default)]
    pub menu_items: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update.
///
/// For every field: omitted means "keep", a value means "set". Nullable
/// fields additionally accept `null`, meaning "clear". `latitude` and
/// `longitude` travel together: both values, both `null` (remove the
/// location), or both omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestaurantPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub latitude: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub longitude: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub rating: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub price_range: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_items: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<Option<String>>,
}

impl RestaurantPatch {
    /// Patch that only relocates the restaurant
    pub fn relocate(longitude: f64, latitude: f64) -> Self {
        Self {
            latitude: Some(Some(latitude)),
            longitude: Some(Some(longitude)),
            ..Default::default()
        }
    }
}

/// Distinct tags across all of a user's restaurants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagSummary {
    pub descriptors: Vec<String>,
    pub menu_items: Vec<String>,
}

pub fn rating_to_half_points(rating: f64) -> i64 {
    (rating * 2.0).round() as i64
}

pub fn half_points_to_rating(half_points: i64) -> f64 {
    half_points as f64 / 2.0
}
