use serde::{Deserialize, Serialize};

use crate::restaurants::Restaurant;

/// A map coordinate, longitude first like the map libraries take it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Stored location of a restaurant, if it has one
    pub fn of(restaurant: &Restaurant) -> Option<Self> {
        restaurant
            .lng_lat()
            .map(|(lng, lat)| Self::new(lng, lat))
    }
}
