use super::models::{CreateRestaurant, RestaurantPatch};
use crate::common::{ValidationResult, Validator};

pub const MAX_NAME_LEN: usize = 255;

pub struct CreateRestaurantValidator;

pub struct RestaurantPatchValidator;

impl Validator<CreateRestaurant> for CreateRestaurantValidator {
    fn validate(&self, data: &CreateRestaurant) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.merge(validate_name(&data.name));
        result.merge(validate_location(data.latitude, data.longitude));
        result.merge(validate_rating(data.rating));
        result.merge(validate_price_range(data.price_range));

        result
    }
}

impl Validator<RestaurantPatch> for RestaurantPatchValidator {
    fn validate(&self, data: &RestaurantPatch) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let Some(name) = &data.name {
            result.merge(validate_name(name));
        }

        match (data.latitude, data.longitude) {
            (None, None) => {}
            (Some(lat), Some(lon)) => result.merge(validate_location(lat, lon)),
            _ => result.add_error(
                "location",
                "Both latitude and longitude must be provided together",
            ),
        }

        if let Some(rating) = data.rating {
            result.merge(validate_rating(rating));
        }

        if let Some(price_range) = data.price_range {
            result.merge(validate_price_range(price_range));
        }

        result
    }
}

pub fn validate_name(name: &str) -> ValidationResult {
    let mut result = ValidationResult::new();

    if name.trim().is_empty() {
        result.add_error("name", "Restaurant name is required");
    }

    if name.chars().count() > MAX_NAME_LEN {
        result.add_error("name", "Restaurant name must not exceed 255 characters");
    }

    result
}

/// Latitude and longitude are both present or both absent, and in range
pub fn validate_location(latitude: Option<f64>, longitude: Option<f64>) -> ValidationResult {
    let mut result = ValidationResult::new();

    match (latitude, longitude) {
        (None, None) => {}
        (Some(lat), Some(lon)) => {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                result.add_error("latitude", "Latitude must be between -90 and 90");
            }
            if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                result.add_error("longitude", "Longitude must be between -180 and 180");
            }
        }
        _ => result.add_error(
            "location",
            "Both latitude and longitude must be provided together",
        ),
    }

    result
}

/// 0 to 10 in steps of 0.5; `None` means unrated
pub fn validate_rating(rating: Option<f64>) -> ValidationResult {
    let mut result = ValidationResult::new();

    if let Some(rating) = rating {
        if !rating.is_finite() || !(0.0..=10.0).contains(&rating) {
            result.add_error("rating", "Rating must be between 0 and 10");
        } else if (rating * 2.0).fract() != 0.0 {
            result.add_error("rating", "Rating must be a multiple of 0.5");
        }
    }

    result
}

pub fn validate_price_range(price_range: Option<i64>) -> ValidationResult {
    let mut result = ValidationResult::new();

    if let Some(price_range) = price_range {
        if !(1..=5).contains(&price_range) {
            result.add_error("price_range", "Price range must be between 1 and 5");
        }
    }

    result
}
