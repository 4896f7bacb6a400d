// src/restaurants/handlers.rs

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::models::{CreateRestaurant, Restaurant, RestaurantPatch, TagSummary};
use super::validators::{CreateRestaurantValidator, RestaurantPatchValidator};
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState, Validator};

fn not_found() -> ApiError {
    ApiError::NotFound("Restaurant not found".to_string())
}

/// GET /user/restaurants - All restaurants of the authenticated user
pub async fn list_restaurants(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<Vec<Restaurant>>, ApiError> {
    let state = state_lock.read().await.clone();

    let restaurants = state.restaurants.list(&authed.id).await.map_err(|e| {
        error!(error = %e, user_id = %authed.id, "Database error listing restaurants");
        ApiError::DatabaseError(e)
    })?;

    debug!(
        user_id = %authed.id,
        restaurant_count = restaurants.len(),
        "Fetched user restaurants"
    );

    Ok(Json(restaurants))
}

/// GET /user/restaurants/:id
pub async fn get_restaurant(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(restaurant_id): Path<String>,
) -> Result<Json<Restaurant>, ApiError> {
    let state = state_lock.read().await.clone();

    let restaurant = state
        .restaurants
        .get(&restaurant_id, &authed.id)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                user_id = %authed.id,
                restaurant_id = %restaurant_id,
                "Database error fetching restaurant"
            );
            ApiError::DatabaseError(e)
        })?;

    restaurant.map(Json).ok_or_else(not_found)
}

/// POST /user/restaurants - Create a restaurant for the authenticated user
pub async fn create_restaurant(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<CreateRestaurant>,
) -> Result<(StatusCode, Json<Restaurant>), ApiError> {
    let state = state_lock.read().await.clone();

    let validation_result = CreateRestaurantValidator.validate(&request);
    if !validation_result.is_valid {
        warn!(
            user_id = %authed.id,
            errors = ?validation_result.errors,
            "Restaurant creation validation failed"
        );
        return Err(ApiError::from(validation_result));
    }

    let restaurant = state
        .restaurants
        .create(&authed.id, &request)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %authed.id, "Database error creating restaurant");
            ApiError::DatabaseError(e)
        })?;

    info!(
        user_id = %authed.id,
        restaurant_id = %restaurant.id,
        name = %restaurant.name,
        "Restaurant created"
    );

    Ok((StatusCode::CREATED, Json(restaurant)))
}

/// PUT /user/restaurants/:id - Apply a partial update
pub async fn update_restaurant(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(restaurant_id): Path<String>,
    Json(patch): Json<RestaurantPatch>,
) -> Result<Json<Restaurant>, ApiError> {
    let state = state_lock.read().await.clone();

    let validation_result = RestaurantPatchValidator.validate(&patch);
    if !validation_result.is_valid {
        warn!(
            user_id = %authed.id,
            restaurant_id = %restaurant_id,
            errors = ?validation_result.errors,
            "Restaurant update validation failed"
        );
        return Err(ApiError::from(validation_result));
    }

    let updated = state
        .restaurants
        .update(&restaurant_id, &authed.id, &patch)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                user_id = %authed.id,
                restaurant_id = %restaurant_id,
                "Database error updating restaurant"
            );
            ApiError::DatabaseError(e)
        })?;

    match updated {
        Some(restaurant) => {
            info!(user_id = %authed.id, restaurant_id = %restaurant_id, "Restaurant updated");
            Ok(Json(restaurant))
        }
        None => Err(not_found()),
    }
}

/// DELETE /user/restaurants/:id
pub async fn delete_restaurant(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(restaurant_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let state = state_lock.read().await.clone();

    let deleted = state
        .restaurants
        .delete(&restaurant_id, &authed.id)
        .await
        .map_err(|e| {
            error!(
                error = %e,
                user_id = %authed.id,
                restaurant_id = %restaurant_id,
                "Database error deleting restaurant"
            );
            ApiError::DatabaseError(e)
        })?;

    if !deleted {
        return Err(not_found());
    }

    info!(user_id = %authed.id, restaurant_id = %restaurant_id, "Restaurant deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /user/tags - Tags used across the user's restaurants
pub async fn list_tags(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
) -> Result<Json<TagSummary>, ApiError> {
    let state = state_lock.read().await.clone();

    let tags = state.restaurants.tags(&authed.id).await?;
    Ok(Json(tags))
}
