// src/restaurants/repository.rs
//
// User-scoped queries over the restaurants table. Every statement filters on
// user_id, so a restaurant owned by someone else reads exactly like one that
// does not exist.

use sqlx::SqlitePool;
use std::collections::BTreeSet;
use tracing::debug;
use uuid::Uuid;

use super::models::{
    rating_to_half_points, CreateRestaurant, Restaurant, RestaurantPatch, RestaurantRow,
    TagSummary,
};
use crate::common::helpers::{normalize_tags, tags_to_column};

const SELECT_COLUMNS: &str = "SELECT id, user_id, name, address, latitude, longitude, rating_half_points, price_range, descriptors, menu_items, notes, created_at, updated_at FROM restaurants";

#[derive(Clone)]
pub struct RestaurantRepository {
    pool: SqlitePool,
}

impl RestaurantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<Restaurant>, sqlx::Error> {
        let rows = sqlx::query_as::<_, RestaurantRow>(&format!(
            "{} WHERE user_id = ? ORDER BY created_at, id",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Restaurant::from).collect())
    }

    pub async fn get(&self, id: &str, user_id: &str) -> Result<Option<Restaurant>, sqlx::Error> {
        let row = sqlx::query_as::<_, RestaurantRow>(&format!(
            "{} WHERE id = ? AND user_id = ?",
            SELECT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Restaurant::from))
    }

    /// Inserts an already validated restaurant
    pub async fn create(
        &self,
        user_id: &str,
        data: &CreateRestaurant,
    ) -> Result<Restaurant, sqlx::Error> {
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO restaurants (id, user_id, name, address, latitude, longitude, rating_half_points, price_range, descriptors, menu_items, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(data.name.trim())
        .bind(data.address.as_deref())
        .bind(data.latitude)
        .bind(data.longitude)
        .bind(data.rating.map(rating_to_half_points))
        .bind(data.price_range)
        .bind(tags_to_column(&normalize_tags(&data.descriptors)))
        .bind(tags_to_column(&normalize_tags(&data.menu_items)))
        .bind(data.notes.as_deref())
        .execute(&self.pool)
        .await?;

        debug!(user_id = %user_id, restaurant_id = %id, "Inserted restaurant");

        let row = sqlx::query_as::<_, RestaurantRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(&id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    /// Applies an already validated patch. `None` when the restaurant does
    /// not exist for this user.
    pub async fn update(
        &self,
        id: &str,
        user_id: &str,
        patch: &RestaurantPatch,
    ) -> Result<Option<Restaurant>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, RestaurantRow>(&format!(
            "{} WHERE id = ? AND user_id = ?",
            SELECT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut row) = existing else {
            return Ok(None);
        };

        apply_patch(&mut row, patch);

        sqlx::query(
            r#"
            UPDATE restaurants
            SET name = ?, address = ?, latitude = ?, longitude = ?, rating_half_points = ?,
                price_range = ?, descriptors = ?, menu_items = ?, notes = ?,
                updated_at = datetime('now')
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&row.name)
        .bind(row.address.as_deref())
        .bind(row.latitude)
        .bind(row.longitude)
        .bind(row.rating_half_points)
        .bind(row.price_range)
        .bind(row.descriptors.as_deref())
        .bind(row.menu_items.as_deref())
        .bind(row.notes.as_deref())
        .bind(id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let updated = sqlx::query_as::<_, RestaurantRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(updated.into()))
    }

    /// `false` when nothing was deleted
    pub async fn delete(&self, id: &str, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM restaurants WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn tags(&self, user_id: &str) -> Result<TagSummary, sqlx::Error> {
        let restaurants = self.list(user_id).await?;

        let mut descriptors = BTreeSet::new();
        let mut menu_items = BTreeSet::new();
        for restaurant in restaurants {
            descriptors.extend(restaurant.descriptors);
            menu_items.extend(restaurant.menu_items);
        }

        Ok(TagSummary {
            descriptors: descriptors.into_iter().collect(),
            menu_items: menu_items.into_iter().collect(),
        })
    }
}

fn apply_patch(row: &mut RestaurantRow, patch: &RestaurantPatch) {
    if let Some(name) = &patch.name {
        row.name = name.trim().to_string();
    }
    if let Some(address) = &patch.address {
        row.address = address.clone();
    }
    if let (Some(latitude), Some(longitude)) = (patch.latitude, patch.longitude) {
        row.latitude = latitude;
        row.longitude = longitude;
    }
    if let Some(rating) = patch.rating {
        row.rating_half_points = rating.map(rating_to_half_points);
    }
    if let Some(price_range) = patch.price_range {
        row.price_range = price_range;
    }
    if let Some(descriptors) = &patch.descriptors {
        row.descriptors = Some(tags_to_column(&normalize_tags(descriptors)));
    }
    if let Some(menu_items) = &patch.menu_items {
        row.menu_items = Some(tags_to_column(&normalize_tags(menu_items)));
    }
    if let Some(notes) = &patch.notes {
        row.notes = notes.clone();
    }
}
