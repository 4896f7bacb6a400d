// src/restaurants/routes.rs

use axum::{routing::get, Router};

use super::handlers;

pub fn restaurants_routes() -> Router {
    Router::new()
        .route(
            "/user/restaurants",
            get(handlers::list_restaurants).post(handlers::create_restaurant),
        )
        .route(
            "/user/restaurants/:id",
            get(handlers::get_restaurant)
                .put(handlers::update_restaurant)
                .delete(handlers::delete_restaurant),
        )
        .route("/user/tags", get(handlers::list_tags))
}
