// src/restaurants/mod.rs

pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod validators;


pub use models::{CreateRestaurant, Restaurant, RestaurantPatch, TagSummary};
pub use repository::RestaurantRepository;
pub use routes::restaurants_routes;
