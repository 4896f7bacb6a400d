//! # Client Module
//!
//! Headless core of the map frontend:
//! - interaction state machine with scoped popups
//! - marker reconciliation against the latest restaurant list
//! - map surface abstraction and an in-memory surface
//! - REST client and the controller tying them together

pub mod api;
pub mod controller;
pub mod geo;
pub mod markers;
pub mod state;
pub mod surface;

#[cfg(test)]
mod tests;

pub use api::{ClientError, HttpRestaurantApi, RestaurantApi};
pub use controller::MapController;
pub use geo::LngLat;
pub use markers::{MarkerRegistry, ReconcileReport};
pub use state::{next_mode, Event, InteractionState, InteractionStore, Mode};
pub use surface::{HeadlessSurface, MapSurface, PopupHandle, PopupKind};
