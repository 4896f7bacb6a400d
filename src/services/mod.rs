// src/services/mod.rs
//
// Integrations with external services

pub mod google;

pub use google::GoogleService;
