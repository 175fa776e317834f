//! Shared types and models for Farmdesk
//!
//! This crate contains types shared between the API client, the browser
//! bindings (via WASM), and other components of the system.

pub mod geometry;
pub mod models;
pub mod types;
pub mod validation;

pub use geometry::*;
pub use models::*;
pub use types::*;
pub use validation::*;
