//! Domain models for the Farmdesk client

mod advisory;
mod farm;
mod farmer;
mod location;

pub use advisory::*;
pub use farm::*;
pub use farmer::*;
pub use location::*;
