//! External integrations: the backend REST API and GPS receivers

pub mod farm_api;
pub mod gps;

pub use farm_api::{ApiClient, FarmApi};
pub use gps::{ChannelLocationSource, NmeaLocationSource};
