//! Farmdesk field agent client
//!
//! Boundary capture, farm record composition, advisory reports and the
//! farmer directory, all talking to the Farmdesk REST API.

pub mod config;
pub mod error;
pub mod external;
pub mod services;
pub mod session;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use session::Session;
