//! Client services for the Farmdesk field agent tools

pub mod advisory;
pub mod cache;
pub mod capture;
pub mod composer;
pub mod directory;
pub mod drafts;
pub mod farmer;
pub mod location;
pub mod report;

pub use advisory::{AdvisoryPage, AdvisoryService};
pub use cache::TtlCache;
pub use capture::{trace_boundary, DrawSession, LocationSource, PositionWatch, TraceSession};
pub use composer::FarmComposer;
pub use directory::{FarmerDirectory, MapLayer, SearchController, TileProvider};
pub use drafts::DraftStore;
pub use farmer::FarmerService;
pub use location::LocationService;
pub use report::{ExportFormat, ReportExporter};
