//! Archived report browsing: listing, ranked detail views, and deletion.

pub mod router;
pub mod service;
pub mod views;


pub use router::report_router;
pub use service::{ReportService, ReportServiceError};
pub use views::{ProductFinancials, RankedEntry, RankedReport};
