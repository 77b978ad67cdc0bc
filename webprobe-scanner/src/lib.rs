pub mod audit;
pub mod crawler;
pub mod detectors;
pub mod error;
pub mod finding;
pub mod frontier;
pub mod http;
pub mod result;
pub mod stats;
pub mod target;

pub use audit::audit_security_headers;
pub use crawler::{Crawler, ProgressCallback};
pub use detectors::{Detector, default_detectors};
pub use error::ScanError;
pub use finding::{Category, Finding};
pub use http::{HttpClient, HttpResponse};
pub use result::{CrawlOutcome, CrawlResult};
pub use stats::{Cancellation, ScanStats, StatsSnapshot};
pub use target::{ScanConfig, Target};
