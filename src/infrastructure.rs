//! Infrastructure layer for HTTP access, HTML parsing and icon output
//!
//! Everything that touches the network, the filesystem or raw HTML lives
//! here; the application layer only sees domain records and trait seams.

pub mod config;
pub mod http_client;
pub mod icon_store;
pub mod logging;
pub mod parsing;

// Re-export commonly used items
pub use config::{ScraperConfig, SourceConfig, WorkerConfig};
pub use http_client::{HttpClient, HttpClientConfig};
pub use icon_store::IconStore;
pub use logging::init_logging;
pub use parsing::{EntityPageParser, ScrapeError, UpgradeExtractor};
