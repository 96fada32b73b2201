//! StarCraft II wiki scraping pipeline
//!
//! Scrapes unit and building statistics pages plus per-entity pages from
//! Liquipedia, normalizes them into a unified entity/upgrade dataset and
//! persists a single JSON artifact consumed by the build-order timeline
//! editor.

pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the types most callers need
pub use application::orchestrator::{OUTPUT_FILE_NAME, ScrapeOrchestrator};
pub use domain::entities::{Entity, EntityRef, Race, ScrapeResult, Upgrade};
pub use infrastructure::config::ScraperConfig;
pub use infrastructure::http_client::{HttpClient, HttpClientConfig};
