//! Scraping service layer trait definitions
//!
//! The orchestrator and parsers are written against these seams so the
//! pipeline can run on fixture pages in tests.

use anyhow::Result;
use async_trait::async_trait;

/// Fetches wiki pages and raw image bytes.
///
/// Implemented by the rate-limited HTTP client in production and by
/// in-memory fixtures in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page and return its HTML body.
    async fn fetch_html(&self, url: &str) -> Result<String>;

    /// Fetch raw bytes, used for icon downloads.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;
}
