//! Scraper configuration
//!
//! Configuration is organized into two tiers: worker/timing knobs the CLI
//! exposes, and source-site constants that only change when the wiki moves.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use crate::domain::entities::EntityKind;

/// Complete scraper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Directory receiving the JSON artifact and the `icons/` tree
    pub output_dir: PathBuf,

    /// Worker pool and timing settings
    pub workers: WorkerConfig,

    /// Source site addresses and page identifiers
    pub source: SourceConfig,
}

/// Worker pool and timing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum concurrent entity-page tasks
    pub max_workers: usize,

    /// Courtesy delay a worker holds its pool slot after finishing, in ms
    pub request_delay_ms: u64,

    /// Per-request timeout in seconds
    pub request_timeout_seconds: u64,

    /// Token-bucket ceiling for outgoing requests
    pub max_requests_per_second: u32,
}

/// Source site addresses and page identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL wiki page names are resolved against
    pub base_page_url: String,

    /// Base URL relative image srcs are resolved against
    pub base_image_url: String,

    /// Fixed User-Agent sent with every request
    pub user_agent: String,

    /// Statistics page listing all units per race
    pub unit_statistics_page: String,

    /// Statistics page listing all buildings per race
    pub building_statistics_page: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("assets"),
            workers: WorkerConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            request_delay_ms: 1000,
            request_timeout_seconds: 30,
            max_requests_per_second: 5,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_page_url: "https://liquipedia.net/starcraft2/".to_string(),
            base_image_url: "https://liquipedia.net".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            unit_statistics_page: "Unit_Statistics_(Legacy_of_the_Void)".to_string(),
            building_statistics_page: "Building_Statistics_(Legacy_of_the_Void)".to_string(),
        }
    }
}

impl ScraperConfig {
    /// Clamp out-of-range values instead of failing; a misconfigured run
    /// should degrade to safe settings, not abort.
    #[must_use]
    pub fn validated(mut self) -> Self {
        self.workers.max_workers = self.workers.max_workers.clamp(1, 32);
        self.workers.max_requests_per_second = self.workers.max_requests_per_second.max(1);
        self.workers.request_timeout_seconds = self.workers.request_timeout_seconds.clamp(1, 300);
        self
    }

    /// Statistics page identifier for one entity kind.
    pub fn statistics_page(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Unit => &self.source.unit_statistics_page,
            EntityKind::Building => &self.source.building_statistics_page,
        }
    }

    /// Resolve a wiki page name against the base page URL.
    pub fn page_url(&self, page_name: &str) -> Result<String> {
        let base = Url::parse(&self.source.base_page_url)
            .with_context(|| format!("invalid base page URL: {}", self.source.base_page_url))?;
        let joined = base
            .join(page_name)
            .with_context(|| format!("cannot resolve page name: {page_name}"))?;
        Ok(joined.into())
    }
}
