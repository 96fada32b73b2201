//! Four-phase scrape engine
//!
//! Phase 1 lists entity references from the statistics pages. Phase 2
//! fetches every entity page on a bounded worker pool, extracting the
//! detailed record and raw upgrades from one fetch. Phase 3 aggregates
//! upgrades per race and dispatches icon downloads. Phase 4 persists the
//! assembled result as one atomic JSON write.
//!
//! A single entity failing degrades completeness, never correctness; only
//! cancellation aborts the run, and an aborted run persists nothing.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::join_all;
use scraper::Html;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::aggregator::aggregate_upgrades;
use crate::domain::entities::{
    Entity, EntityKind, EntityRef, Race, RaceDataset, ScrapeMetadata, ScrapeResult, Upgrade,
};
use crate::domain::services::PageFetcher;
use crate::infrastructure::config::ScraperConfig;
use crate::infrastructure::icon_store::IconStore;
use crate::infrastructure::parsing::{
    EntityPageParser, ScrapeError, UpgradeExtractor, statistics_parser,
};

pub const OUTPUT_FILE_NAME: &str = "sc2_comprehensive_data.json";

/// Coordinates listing, concurrent detail scraping, aggregation and
/// persistence.
pub struct ScrapeOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    entity_parser: Arc<EntityPageParser>,
    upgrade_extractor: Arc<UpgradeExtractor>,
    icon_store: IconStore,
    config: ScraperConfig,
    cancellation: CancellationToken,
}

impl ScrapeOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        config: ScraperConfig,
        cancellation: CancellationToken,
    ) -> Result<Self> {
        Ok(Self {
            entity_parser: Arc::new(EntityPageParser::new(&config.source.base_image_url)?),
            upgrade_extractor: Arc::new(UpgradeExtractor::new(&config.source.base_image_url)?),
            icon_store: IconStore::new(&config.output_dir),
            fetcher,
            config,
            cancellation,
        })
    }

    /// Run all four phases and persist the artifact.
    pub async fn run(&self) -> Result<ScrapeResult> {
        let result = self.scrape_all().await?;
        if self.cancellation.is_cancelled() {
            return Err(ScrapeError::Cancelled.into());
        }
        self.persist(&result).await?;
        Ok(result)
    }

    /// Phases 1-3; assembles the in-memory result without persisting it.
    pub async fn scrape_all(&self) -> Result<ScrapeResult> {
        let unit_refs = self.list_entities(EntityKind::Unit).await;
        let building_refs = self.list_entities(EntityKind::Building).await;

        let mut races: BTreeMap<Race, RaceDataset> = BTreeMap::new();
        for race in Race::ALL {
            let mut entities = unit_refs.get(&race).cloned().unwrap_or_default();
            entities.extend(building_refs.get(&race).cloned().unwrap_or_default());
            races.insert(race, RaceDataset { entities, ..RaceDataset::default() });
        }
        let total_entities: usize = races.values().map(|d| d.entities.len()).sum();
        info!(total_entities, "entity references collected");

        for (race, dataset) in races.iter_mut() {
            if self.cancellation.is_cancelled() {
                return Err(ScrapeError::Cancelled.into());
            }
            info!(race = %race, entities = dataset.entities.len(), "scraping entity details");

            let (detailed, raw_upgrades) = self.collect_entity_details(&dataset.entities).await;
            let raw_count = raw_upgrades.len();
            dataset.detailed_data = detailed;
            dataset.upgrades = aggregate_upgrades(raw_upgrades);
            info!(
                race = %race,
                detailed = dataset.detailed_data.len(),
                upgrades = dataset.upgrades.len(),
                raw_upgrades = raw_count,
                "race dataset assembled"
            );

            self.download_icons(*race, dataset).await;
        }

        if self.cancellation.is_cancelled() {
            return Err(ScrapeError::Cancelled.into());
        }

        Ok(ScrapeResult {
            metadata: ScrapeMetadata {
                scrape_timestamp: chrono::Utc::now().timestamp_millis() as f64 / 1000.0,
                total_entities,
            },
            races,
        })
    }

    /// Phase 1: one statistics page per entity kind. A fetch failure
    /// yields empty lists for that kind, never an abort.
    async fn list_entities(&self, kind: EntityKind) -> BTreeMap<Race, Vec<EntityRef>> {
        let empty = || Race::ALL.iter().map(|race| (*race, Vec::new())).collect();

        let page = self.config.statistics_page(kind);
        let url = match self.config.page_url(page) {
            Ok(url) => url,
            Err(error) => {
                warn!(kind = %kind, error = ?error, "invalid statistics page URL");
                return empty();
            }
        };

        info!(kind = %kind, url = %url, "listing entities");
        match self.fetcher.fetch_html(&url).await {
            Ok(body) => {
                let html = Html::parse_document(&body);
                statistics_parser::parse_statistics_page(&html, kind)
            }
            Err(error) => {
                warn!(kind = %kind, error = ?error, "statistics page fetch failed, continuing with empty list");
                empty()
            }
        }
    }

    /// Phase 2: one task per entity on a semaphore-bounded pool. Each
    /// worker holds its slot through the courtesy delay so pacing stays
    /// bounded across the whole pool.
    async fn collect_entity_details(
        &self,
        entities: &[EntityRef],
    ) -> (BTreeMap<String, Entity>, Vec<Upgrade>) {
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max_workers));
        let delay = Duration::from_millis(self.config.workers.request_delay_ms);
        let mut tasks = Vec::new();

        for entity in entities.iter().cloned() {
            if self.cancellation.is_cancelled() {
                warn!("cancellation requested, not submitting further entity tasks");
                break;
            }
            let Some(page_name) = entity.page_name.clone() else {
                warn!(entity = %entity.name, "entity reference has no source page, skipping");
                continue;
            };
            let page_url = match self.config.page_url(&page_name) {
                Ok(url) => url,
                Err(error) => {
                    warn!(entity = %entity.name, error = ?error, "cannot build page URL, skipping");
                    continue;
                }
            };

            let fetcher = Arc::clone(&self.fetcher);
            let parser = Arc::clone(&self.entity_parser);
            let extractor = Arc::clone(&self.upgrade_extractor);
            let semaphore = Arc::clone(&semaphore);
            let cancellation = self.cancellation.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.context("worker pool closed")?;
                if cancellation.is_cancelled() {
                    return Err(ScrapeError::Cancelled.into());
                }

                let body = fetcher
                    .fetch_html(&page_url)
                    .await
                    .with_context(|| format!("fetching page for {}", entity.name))?;

                // One fetch, two consumers: the info panel and the
                // upgrade sections come from the same document.
                let (record, upgrades) = {
                    let html = Html::parse_document(&body);
                    (
                        parser.parse(&html, &entity, &page_url),
                        extractor.extract(&html, &entity),
                    )
                };

                if !delay.is_zero() && !cancellation.is_cancelled() {
                    tokio::time::sleep(delay).await;
                }

                Ok::<_, anyhow::Error>((entity, record, upgrades))
            }));
        }

        let mut detailed = BTreeMap::new();
        let mut raw_upgrades = Vec::new();
        for result in join_all(tasks).await {
            match result {
                Ok(Ok((entity, record, upgrades))) => {
                    if !upgrades.is_empty() {
                        debug!(entity = %entity.name, count = upgrades.len(), "upgrades found");
                        raw_upgrades.extend(upgrades);
                    }
                    match record {
                        Some(record) => {
                            detailed.insert(record.key(), record);
                        }
                        None => debug!(entity = %entity.name, "no entity record extracted"),
                    }
                }
                Ok(Err(error)) => warn!(error = ?error, "entity task failed"),
                Err(error) => warn!(error = ?error, "entity task panicked"),
            }
        }

        (detailed, raw_upgrades)
    }

    /// Phase 3 icon dispatch; failures are logged and never fatal.
    async fn download_icons(&self, race: Race, dataset: &RaceDataset) {
        for entity in dataset.detailed_data.values() {
            if self.cancellation.is_cancelled() {
                return;
            }
            let Some(icon_url) = &entity.icon_url else {
                continue;
            };
            match self
                .icon_store
                .save_entity_icon(self.fetcher.as_ref(), icon_url, &entity.name, race, entity.kind)
                .await
            {
                Ok(path) => debug!(entity = %entity.name, path = %path.display(), "entity icon stored"),
                Err(error) => warn!(entity = %entity.name, error = ?error, "entity icon download failed"),
            }
        }

        for upgrade in dataset.upgrades.values() {
            if self.cancellation.is_cancelled() {
                return;
            }
            let Some(icon_url) = &upgrade.icon_url else {
                continue;
            };
            match self
                .icon_store
                .save_upgrade_icon(self.fetcher.as_ref(), icon_url, &upgrade.name, race)
                .await
            {
                Ok(path) => debug!(upgrade = %upgrade.name, path = %path.display(), "upgrade icon stored"),
                Err(error) => warn!(upgrade = %upgrade.name, error = ?error, "upgrade icon download failed"),
            }
        }
    }

    /// Phase 4: single atomic write via a temp file rename.
    async fn persist(&self, result: &ScrapeResult) -> Result<()> {
        let output_dir = &self.config.output_dir;
        tokio::fs::create_dir_all(output_dir)
            .await
            .with_context(|| format!("cannot create output directory {}", output_dir.display()))?;

        let path = self.output_path();
        let tmp = output_dir.join(format!("{OUTPUT_FILE_NAME}.tmp"));
        let json = serde_json::to_vec_pretty(result).context("serializing scrape result")?;

        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("renaming {} into place", tmp.display()))?;

        info!(path = %path.display(), "scrape artifact written");
        Ok(())
    }

    /// Where [`ScrapeOrchestrator::run`] writes the artifact.
    pub fn output_path(&self) -> PathBuf {
        self.config.output_dir.join(OUTPUT_FILE_NAME)
    }
}
