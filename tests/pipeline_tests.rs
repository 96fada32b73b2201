//! End-to-end pipeline tests over fixture pages.
//!
//! A fixture fetcher stands in for the HTTP client so the full
//! listing -> detail -> aggregation -> persistence flow runs without any
//! network access.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use sc2_data_scraper::application::{OUTPUT_FILE_NAME, ScrapeOrchestrator};
use sc2_data_scraper::domain::entities::{Cost, Race};
use sc2_data_scraper::domain::services::PageFetcher;
use sc2_data_scraper::infrastructure::config::ScraperConfig;

const UNIT_STATS_URL: &str =
    "https://liquipedia.net/starcraft2/Unit_Statistics_(Legacy_of_the_Void)";

#[derive(Default)]
struct FixtureFetcher {
    pages: HashMap<String, String>,
    images: HashMap<String, Vec<u8>>,
}

impl FixtureFetcher {
    fn with_page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    fn with_image(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(url.to_string(), bytes);
        self
    }
}

#[async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture page for {url}"))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture image for {url}"))
    }
}

fn test_config(output_dir: &Path) -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.output_dir = output_dir.to_path_buf();
    config.workers.request_delay_ms = 0;
    config.workers.max_workers = 3;
    config
}

fn orchestrator(fetcher: FixtureFetcher, output_dir: &Path) -> ScrapeOrchestrator {
    ScrapeOrchestrator::new(
        Arc::new(fetcher),
        test_config(output_dir),
        CancellationToken::new(),
    )
    .unwrap()
}

/// Statistics page with empty Protoss/Zerg tables and the given Terran rows.
fn unit_statistics_page(terran_rows: &str) -> String {
    format!(
        r#"<html><body>
        <table class="wikitable"><tr><th>Unit</th></tr></table>
        <table class="wikitable"><tr><th>Unit</th></tr>{terran_rows}</table>
        <table class="wikitable"><tr><th>Unit</th></tr></table>
        </body></html>"#
    )
}

fn tiny_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        2,
        2,
        image::Rgba([10, 20, 30, 255]),
    ));
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

const MARINE_PAGE: &str = r#"<html><body>
    <div class="fo-nttax-infobox-wrapper infobox-lotv">
        <div class="infobox-image-wrapper">
            <img src="/commons/images/thumb/marine_icon.png">
        </div>
        <div class="infobox-description">Cost:</div>
        <div>50 0 18</div>
    </div>
    </body></html>"#;

#[tokio::test]
async fn marine_scenario_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = FixtureFetcher::default()
        .with_page(
            UNIT_STATS_URL,
            &unit_statistics_page(r#"<tr><td><a href="/Marine">Marine</a></td></tr>"#),
        )
        .with_page("https://liquipedia.net/starcraft2/Marine", MARINE_PAGE)
        .with_image(
            "https://liquipedia.net/commons/images/thumb/marine_icon.png",
            tiny_png(),
        );

    let result = orchestrator(fetcher, dir.path()).run().await.unwrap();

    // Listing
    let terran = &result.races[&Race::Terran];
    assert_eq!(terran.entities.len(), 1);
    assert_eq!(terran.entities[0].name, "Marine");
    assert_eq!(result.metadata.total_entities, 1);
    assert_eq!(
        result.metadata.total_entities,
        result.races.values().map(|d| d.entities.len()).sum::<usize>()
    );

    // Detail extraction
    let marine = &terran.detailed_data["marine"];
    assert_eq!(
        marine.cost,
        Some(Cost { minerals: 50, gas: 0, build_time: Some(18) })
    );
    assert!(terran.upgrades.is_empty());

    // Persisted artifact mirrors the in-memory result
    let raw = std::fs::read_to_string(dir.path().join(OUTPUT_FILE_NAME)).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["races"]["terran"]["entities"][0]["name"], "Marine");
    assert_eq!(json["races"]["terran"]["detailed_data"]["marine"]["minerals"], 50);
    assert_eq!(json["races"]["terran"]["detailed_data"]["marine"]["gas"], 0);
    assert_eq!(json["races"]["terran"]["detailed_data"]["marine"]["build_time"], 18);
    assert_eq!(json["metadata"]["total_entities"], 1);
    assert!(
        json["races"]["terran"]["upgrades"]
            .as_object()
            .unwrap()
            .is_empty()
    );

    // Icon re-encoded as JPEG under the race/kind tree
    let icon = std::fs::read(dir.path().join("icons/terran/units/marine.jpg")).unwrap();
    assert_eq!(&icon[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn shared_upgrades_aggregate_across_entity_pages() {
    const BARRACKS_UNIT_PAGE: &str = r#"<html><body>
        <div class="fo-nttax-infobox-wrapper infobox-lotv">
            <div class="infobox-description">Cost:</div>
            <div>100 25 30</div>
        </div>
        <h3>Upgrades</h3>
        <p>Stimpack 100 100 121Hotkey: T</p>
        </body></html>"#;

    let dir = tempfile::tempdir().unwrap();
    let fetcher = FixtureFetcher::default()
        .with_page(
            UNIT_STATS_URL,
            &unit_statistics_page(
                r#"<tr><td><a href="/Marine">Marine</a></td></tr>
                   <tr><td><a href="/Marauder">Marauder</a></td></tr>"#,
            ),
        )
        .with_page("https://liquipedia.net/starcraft2/Marine", BARRACKS_UNIT_PAGE)
        .with_page("https://liquipedia.net/starcraft2/Marauder", BARRACKS_UNIT_PAGE);

    let result = orchestrator(fetcher, dir.path()).run().await.unwrap();

    let terran = &result.races[&Race::Terran];
    assert_eq!(terran.upgrades.len(), 1);
    let stimpack = &terran.upgrades["stimpack_terran"];
    assert_eq!(stimpack.affects_units.len(), 2);
    assert!(stimpack.affects_units.contains(&"Marine".to_string()));
    assert!(stimpack.affects_units.contains(&"Marauder".to_string()));
    assert_eq!(stimpack.cost.minerals, 100);
    assert_eq!(stimpack.hotkey, Some('T'));
}

#[tokio::test]
async fn failed_statistics_fetch_degrades_to_empty_lists() {
    let dir = tempfile::tempdir().unwrap();
    let result = orchestrator(FixtureFetcher::default(), dir.path())
        .run()
        .await
        .unwrap();

    assert_eq!(result.metadata.total_entities, 0);
    for dataset in result.races.values() {
        assert!(dataset.entities.is_empty());
        assert!(dataset.detailed_data.is_empty());
        assert!(dataset.upgrades.is_empty());
    }
    assert!(dir.path().join(OUTPUT_FILE_NAME).exists());
}

#[tokio::test]
async fn one_failing_entity_does_not_cancel_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = FixtureFetcher::default()
        .with_page(
            UNIT_STATS_URL,
            &unit_statistics_page(
                r#"<tr><td><a href="/Marine">Marine</a></td></tr>
                   <tr><td><a href="/Ghost">Ghost</a></td></tr>"#,
            ),
        )
        .with_page("https://liquipedia.net/starcraft2/Marine", MARINE_PAGE);
    // Ghost's page is missing on purpose

    let result = orchestrator(fetcher, dir.path()).run().await.unwrap();

    let terran = &result.races[&Race::Terran];
    assert_eq!(terran.entities.len(), 2);
    assert_eq!(terran.detailed_data.len(), 1);
    assert!(terran.detailed_data.contains_key("marine"));
    // The listing determined the total before any detail fetch failed
    assert_eq!(result.metadata.total_entities, 2);
}

#[tokio::test]
async fn cancelled_run_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cancellation = CancellationToken::new();
    cancellation.cancel();

    let fetcher = FixtureFetcher::default().with_page(
        UNIT_STATS_URL,
        &unit_statistics_page(r#"<tr><td><a href="/Marine">Marine</a></td></tr>"#),
    );
    let orchestrator =
        ScrapeOrchestrator::new(Arc::new(fetcher), test_config(dir.path()), cancellation).unwrap();

    assert!(orchestrator.run().await.is_err());
    assert!(!dir.path().join(OUTPUT_FILE_NAME).exists());
}
