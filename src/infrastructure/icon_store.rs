//! Icon persistence: download, JPEG re-encode and directory layout
//!
//! Icons are always re-encoded to JPEG; sources with an alpha channel are
//! composited onto a white background first. Files land at
//! `icons/<race>/<kind>s/<normalized_name>.jpg` and
//! `icons/<race>/upgrades/<normalized_upgrade_name>.jpg`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage};
use tokio::task;
use tracing::debug;

use crate::domain::entities::{EntityKind, Race, normalize_name};
use crate::domain::services::PageFetcher;

const JPEG_QUALITY: u8 = 95;

/// Writes downloaded icons into the race/kind directory tree.
pub struct IconStore {
    icons_dir: PathBuf,
}

impl IconStore {
    pub fn new(output_dir: &Path) -> Self {
        Self { icons_dir: output_dir.join("icons") }
    }

    /// Download and store the icon of a unit or building.
    pub async fn save_entity_icon(
        &self,
        fetcher: &dyn PageFetcher,
        icon_url: &str,
        name: &str,
        race: Race,
        kind: EntityKind,
    ) -> Result<PathBuf> {
        let path = self
            .icons_dir
            .join(race.as_str())
            .join(kind.plural())
            .join(format!("{}.jpg", normalize_name(name)));
        self.download_as_jpeg(fetcher, icon_url, path).await
    }

    /// Download and store an upgrade icon.
    pub async fn save_upgrade_icon(
        &self,
        fetcher: &dyn PageFetcher,
        icon_url: &str,
        upgrade_name: &str,
        race: Race,
    ) -> Result<PathBuf> {
        let path = self
            .icons_dir
            .join(race.as_str())
            .join("upgrades")
            .join(format!("{}.jpg", upgrade_file_stem(upgrade_name)));
        self.download_as_jpeg(fetcher, icon_url, path).await
    }

    async fn download_as_jpeg(
        &self,
        fetcher: &dyn PageFetcher,
        url: &str,
        path: PathBuf,
    ) -> Result<PathBuf> {
        let bytes = fetcher.fetch_bytes(url).await?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("cannot create icon directory {}", parent.display()))?;
        }

        let target = path.clone();
        task::spawn_blocking(move || encode_jpeg(&bytes, &target))
            .await
            .context("icon encode task panicked")??;

        debug!(path = %path.display(), "icon stored");
        Ok(path)
    }
}

/// Filename stem for upgrade icons; level suffixes collapse so
/// "Infantry Weapons Level 1" becomes `infantry_weapons_level1`.
fn upgrade_file_stem(upgrade_name: &str) -> String {
    normalize_name(upgrade_name).replace("level_", "level")
}

fn encode_jpeg(bytes: &[u8], path: &Path) -> Result<()> {
    let image = image::load_from_memory(bytes).context("unsupported icon image data")?;
    let rgb = flatten_onto_white(image);

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("cannot create icon file {}", path.display()))?;
    let encoder = JpegEncoder::new_with_quality(&mut file, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .with_context(|| format!("JPEG encode failed for {}", path.display()))?;
    Ok(())
}

/// Composite any alpha channel onto a white background.
fn flatten_onto_white(image: DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    let mut rgb = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u32::from(pixel[3]);
        let blend = |channel: u8| -> u8 {
            ((u32::from(channel) * alpha + 255 * (255 - alpha)) / 255) as u8
        };
        rgb.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    rgb
}
