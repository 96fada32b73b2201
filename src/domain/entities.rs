//! Entity and upgrade records produced by the scraping pipeline.
//!
//! Field names mirror the persisted JSON artifact, which the timeline
//! editor frontend consumes as-is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Playable race a scraped record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Race {
    Protoss,
    Terran,
    Zerg,
}

impl Race {
    /// Statistics tables appear on the source pages in this fixed order.
    pub const ALL: [Race; 3] = [Race::Protoss, Race::Terran, Race::Zerg];

    pub fn as_str(self) -> &'static str {
        match self {
            Race::Protoss => "protoss",
            Race::Terran => "terran",
            Race::Zerg => "zerg",
        }
    }
}

impl fmt::Display for Race {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a scraped entity is a unit or a building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Unit,
    Building,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Unit => "unit",
            EntityKind::Building => "building",
        }
    }

    /// Directory segment used for icon output (`units` / `buildings`).
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Unit => "units",
            EntityKind::Building => "buildings",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a display name into a stable key / filename stem.
///
/// Lowercases and replaces spaces with underscores; hyphens are kept, so
/// "Auto-Turret" stays `auto-turret` while "Planetary Fortress" becomes
/// `planetary_fortress`.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Reference to an entity discovered on a statistics page.
///
/// Immutable once listed; the detail phase consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub name: String,
    pub href: String,
    /// Last path segment of `href`; absent when the row carried no page link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub race: Race,
}

/// Build cost block of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub minerals: u32,
    pub gas: u32,
    /// Unset when the source lists only a two-number mineral/gas cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_time: Option<u32>,
}

/// Fully scraped entity record, keyed by [`Entity::key`] within its race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub race: Race,
    pub page_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(flatten)]
    pub cost: Option<Cost>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub produces: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlocks: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shields: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub armor: Option<u32>,
}

impl Entity {
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Research cost block of an upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchCost {
    pub minerals: u32,
    pub gas: u32,
    pub research_time: u32,
}

/// A research-unlockable modifier, possibly one level of a tiered family.
///
/// Sightings of the same logical upgrade on different entity pages share an
/// aggregation `key` and are merged by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upgrade {
    pub name: String,
    /// Family name for tiered upgrades ("Infantry Weapons" for level 1-3).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    pub race: Race,
    #[serde(flatten)]
    pub cost: ResearchCost,
    /// Names of entities whose pages list this upgrade; deduplicated union
    /// after aggregation, insertion order preserved.
    pub affects_units: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub research_building: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hotkey: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub key: String,
}

impl Upgrade {
    /// Aggregation key for one level of a tiered upgrade family.
    pub fn tiered_key(base_name: &str, level: u32, race: Race) -> String {
        format!("{}_level_{}_{}", normalize_name(base_name), level, race)
    }

    /// Aggregation key for a flat (unleveled) upgrade.
    pub fn flat_key(name: &str, race: Race) -> String {
        format!("{}_{}", normalize_name(name), race)
    }
}

/// Everything scraped for one race.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceDataset {
    pub entities: Vec<EntityRef>,
    pub detailed_data: BTreeMap<String, Entity>,
    pub upgrades: BTreeMap<String, Upgrade>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeMetadata {
    /// Unix timestamp (seconds) of the scrape run.
    pub scrape_timestamp: f64,
    /// Sum of listed entity references across all races.
    pub total_entities: usize,
}

/// The sole persisted artifact of a scrape run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub metadata: ScrapeMetadata,
    pub races: BTreeMap<Race, RaceDataset>,
}
