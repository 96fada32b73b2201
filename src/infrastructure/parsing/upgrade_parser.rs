//! Upgrade extraction from entity pages
//!
//! Sections under "upgrade" headings are collected element by element and
//! run through an ordered rule table. The tiered rule is tried first so a
//! leveled upgrade is never miscounted as several flat ones; the matched
//! rule is logged per record for auditability.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::domain::entities::{EntityRef, ResearchCost, Upgrade};
use crate::infrastructure::parsing::{element_text, icon_matcher};

/// Runaway-section guard: at most this many elements are collected after
/// one heading.
const SECTION_ELEMENT_CAP: usize = 20;

static HEADINGS: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));

static TIERED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][A-Za-z\s]*?)\s+Level\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)(?:Hotkey:\s*([A-Z]))?")
        .expect("valid regex")
});
static FLAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Z][A-Za-z\s]*?)\s+(\d+)\s+(\d+)\s+(\d+)(?:Hotkey:\s*([A-Z]))?")
        .expect("valid regex")
});

/// One entry of the pattern rule table, tried in order per element; the
/// first rule producing records wins the element.
struct UpgradeRule {
    name: &'static str,
    tiered: bool,
    pattern: &'static Lazy<Regex>,
}

static UPGRADE_RULES: &[UpgradeRule] = &[
    UpgradeRule { name: "tiered-level", tiered: true, pattern: &TIERED_RE },
    UpgradeRule { name: "flat", tiered: false, pattern: &FLAT_RE },
];

/// Extracts upgrade records from the "upgrade" sections of an entity page.
pub struct UpgradeExtractor {
    base_image_url: Url,
}

impl UpgradeExtractor {
    pub fn new(base_image_url: &str) -> Result<Self> {
        let base_image_url = Url::parse(base_image_url)
            .with_context(|| format!("invalid base image URL: {base_image_url}"))?;
        Ok(Self { base_image_url })
    }

    /// All upgrade records found on the page, back-referenced to `entity`.
    pub fn extract(&self, html: &Html, entity: &EntityRef) -> Vec<Upgrade> {
        let mut upgrades = Vec::new();

        for heading in html.select(&HEADINGS) {
            if !element_text(&heading).to_lowercase().contains("upgrade") {
                continue;
            }
            let section = collect_section_elements(heading);
            if section.is_empty() {
                continue;
            }
            upgrades.extend(self.parse_section(&section, entity));
        }

        upgrades
    }

    fn parse_section(&self, section: &[ElementRef], entity: &EntityRef) -> Vec<Upgrade> {
        // Candidate pool for the similarity fallback is the whole section.
        let section_icons = icon_matcher::collect_candidate_icons(section, &self.base_image_url);

        let mut upgrades = Vec::new();
        for element in section {
            let text = element_text(element);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            for rule in UPGRADE_RULES {
                let records = self.apply_rule(rule, text, *element, &section_icons, entity);
                if !records.is_empty() {
                    upgrades.extend(records);
                    break;
                }
            }
        }
        upgrades
    }

    fn apply_rule(
        &self,
        rule: &UpgradeRule,
        text: &str,
        element: ElementRef,
        section_icons: &[(String, String)],
        entity: &EntityRef,
    ) -> Vec<Upgrade> {
        let mut records = Vec::new();

        for caps in rule.pattern.captures_iter(text) {
            let upgrade = if rule.tiered {
                let base_name = caps[1].trim().to_string();
                let Ok(level) = caps[2].parse::<u32>() else {
                    continue;
                };
                let name = format!("{base_name} Level {level}");
                let icon_url = self
                    .resolve_tiered_icon(element, &base_name, level, &name, section_icons);

                Upgrade {
                    key: Upgrade::tiered_key(&base_name, level, entity.race),
                    name,
                    base_name: Some(base_name),
                    level: Some(level),
                    race: entity.race,
                    cost: ResearchCost {
                        minerals: caps[3].parse().unwrap_or(0),
                        gas: caps[4].parse().unwrap_or(0),
                        research_time: caps[5].parse().unwrap_or(0),
                    },
                    affects_units: vec![entity.name.clone()],
                    research_building: Some(entity.name.clone()),
                    hotkey: caps.get(6).and_then(|m| m.as_str().chars().next()),
                    icon_url,
                }
            } else {
                let name = caps[1].trim().to_string();
                // A leveled name that slipped past the tiered rule is noise
                if name.len() < 3 || name.to_lowercase().contains("level") {
                    continue;
                }

                Upgrade {
                    key: Upgrade::flat_key(&name, entity.race),
                    base_name: None,
                    level: None,
                    race: entity.race,
                    cost: ResearchCost {
                        minerals: caps[2].parse().unwrap_or(0),
                        gas: caps[3].parse().unwrap_or(0),
                        research_time: caps[4].parse().unwrap_or(0),
                    },
                    affects_units: vec![entity.name.clone()],
                    research_building: Some(entity.name.clone()),
                    hotkey: caps.get(5).and_then(|m| m.as_str().chars().next()),
                    icon_url: icon_matcher::first_icon_in_element(element, &self.base_image_url),
                    name,
                }
            };

            debug!(rule = rule.name, upgrade = %upgrade.name, entity = %entity.name, "upgrade pattern matched");
            records.push(upgrade);
        }

        records
    }

    fn resolve_tiered_icon(
        &self,
        element: ElementRef,
        base_name: &str,
        level: u32,
        name: &str,
        section_icons: &[(String, String)],
    ) -> Option<String> {
        if let Some(icon) =
            icon_matcher::positional_tiered_icon(element, base_name, level, &self.base_image_url)
        {
            return Some(icon);
        }
        let fallback = icon_matcher::match_icon_by_tokens(name, section_icons);
        if fallback.is_some() {
            debug!(upgrade = %name, strategy = "token-similarity", "icon resolved via fallback");
        }
        fallback
    }
}

/// Walk following siblings of a heading until the next heading of any
/// rank, collecting prose elements and table data rows.
fn collect_section_elements(heading: ElementRef) -> Vec<ElementRef<'_>> {
    let mut elements = Vec::new();

    'siblings: for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        match sibling.value().name() {
            "h1" | "h2" | "h3" | "h4" | "h5" => break,
            "p" | "div" => {
                if !element_text(&sibling).trim().is_empty() {
                    elements.push(sibling);
                }
            }
            "table" => {
                // Header row is not upgrade data
                for row in sibling.select(&ROW).skip(1) {
                    elements.push(row);
                    if elements.len() >= SECTION_ELEMENT_CAP {
                        break 'siblings;
                    }
                }
            }
            _ => {}
        }
        if elements.len() >= SECTION_ELEMENT_CAP {
            break;
        }
    }

    elements
}
