//! Entity page parsing: the info panel into a detailed entity record
//!
//! The info panel is a loosely structured block of label/value pairs; all
//! extraction works off label keywords and text slicing rather than a
//! rigid layout, because the source pages drift.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::domain::entities::{Cost, Entity, EntityKind, EntityRef};
use crate::infrastructure::parsing::overrides;
use crate::infrastructure::parsing::{element_text, find_ascii_ci};

const REQUIREMENT_KEYWORDS: &[&str] = &["requirement", "requires"];
const PRODUCES_KEYWORDS: &[&str] = &["builds", "trains", "produces"];
const UNLOCKS_KEYWORDS: &[&str] = &["unlocked tech", "unlocks", "allows", "enables"];

static INFOBOX: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.fo-nttax-infobox-wrapper.infobox-lotv").expect("valid selector"));
static DIV: Lazy<Selector> = Lazy::new(|| Selector::parse("div").expect("valid selector"));
static DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.infobox-description").expect("valid selector"));
static WRAPPER_IMAGE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.infobox-image-wrapper img").expect("valid selector"));

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("valid regex"));
static COST_FALLBACK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Cost[:\s]*(\d+)[^\d]*(\d+)[^\d]*(\d+)").expect("valid regex"));
static HEALTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*\+?\s*(\d*)\s*Health").expect("valid regex"));
static ARMOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(?:\(\+\d+\))?\s*Armor").expect("valid regex"));

/// Parses one entity page's info panel into an [`Entity`] record.
pub struct EntityPageParser {
    base_image_url: Url,
}

impl EntityPageParser {
    pub fn new(base_image_url: &str) -> Result<Self> {
        let base_image_url = Url::parse(base_image_url)
            .with_context(|| format!("invalid base image URL: {base_image_url}"))?;
        Ok(Self { base_image_url })
    }

    /// Extract the detailed record for `entity` from its page.
    ///
    /// Returns `None` when the page carries no recognizable info panel;
    /// upgrade extraction on the same page is unaffected by that.
    pub fn parse(&self, html: &Html, entity: &EntityRef, page_url: &str) -> Option<Entity> {
        let Some(infobox) = find_infobox(html) else {
            debug!(entity = %entity.name, "no info panel found");
            return None;
        };
        let full_text = element_text(&infobox);

        let mut record = Entity {
            name: entity.name.clone(),
            kind: entity.kind,
            race: entity.race,
            page_url: page_url.to_string(),
            icon_url: self.extract_icon(infobox),
            cost: extract_cost(infobox, &full_text),
            requirements: extract_labeled_field(infobox, &full_text, REQUIREMENT_KEYWORDS),
            produces: extract_labeled_field(infobox, &full_text, PRODUCES_KEYWORDS),
            unlocks: extract_labeled_field(infobox, &full_text, UNLOCKS_KEYWORDS),
            health: None,
            shields: None,
            armor: None,
        };

        if entity.kind == EntityKind::Unit {
            extract_combat_stats(&full_text, &mut record);
        }

        overrides::apply_cost_overrides(&mut record);
        Some(record)
    }

    fn extract_icon(&self, infobox: ElementRef) -> Option<String> {
        let img = infobox.select(&WRAPPER_IMAGE).next()?;
        let src = img.value().attr("src")?;
        self.base_image_url.join(src).ok().map(Into::into)
    }
}

/// The panel carries a fixed class on current pages; older layouts only
/// promise "infobox" somewhere in the class list.
fn find_infobox(html: &Html) -> Option<ElementRef<'_>> {
    html.select(&INFOBOX).next().or_else(|| {
        html.select(&DIV).find(|div| {
            div.value()
                .attr("class")
                .is_some_and(|class| class.to_lowercase().contains("infobox"))
        })
    })
}

/// Cost block: the value element following the "Cost" label, falling back
/// to a regex over the whole panel text.
fn extract_cost(infobox: ElementRef, full_text: &str) -> Option<Cost> {
    for description in infobox.select(&DESCRIPTION) {
        if !element_text(&description).to_lowercase().contains("cost") {
            continue;
        }
        let cost = next_sibling_element(description).and_then(|value| {
            let numbers: Vec<u32> = NUMBER_RE
                .find_iter(&element_text(&value))
                .filter_map(|m| m.as_str().parse().ok())
                .collect();
            match numbers.as_slice() {
                [minerals, gas, build_time, ..] => Some(Cost {
                    minerals: *minerals,
                    gas: *gas,
                    build_time: Some(*build_time),
                }),
                [minerals, gas] => Some(Cost {
                    minerals: *minerals,
                    gas: *gas,
                    build_time: None,
                }),
                _ => None,
            }
        });
        if cost.is_some() {
            return cost;
        }
        break;
    }

    COST_FALLBACK_RE.captures(full_text).map(|caps| Cost {
        minerals: caps[1].parse().unwrap_or(0),
        gas: caps[2].parse().unwrap_or(0),
        build_time: caps[3].parse().ok(),
    })
}

/// Generic label-keyword extraction: slice the panel text from the label
/// until the next known label begins, then split into items.
fn extract_labeled_field(
    infobox: ElementRef,
    full_text: &str,
    keywords: &[&str],
) -> Option<Vec<String>> {
    let descriptions: Vec<String> = infobox
        .select(&DESCRIPTION)
        .map(|d| element_text(&d).trim().to_string())
        .collect();

    for label in &descriptions {
        let lower = label.to_lowercase();
        if !keywords.iter().any(|kw| lower.contains(kw)) {
            continue;
        }
        let Some(start) = find_ascii_ci(full_text, label) else {
            continue;
        };
        let after = &full_text[start + label.len()..];

        // Cut at the nearest other label; a label at offset zero is the
        // value's own prefix artifact and is ignored.
        let mut end = after.len();
        for other in &descriptions {
            if other == label {
                continue;
            }
            if let Some(pos) = after.find(other.as_str()) {
                if pos > 0 && pos < end {
                    end = pos;
                }
            }
        }

        let items = parse_field_content(after[..end].trim());
        if !items.is_empty() {
            return Some(items);
        }
    }
    None
}

/// Split a sliced label value into individual items.
fn parse_field_content(content: &str) -> Vec<String> {
    let mut items = Vec::new();
    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.ends_with(':') || line.len() < 3 {
            continue;
        }
        if line.contains([',', '•', '·']) {
            for part in line.split([',', '•', '·']) {
                let part = part.trim();
                if part.len() > 2 {
                    items.push(part.to_string());
                }
            }
        } else {
            items.push(line.to_string());
        }
    }
    items
}

fn extract_combat_stats(full_text: &str, record: &mut Entity) {
    if let Some(caps) = HEALTH_RE.captures(full_text) {
        record.health = caps[1].parse().ok();
        if !caps[2].is_empty() {
            record.shields = caps[2].parse().ok();
        }
    }
    if let Some(caps) = ARMOR_RE.captures(full_text) {
        record.armor = caps[1].parse().ok();
    }
}

fn next_sibling_element(element: ElementRef) -> Option<ElementRef<'_>> {
    element.next_siblings().find_map(ElementRef::wrap)
}
