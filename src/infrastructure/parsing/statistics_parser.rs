//! Statistics-page parsing: wikitable rows into entity references
//!
//! Each statistics page carries one data table per race, always in the
//! order Protoss, Terran, Zerg. The first linked cell of a data row names
//! the entity and points at its page.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::entities::{EntityKind, EntityRef, Race};

/// Link texts containing one of these are sub-abilities or alternate modes
/// nested inside a unit/building page, not top-level entities.
const SUB_ABILITY_KEYWORDS: &[&str] = &[
    "mode",
    "battery",
    "burst",
    "rockets",
    "torpedoes",
    "coil",
    "talons",
    "hammer",
];

static WIKITABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.wikitable").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").expect("valid selector"));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("valid selector"));

/// Extract all entity references from one statistics page.
///
/// Returns a race-keyed map; races whose table is missing map to an empty
/// list. Tables beyond the third are ignored.
pub fn parse_statistics_page(html: &Html, kind: EntityKind) -> BTreeMap<Race, Vec<EntityRef>> {
    let mut by_race: BTreeMap<Race, Vec<EntityRef>> =
        Race::ALL.iter().map(|race| (*race, Vec::new())).collect();

    for (table, race) in html.select(&WIKITABLE).zip(Race::ALL) {
        let mut entities = Vec::new();

        // First row is the header
        for row in table.select(&ROW).skip(1) {
            let Some(first_cell) = row.select(&CELL).next() else {
                continue;
            };
            let Some(link) = first_cell.select(&LINK).next() else {
                continue;
            };

            let name = link.text().collect::<String>().trim().to_string();
            let href = link.value().attr("href").unwrap_or_default().to_string();

            if name.len() <= 1 || href.starts_with('#') {
                continue;
            }
            let lower = name.to_lowercase();
            if SUB_ABILITY_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
                debug!(name = %name, "dropping sub-ability row");
                continue;
            }

            let page_name = if href.is_empty() {
                None
            } else {
                href.rsplit('/').next().map(str::to_string)
            };

            entities.push(EntityRef {
                name,
                href,
                page_name,
                kind,
                race,
            });
        }

        debug!(race = %race, kind = %kind, count = entities.len(), "statistics table parsed");
        by_race.insert(race, entities);
    }

    by_race
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(tables: &[&str]) -> Html {
        let body: String = tables
            .iter()
            .map(|rows| format!("<table class=\"wikitable\"><tr><th>Name</th></tr>{rows}</table>"))
            .collect();
        Html::parse_document(&format!("<html><body>{body}</body></html>"))
    }

    #[test]
    fn assigns_tables_in_fixed_race_order() {
        let html = page(&[
            r#"<tr><td><a href="/starcraft2/Zealot">Zealot</a></td></tr>"#,
            r#"<tr><td><a href="/starcraft2/Marine">Marine</a></td></tr>"#,
            r#"<tr><td><a href="/starcraft2/Zergling">Zergling</a></td></tr>"#,
        ]);
        let refs = parse_statistics_page(&html, EntityKind::Unit);

        assert_eq!(refs[&Race::Protoss][0].name, "Zealot");
        assert_eq!(refs[&Race::Terran][0].name, "Marine");
        assert_eq!(refs[&Race::Zerg][0].name, "Zergling");
        assert_eq!(refs[&Race::Terran][0].page_name.as_deref(), Some("Marine"));
        assert_eq!(refs[&Race::Terran][0].kind, EntityKind::Unit);
    }

    #[test]
    fn drops_sub_ability_rows_and_anchors() {
        let html = page(&[
            "",
            r##"<tr><td><a href="/starcraft2/Viking">Fighter Mode</a></td></tr>
               <tr><td><a href="#section">Marine</a></td></tr>
               <tr><td><a href="/starcraft2/Auto-Turret">Auto-Turret</a></td></tr>
               <tr><td><a href="/starcraft2/Auto-Turret">Auto-Turret Battery</a></td></tr>"##,
            "",
        ]);
        let refs = parse_statistics_page(&html, EntityKind::Unit);

        let terran: Vec<&str> = refs[&Race::Terran].iter().map(|r| r.name.as_str()).collect();
        assert_eq!(terran, vec!["Auto-Turret"]);
    }

    #[test]
    fn missing_tables_yield_empty_lists() {
        let html = page(&[r#"<tr><td><a href="/starcraft2/Nexus">Nexus</a></td></tr>"#]);
        let refs = parse_statistics_page(&html, EntityKind::Building);

        assert_eq!(refs[&Race::Protoss].len(), 1);
        assert!(refs[&Race::Terran].is_empty());
        assert!(refs[&Race::Zerg].is_empty());
    }

    #[test]
    fn preserves_table_order_within_a_race() {
        let html = page(&[
            r#"<tr><td><a href="/starcraft2/Probe">Probe</a></td></tr>
               <tr><td><a href="/starcraft2/Zealot">Zealot</a></td></tr>
               <tr><td><a href="/starcraft2/Stalker">Stalker</a></td></tr>"#,
            "",
            "",
        ]);
        let refs = parse_statistics_page(&html, EntityKind::Unit);
        let names: Vec<&str> = refs[&Race::Protoss].iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Probe", "Zealot", "Stalker"]);
    }
}
