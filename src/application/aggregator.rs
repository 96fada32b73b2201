//! Upgrade aggregation across entity pages
//!
//! The same logical upgrade is sighted on every page that lists it; raw
//! records sharing an aggregation key collapse into one. The first record
//! of a key fixes the scalar fields, later sightings contribute their
//! affected entities and can fill a missing icon. Conflicts are logged,
//! never dropped silently, and no key ever disappears.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use tracing::warn;

use crate::domain::entities::Upgrade;

/// Merge raw upgrade records by aggregation key.
///
/// Pure and idempotent: feeding the output back in yields the same map.
pub fn aggregate_upgrades(raw: Vec<Upgrade>) -> BTreeMap<String, Upgrade> {
    let mut aggregated: BTreeMap<String, Upgrade> = BTreeMap::new();

    for upgrade in raw {
        match aggregated.entry(upgrade.key.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(upgrade);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();

                if existing.cost != upgrade.cost {
                    warn!(
                        key = %upgrade.key,
                        kept = ?existing.cost,
                        seen = ?upgrade.cost,
                        "conflicting costs for aggregated upgrade, keeping first"
                    );
                }

                for unit in upgrade.affects_units {
                    if !existing.affects_units.contains(&unit) {
                        existing.affects_units.push(unit);
                    }
                }

                match (&existing.icon_url, upgrade.icon_url) {
                    (None, Some(icon)) => existing.icon_url = Some(icon),
                    (Some(kept), Some(seen)) if *kept != seen => {
                        warn!(
                            key = %upgrade.key,
                            kept = %kept,
                            seen = %seen,
                            "differing icons for aggregated upgrade, keeping first"
                        );
                    }
                    _ => {}
                }
            }
        }
    }

    aggregated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{Race, ResearchCost};

    fn raw(name: &str, affects: &str, icon: Option<&str>) -> Upgrade {
        Upgrade {
            name: name.to_string(),
            base_name: None,
            level: None,
            race: Race::Terran,
            cost: ResearchCost { minerals: 100, gas: 100, research_time: 121 },
            affects_units: vec![affects.to_string()],
            research_building: Some(affects.to_string()),
            hotkey: None,
            icon_url: icon.map(str::to_string),
            key: Upgrade::flat_key(name, Race::Terran),
        }
    }

    #[test]
    fn sightings_union_affected_entities_without_duplicates() {
        let merged = aggregate_upgrades(vec![
            raw("Stimpack", "Marine", None),
            raw("Stimpack", "Marauder", None),
            raw("Stimpack", "Marine", None),
        ]);

        assert_eq!(merged.len(), 1);
        let stimpack = &merged["stimpack_terran"];
        assert_eq!(stimpack.affects_units, vec!["Marine".to_string(), "Marauder".to_string()]);
    }

    #[test]
    fn first_non_empty_icon_wins() {
        let merged = aggregate_upgrades(vec![
            raw("Stimpack", "Marine", None),
            raw("Stimpack", "Marauder", Some("https://a/stim.png")),
            raw("Stimpack", "Reaper", Some("https://b/other.png")),
        ]);

        assert_eq!(
            merged["stimpack_terran"].icon_url.as_deref(),
            Some("https://a/stim.png")
        );
    }

    #[test]
    fn no_key_is_ever_dropped() {
        let merged = aggregate_upgrades(vec![
            raw("Stimpack", "Marine", None),
            raw("Combat Shield", "Marine", None),
            raw("Concussive Shells", "Marauder", None),
        ]);

        assert_eq!(merged.len(), 3);
        assert!(merged.contains_key("stimpack_terran"));
        assert!(merged.contains_key("combat_shield_terran"));
        assert!(merged.contains_key("concussive_shells_terran"));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let once = aggregate_upgrades(vec![
            raw("Stimpack", "Marine", Some("https://a/stim.png")),
            raw("Stimpack", "Marauder", None),
            raw("Combat Shield", "Marine", None),
        ]);
        let twice = aggregate_upgrades(once.values().cloned().collect());

        assert_eq!(once, twice);
    }

    #[test]
    fn affected_count_is_monotonically_non_decreasing() {
        let mut records = Vec::new();
        let mut last = 0;
        for affects in ["Marine", "Marauder", "Marine", "Reaper"] {
            records.push(raw("Stimpack", affects, None));
            let merged = aggregate_upgrades(records.clone());
            let count = merged["stimpack_terran"].affects_units.len();
            assert!(count >= last);
            last = count;
        }
        assert_eq!(last, 3);
    }

    #[test]
    fn conflicting_scalars_keep_the_first_record() {
        let mut cheaper = raw("Stimpack", "Marauder", None);
        cheaper.cost = ResearchCost { minerals: 50, gas: 50, research_time: 100 };

        let merged = aggregate_upgrades(vec![raw("Stimpack", "Marine", None), cheaper]);
        assert_eq!(
            merged["stimpack_terran"].cost,
            ResearchCost { minerals: 100, gas: 100, research_time: 121 }
        );
    }
}
