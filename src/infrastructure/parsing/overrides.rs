//! Known-data corrections applied after generic extraction
//!
//! The generic cost block on a handful of source pages lists the wrong
//! numbers (morph cost vs. total cost confusion on the page itself).
//! Patches are kept in one table keyed by entity name and race so every
//! exception stays documented in a single place.

use tracing::debug;

use crate::domain::entities::{Cost, Entity, Race};

/// Patch list: (entity name, race) -> corrected cost.
pub static COST_OVERRIDES: &[(&str, Race, Cost)] = &[
    (
        "Orbital Command",
        Race::Terran,
        Cost { minerals: 150, gas: 0, build_time: Some(35) },
    ),
    (
        "Planetary Fortress",
        Race::Terran,
        Cost { minerals: 150, gas: 150, build_time: Some(60) },
    ),
];

/// Replace the extracted cost when the entity is on the patch list.
pub fn apply_cost_overrides(entity: &mut Entity) {
    if let Some((_, _, cost)) = COST_OVERRIDES
        .iter()
        .find(|(name, race, _)| *name == entity.name && *race == entity.race)
    {
        debug!(entity = %entity.name, "applying cost override");
        entity.cost = Some(cost.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::EntityKind;

    fn building(name: &str, race: Race, cost: Option<Cost>) -> Entity {
        Entity {
            name: name.to_string(),
            kind: EntityKind::Building,
            race,
            page_url: String::new(),
            icon_url: None,
            cost,
            requirements: None,
            produces: None,
            unlocks: None,
            health: None,
            shields: None,
            armor: None,
        }
    }

    #[test]
    fn patches_listed_entities_even_over_extracted_cost() {
        let mut entity = building(
            "Planetary Fortress",
            Race::Terran,
            Some(Cost { minerals: 550, gas: 150, build_time: Some(100) }),
        );
        apply_cost_overrides(&mut entity);
        assert_eq!(
            entity.cost,
            Some(Cost { minerals: 150, gas: 150, build_time: Some(60) })
        );
    }

    #[test]
    fn fills_cost_when_extraction_found_nothing() {
        let mut entity = building("Orbital Command", Race::Terran, None);
        apply_cost_overrides(&mut entity);
        assert_eq!(
            entity.cost,
            Some(Cost { minerals: 150, gas: 0, build_time: Some(35) })
        );
    }

    #[test]
    fn leaves_other_entities_untouched() {
        let extracted = Some(Cost { minerals: 400, gas: 0, build_time: Some(71) });
        let mut entity = building("Command Center", Race::Terran, extracted.clone());
        apply_cost_overrides(&mut entity);
        assert_eq!(entity.cost, extracted);
    }
}
