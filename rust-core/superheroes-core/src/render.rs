//! # Rendering
//!
//! JSON shapes returned by the API. Each shape is its own borrowing view
//! struct so that adding a field to one never leaks it into another.
//!
//! | Shape | Fields |
//! |---|---|
//! | [`HeroSummary`] | `id, name, super_name` |
//! | [`HeroDetail`] | summary + `hero_powers: [EmbeddedHeroPower]` |
//! | [`EmbeddedHeroPower`] | `id, hero_id, power_id, strength` |
//! | [`PowerView`] | `id, name, description` |
//! | [`CreatedHeroPower`] | embedded fields + `hero`, `power` |

use crate::models::{Hero, HeroPower, Power, Strength};
use serde::Serialize;

/// Hero as listed by `GET /heroes`
#[derive(Debug, Serialize)]
pub struct HeroSummary<'a> {
    id: i64,
    name: &'a str,
    super_name: &'a str,
}

/// Hero as returned by `GET /heroes/{id}`
#[derive(Debug, Serialize)]
pub struct HeroDetail<'a> {
    id: i64,
    name: &'a str,
    super_name: &'a str,
    hero_powers: Vec<EmbeddedHeroPower>,
}

/// Hero power nested inside a hero detail, without back-references
#[derive(Debug, Serialize)]
pub struct EmbeddedHeroPower {
    id: i64,
    hero_id: i64,
    power_id: i64,
    strength: Strength,
}

/// Power as returned standalone
#[derive(Debug, Serialize)]
pub struct PowerView<'a> {
    id: i64,
    name: &'a str,
    description: &'a str,
}

/// Response body of `POST /hero_powers`
#[derive(Debug, Serialize)]
pub struct CreatedHeroPower<'a> {
    id: i64,
    hero_id: i64,
    power_id: i64,
    strength: Strength,
    hero: HeroSummary<'a>,
    power: PowerView<'a>,
}

/// Summary shape of a hero
#[must_use]
pub fn hero_summary(hero: &Hero) -> HeroSummary<'_> {
    HeroSummary {
        id: hero.id,
        name: &hero.name,
        super_name: &hero.super_name,
    }
}

/// Detail shape of a hero with its hero powers
#[must_use]
pub fn hero_detail<'a>(hero: &'a Hero, hero_powers: &[HeroPower]) -> HeroDetail<'a> {
    HeroDetail {
        id: hero.id,
        name: &hero.name,
        super_name: &hero.super_name,
        hero_powers: hero_powers.iter().map(embedded_hero_power).collect(),
    }
}

/// Hero power shape used inside [`HeroDetail`]
#[must_use]
pub const fn embedded_hero_power(hero_power: &HeroPower) -> EmbeddedHeroPower {
    EmbeddedHeroPower {
        id: hero_power.id,
        hero_id: hero_power.hero_id,
        power_id: hero_power.power_id,
        strength: hero_power.strength,
    }
}

/// Standalone power shape
#[must_use]
pub fn power_view(power: &Power) -> PowerView<'_> {
    PowerView {
        id: power.id,
        name: &power.name,
        description: &power.description,
    }
}

/// Composite shape returned after creating a hero power
#[must_use]
pub fn created_hero_power<'a>(
    hero_power: &HeroPower,
    hero: &'a Hero,
    power: &'a Power,
) -> CreatedHeroPower<'a> {
    CreatedHeroPower {
        id: hero_power.id,
        hero_id: hero_power.hero_id,
        power_id: hero_power.power_id,
        strength: hero_power.strength,
        hero: hero_summary(hero),
        power: power_view(power),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    fn hero() -> Hero {
        Hero {
            id: 1,
            name: "Kamala Khan".to_string(),
            super_name: "Ms. Marvel".to_string(),
        }
    }

    fn power() -> Power {
        Power {
            id: 2,
            name: "flight".to_string(),
            description: "gives the wielder the ability to fly".to_string(),
        }
    }

    fn hero_power() -> HeroPower {
        HeroPower {
            id: 5,
            strength: Strength::Strong,
            hero_id: 1,
            power_id: 2,
        }
    }

    #[test]
    fn test_hero_summary_shape() {
        let hero = hero();
        assert_eq!(
            to_value(hero_summary(&hero)).unwrap(),
            json!({"id": 1, "name": "Kamala Khan", "super_name": "Ms. Marvel"})
        );
    }

    #[test]
    fn test_hero_detail_embeds_without_back_references() {
        let hero = hero();
        let value = to_value(hero_detail(&hero, &[hero_power()])).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 1,
                "name": "Kamala Khan",
                "super_name": "Ms. Marvel",
                "hero_powers": [
                    {"id": 5, "hero_id": 1, "power_id": 2, "strength": "Strong"}
                ]
            })
        );
        assert!(value["hero_powers"][0].get("hero").is_none());
        assert!(value["hero_powers"][0].get("power").is_none());
    }

    #[test]
    fn test_hero_detail_with_no_powers() {
        let hero = hero();
        let value = to_value(hero_detail(&hero, &[])).unwrap();
        assert_eq!(value["hero_powers"], json!([]));
    }

    #[test]
    fn test_power_view_shape() {
        let power = power();
        assert_eq!(
            to_value(power_view(&power)).unwrap(),
            json!({"id": 2, "name": "flight", "description": "gives the wielder the ability to fly"})
        );
    }

    #[test]
    fn test_created_hero_power_shape() {
        let (hero, power) = (hero(), power());
        let value = to_value(created_hero_power(&hero_power(), &hero, &power)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 5,
                "hero_id": 1,
                "power_id": 2,
                "strength": "Strong",
                "hero": {"id": 1, "name": "Kamala Khan", "super_name": "Ms. Marvel"},
                "power": {"id": 2, "name": "flight", "description": "gives the wielder the ability to fly"}
            })
        );
    }
}
