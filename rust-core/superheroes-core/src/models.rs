//! # Entity Models
//!
//! In-memory representation of the three tables.
//!
//! Entities hold foreign ids only. A hero does not own a list of hero powers
//! and a hero power does not point back at its hero; both directions are
//! answered by indexed queries in [`crate::store`].

use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;
use std::str::FromStr;

/// A superhero character (`heroes` table)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hero {
    /// Row id
    pub id: i64,
    /// Real name
    pub name: String,
    /// Superhero alias
    pub super_name: String,
}

/// An ability (`powers` table)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Power {
    /// Row id
    pub id: i64,
    /// Power name
    pub name: String,
    /// At least 20 characters once persisted
    pub description: String,
}

/// How strongly a hero exhibits a power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Strength {
    /// "Strong"
    Strong,
    /// "Weak"
    Weak,
    /// "Average"
    Average,
}

impl Strength {
    /// Accepted wire names
    pub const NAMES: [&'static str; 3] = ["Strong", "Weak", "Average"];

    /// Wire / column representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strong => "Strong",
            Self::Weak => "Weak",
            Self::Average => "Average",
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of [`Strength::NAMES`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrength(pub String);

impl fmt::Display for UnknownStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown strength '{}'", self.0)
    }
}

impl std::error::Error for UnknownStrength {}

impl FromStr for Strength {
    type Err = UnknownStrength;

    // Case-sensitive: "strong" is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Strong" => Ok(Self::Strong),
            "Weak" => Ok(Self::Weak),
            "Average" => Ok(Self::Average),
            other => Err(UnknownStrength(other.to_string())),
        }
    }
}

/// Association row "this hero exhibits this power at this strength"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroPower {
    /// Row id
    pub id: i64,
    /// Strength rating
    pub strength: Strength,
    /// Foreign key to `heroes.id`
    pub hero_id: i64,
    /// Foreign key to `powers.id`
    pub power_id: i64,
}

/// Fully validated input for inserting a hero power
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewHeroPower {
    /// Existing hero id
    pub hero_id: i64,
    /// Existing power id
    pub power_id: i64,
    /// Strength rating
    pub strength: Strength,
}

impl<'r> FromRow<'r, SqliteRow> for Hero {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            super_name: row.try_get("super_name")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Power {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for HeroPower {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw: String = row.try_get("strength")?;
        let strength = raw.parse().map_err(|e| sqlx::Error::ColumnDecode {
            index: "strength".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            id: row.try_get("id")?,
            strength,
            hero_id: row.try_get("hero_id")?,
            power_id: row.try_get("power_id")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strength_round_trips_names() {
        for name in Strength::NAMES {
            let parsed: Strength = name.parse().unwrap();
            assert_eq!(parsed.as_str(), name);
            assert_eq!(parsed.to_string(), name);
        }
    }

    #[test]
    fn test_strength_rejects_other_values() {
        assert!("strong".parse::<Strength>().is_err());
        assert!("Mighty".parse::<Strength>().is_err());
        assert!("".parse::<Strength>().is_err());
    }

    #[test]
    fn test_strength_serializes_as_name() {
        let json = serde_json::to_string(&Strength::Average).unwrap();
        assert_eq!(json, r#""Average""#);
    }
}
