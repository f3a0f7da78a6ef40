//! # Entity Store
//!
//! Async SQLite persistence with SQLx for heroes, powers and hero powers.
//!
//! ## Contract
//!
//! - Point lookups return `Ok(None)` when nothing matches; "not found" is
//!   never an error at this layer
//! - List queries return rows in insertion (`id`) order
//! - Every mutation is a single statement, so it is applied atomically
//! - Foreign keys are enforced on every pooled connection

use crate::error::{Error, Result};
use crate::models::{Hero, HeroPower, NewHeroPower, Power};
use crate::validation::Description;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Executor;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Table definitions, applied in order by [`Store::create_schema`]
const SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS heroes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        super_name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS powers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL CHECK (length(description) >= 20)
    )",
    "CREATE TABLE IF NOT EXISTS hero_powers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        strength TEXT NOT NULL CHECK (strength IN ('Strong', 'Weak', 'Average')),
        hero_id INTEGER NOT NULL,
        power_id INTEGER NOT NULL,
        CONSTRAINT fk_hero_powers_hero_id_heroes
            FOREIGN KEY (hero_id) REFERENCES heroes (id) ON DELETE CASCADE,
        CONSTRAINT fk_hero_powers_power_id_powers
            FOREIGN KEY (power_id) REFERENCES powers (id) ON DELETE CASCADE
    )",
    "CREATE INDEX IF NOT EXISTS ix_hero_powers_hero_id ON hero_powers (hero_id)",
    "CREATE INDEX IF NOT EXISTS ix_hero_powers_power_id ON hero_powers (power_id)",
];

const SEED_HEROES: [(&str, &str); 10] = [
    ("Kamala Khan", "Ms. Marvel"),
    ("Doreen Green", "Squirrel Girl"),
    ("Gwen Stacy", "Spider-Gwen"),
    ("Janet Van Dyne", "The Wasp"),
    ("Wanda Maximoff", "Scarlet Witch"),
    ("Carol Danvers", "Captain Marvel"),
    ("Jean Grey", "Dark Phoenix"),
    ("Ororo Munroe", "Storm"),
    ("Kitty Pryde", "Shadowcat"),
    ("Elektra Natchios", "Elektra"),
];

const SEED_POWERS: [(&str, &str); 4] = [
    ("super strength", "gives the wielder super-human strengths"),
    ("flight", "gives the wielder the ability to fly through the skies at supersonic speed"),
    ("super human senses", "allows the wielder to use her senses at a super-human level"),
    ("elasticity", "can stretch the human body to extreme lengths"),
];

/// (hero index, power index, strength) into the seed tables above
const SEED_HERO_POWERS: [(usize, usize, &str); 6] = [
    (0, 1, "Strong"),
    (1, 0, "Average"),
    (2, 2, "Strong"),
    (3, 1, "Weak"),
    (5, 0, "Strong"),
    (5, 1, "Average"),
];

/// SQLite-backed entity store
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Connect to a SQLite database
    ///
    /// # Arguments
    ///
    /// * `url` - Database URL (e.g., "sqlite:app.db" or "sqlite::memory:")
    /// * `max_connections` - Maximum pool size (default: 10)
    ///
    /// In-memory databases are pinned to one long-lived connection, since
    /// every new SQLite connection would otherwise see an empty database.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the URL is malformed or the file cannot
    /// be opened.
    pub async fn connect(url: &str, max_connections: Option<u32>) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| Error::Database {
                message: format!("Invalid SQLite URL '{url}': {e}"),
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.unwrap_or(10))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| Error::Database {
                message: format!("SQLite connection failed: {e}"),
            })?;

        info!(url = %url, in_memory, "Connected to database");
        Ok(Self { pool })
    }

    /// Create the three tables and their indexes if they do not exist
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if any statement fails.
    pub async fn create_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            self.pool.execute(statement).await?;
        }
        debug!("Schema ready");
        Ok(())
    }

    /// Insert the demo dataset when the `heroes` table is empty
    ///
    /// Returns `true` if rows were inserted. All rows go in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if any insert fails; nothing is committed
    /// in that case.
    pub async fn seed(&self) -> Result<bool> {
        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM heroes")
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            debug!(existing, "Skipping seed, heroes already present");
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;

        let mut hero_ids = Vec::with_capacity(SEED_HEROES.len());
        for (name, super_name) in SEED_HEROES {
            hero_ids.push(insert_hero(&mut *tx, name, super_name).await?.id);
        }

        let mut power_ids = Vec::with_capacity(SEED_POWERS.len());
        for (name, description) in SEED_POWERS {
            let description = Description::parse(description).map_err(|_| Error::Database {
                message: format!("Seed description for '{name}' is too short"),
            })?;
            power_ids.push(insert_power(&mut *tx, name, &description).await?.id);
        }

        for (hero, power, strength) in SEED_HERO_POWERS {
            let new = NewHeroPower {
                hero_id: hero_ids[hero],
                power_id: power_ids[power],
                strength: strength.parse().map_err(|e| Error::Database {
                    message: format!("Seed row has {e}"),
                })?,
            };
            insert_hero_power(&mut *tx, &new).await?;
        }

        tx.commit().await?;
        info!(
            heroes = hero_ids.len(),
            powers = power_ids.len(),
            hero_powers = SEED_HERO_POWERS.len(),
            "Seeded database"
        );
        Ok(true)
    }

    /// All heroes in insertion order
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the query fails.
    pub async fn list_heroes(&self) -> Result<Vec<Hero>> {
        let heroes = sqlx::query_as::<_, Hero>("SELECT id, name, super_name FROM heroes ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(heroes)
    }

    /// Look up one hero
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the query fails.
    pub async fn find_hero(&self, id: i64) -> Result<Option<Hero>> {
        let hero =
            sqlx::query_as::<_, Hero>("SELECT id, name, super_name FROM heroes WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(hero)
    }

    /// All powers in insertion order
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the query fails.
    pub async fn list_powers(&self) -> Result<Vec<Power>> {
        let powers =
            sqlx::query_as::<_, Power>("SELECT id, name, description FROM powers ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(powers)
    }

    /// Look up one power
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the query fails.
    pub async fn find_power(&self, id: i64) -> Result<Option<Power>> {
        let power =
            sqlx::query_as::<_, Power>("SELECT id, name, description FROM powers WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(power)
    }

    /// Hero powers owned by a hero (uses `ix_hero_powers_hero_id`)
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the query fails.
    pub async fn hero_powers_for_hero(&self, hero_id: i64) -> Result<Vec<HeroPower>> {
        let rows = sqlx::query_as::<_, HeroPower>(
            "SELECT id, strength, hero_id, power_id FROM hero_powers WHERE hero_id = ? ORDER BY id",
        )
        .bind(hero_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Hero powers owned by a power (uses `ix_hero_powers_power_id`)
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the query fails.
    pub async fn hero_powers_for_power(&self, power_id: i64) -> Result<Vec<HeroPower>> {
        let rows = sqlx::query_as::<_, HeroPower>(
            "SELECT id, strength, hero_id, power_id FROM hero_powers WHERE power_id = ? ORDER BY id",
        )
        .bind(power_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Insert a hero
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the insert fails.
    pub async fn insert_hero(&self, name: &str, super_name: &str) -> Result<Hero> {
        insert_hero(&self.pool, name, super_name).await
    }

    /// Insert a power with an already validated description
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the insert fails.
    pub async fn insert_power(&self, name: &str, description: &Description) -> Result<Power> {
        insert_power(&self.pool, name, description).await
    }

    /// Replace a power's description
    ///
    /// Returns `None` if no power has this id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` if the update fails.
    pub async fn update_power_description(
        &self,
        id: i64,
        description: &Description,
    ) -> Result<Option<Power>> {
        let power = sqlx::query_as::<_, Power>(
            "UPDATE powers SET description = ? WHERE id = ? RETURNING id, name, description",
        )
        .bind(description.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(power)
    }

    /// Insert a hero power whose references were checked by the caller
    ///
    /// # Errors
    ///
    /// Returns `Error::Database` on a foreign-key violation, e.g. if a
    /// referenced row disappeared after it was looked up.
    pub async fn insert_hero_power(&self, new: &NewHeroPower) -> Result<HeroPower> {
        insert_hero_power(&self.pool, new).await
    }

    /// Close the database connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn insert_hero<'e, E>(executor: E, name: &str, super_name: &str) -> Result<Hero>
where
    E: Executor<'e, Database = Sqlite>,
{
    let hero = sqlx::query_as::<_, Hero>(
        "INSERT INTO heroes (name, super_name) VALUES (?, ?) RETURNING id, name, super_name",
    )
    .bind(name)
    .bind(super_name)
    .fetch_one(executor)
    .await?;
    Ok(hero)
}

async fn insert_power<'e, E>(executor: E, name: &str, description: &Description) -> Result<Power>
where
    E: Executor<'e, Database = Sqlite>,
{
    let power = sqlx::query_as::<_, Power>(
        "INSERT INTO powers (name, description) VALUES (?, ?) RETURNING id, name, description",
    )
    .bind(name)
    .bind(description.as_str())
    .fetch_one(executor)
    .await?;
    Ok(power)
}

async fn insert_hero_power<'e, E>(executor: E, new: &NewHeroPower) -> Result<HeroPower>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, HeroPower>(
        "INSERT INTO hero_powers (strength, hero_id, power_id) VALUES (?, ?, ?) \
         RETURNING id, strength, hero_id, power_id",
    )
    .bind(new.strength.as_str())
    .bind(new.hero_id)
    .bind(new.power_id)
    .fetch_one(executor)
    .await?;
    Ok(row)
}
