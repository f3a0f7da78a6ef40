//! # Request Handlers
//!
//! One async function per route. Each takes the store plus already-routed
//! inputs and returns a [`HandlerResult`]; [`respond`] folds failures into
//! their JSON error responses.

use crate::error::ApiError;
use crate::json::parse_object;
use crate::models::NewHeroPower;
use crate::render::{created_hero_power, hero_detail, hero_summary, power_view};
use crate::server::ApiResponse;
use crate::store::Store;
use crate::validation::{reference_id, require_references, validate_power_patch, validate_strength};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Body of `GET /`
pub const INDEX_HTML: &str = "<h1>Code challenge</h1>";

const HERO_NOT_FOUND: &str = "Hero not found.";
const POWER_NOT_FOUND: &str = "Power not found";

/// Outcome of a handler before it is turned into a response
pub type HandlerResult = Result<ApiResponse, ApiError>;

/// Collapse a handler result into the response sent to the client
#[must_use]
pub fn respond(result: HandlerResult) -> ApiResponse {
    result.unwrap_or_else(ApiError::into_response)
}

fn parse_body(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    parse_object(body).map_err(|e| {
        debug!(error = %e, "Rejected request body");
        ApiError::MalformedBody
    })
}

/// `GET /`
#[must_use]
pub fn index() -> ApiResponse {
    ApiResponse::html(INDEX_HTML)
}

/// `GET /heroes` - summaries of every hero
///
/// # Errors
///
/// `ApiError::Internal` if the store fails
pub async fn list_heroes(store: &Store) -> HandlerResult {
    let heroes = store.list_heroes().await?;
    let body: Vec<_> = heroes.iter().map(hero_summary).collect();
    Ok(ApiResponse::json_body(&body)?)
}

/// `GET /heroes/{id}` - one hero with its hero powers
///
/// # Errors
///
/// `ApiError::NotFound` for an unknown id
pub async fn get_hero(store: &Store, id: i64) -> HandlerResult {
    let hero = store
        .find_hero(id)
        .await?
        .ok_or(ApiError::NotFound(HERO_NOT_FOUND))?;
    let hero_powers = store.hero_powers_for_hero(hero.id).await?;
    Ok(ApiResponse::json_body(&hero_detail(&hero, &hero_powers))?)
}

/// `GET /powers`
///
/// # Errors
///
/// `ApiError::Internal` if the store fails
pub async fn list_powers(store: &Store) -> HandlerResult {
    let powers = store.list_powers().await?;
    let body: Vec<_> = powers.iter().map(power_view).collect();
    Ok(ApiResponse::json_body(&body)?)
}

/// `GET /powers/{id}`
///
/// # Errors
///
/// `ApiError::NotFound` for an unknown id
pub async fn get_power(store: &Store, id: i64) -> HandlerResult {
    let power = store
        .find_power(id)
        .await?
        .ok_or(ApiError::NotFound(POWER_NOT_FOUND))?;
    Ok(ApiResponse::json_body(&power_view(&power))?)
}

/// `PATCH /powers/{id}` - replace the description
///
/// The power must exist before the body is looked at. A body without a
/// `description` key returns the power unchanged. The description is fully
/// validated before the store is touched.
///
/// # Errors
///
/// `NotFound`, `MalformedBody` or `Validation`, in that order of precedence
pub async fn update_power(store: &Store, id: i64, body: &[u8]) -> HandlerResult {
    let power = store
        .find_power(id)
        .await?
        .ok_or(ApiError::NotFound(POWER_NOT_FOUND))?;
    let body = parse_body(body)?;

    let Some(description) = validate_power_patch(&body)? else {
        return Ok(ApiResponse::json_body(&power_view(&power))?);
    };

    let updated = store
        .update_power_description(id, &description)
        .await?
        .ok_or(ApiError::NotFound(POWER_NOT_FOUND))?;
    info!(power_id = id, "Power description updated");
    Ok(ApiResponse::json_body(&power_view(&updated))?)
}

/// `POST /hero_powers` - link a hero to a power
///
/// Checks run in a fixed order, which decides the error a malformed request
/// gets: presence of both ids (400), existence of both rows (404), then the
/// strength value (400 validation error).
///
/// # Errors
///
/// `MalformedBody`, `MissingFields`, `InvalidReference` or `Validation`
pub async fn create_hero_power(store: &Store, body: &[u8]) -> HandlerResult {
    let body = parse_body(body)?;

    let (hero_ref, power_ref) = require_references(&body).map_err(|errors| {
        debug!(fields = ?errors.fields(), "Hero power missing references");
        ApiError::MissingFields
    })?;

    let hero = match reference_id(hero_ref) {
        Some(id) => store.find_hero(id).await?,
        None => None,
    };
    let power = match reference_id(power_ref) {
        Some(id) => store.find_power(id).await?,
        None => None,
    };
    let (Some(hero), Some(power)) = (hero, power) else {
        return Err(ApiError::InvalidReference);
    };

    let strength = validate_strength(body.get("strength"))?;

    let created = store
        .insert_hero_power(&NewHeroPower {
            hero_id: hero.id,
            power_id: power.id,
            strength,
        })
        .await?;
    info!(
        hero_power_id = created.id,
        hero_id = hero.id,
        power_id = power.id,
        strength = %strength,
        "Hero power created"
    );
    Ok(ApiResponse::json_body(&created_hero_power(&created, &hero, &power))?)
}
