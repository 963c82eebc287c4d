use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;

use crate::{
    store::document::{AppDocument, IdGenerator, PlantKind, Planting},
    utils::percentage::Percent,
};

use super::ledger::InsufficientFunds;

/// What one planting costs, the single spending sink of the economy.
pub const SEED_COST: u64 = 10;

const MIN_PLANT_SIZE: f64 = 30.;
const MAX_PLANT_SIZE: f64 = 50.;

#[derive(Error, PartialEq, Debug, Clone, Copy)]
pub enum GardenError {
    #[error(transparent)]
    Funds(#[from] InsufficientFunds),
    #[error("({x}, {y}) is outside the garden")]
    OutsideGarden { x: f64, y: f64 },
}

/// A planting request as it arrives over the bridge: raw coordinates, kind
/// picked at random unless the user chose one.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct PlantRequest {
    pub x: f64,
    pub y: f64,
    pub kind: Option<PlantKind>,
}

/// Spends [SEED_COST] points and puts a new planting into the garden.
/// Checks run before any mutation, so a rejected request leaves both the
/// ledger and the garden exactly as they were.
pub fn plant(
    document: &mut AppDocument,
    request: PlantRequest,
    now: DateTime<Utc>,
    ids: &mut IdGenerator,
    rng: &mut impl Rng,
) -> Result<Planting, GardenError> {
    let outside = GardenError::OutsideGarden {
        x: request.x,
        y: request.y,
    };
    let x = Percent::new_opt(request.x).ok_or(outside)?;
    let y = Percent::new_opt(request.y).ok_or(outside)?;

    document.focus_points.debit(SEED_COST)?;

    let planting = Planting {
        id: ids.next_id(now),
        kind: request.kind.unwrap_or_else(|| random_kind(rng)),
        x,
        y,
        size: rng.gen_range(MIN_PLANT_SIZE..MAX_PLANT_SIZE),
        planted_at: now,
    };
    document.zen_garden.seeds.push(planting.clone());
    Ok(planting)
}

fn random_kind(rng: &mut impl Rng) -> PlantKind {
    match rng.gen_range(0..3) {
        0 => PlantKind::Flower,
        1 => PlantKind::Tree,
        _ => PlantKind::Sprout,
    }
}
