//! Seeded mission map generation.
//!
//! Terrain is a dirt base scattered with grass, mud, tree and rock patches and
//! water ponds. The objective sits in the top quarter of the map and the rally
//! point in the bottom quarter, each inside a dirt clearing so both forces can
//! be placed around them.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use warbots_core::{
    doctrine::{FLANKING_DISTANCE, OPFOR_GENERATE_RADIUS, WARBOT_GENERATE_RADIUS},
    ids::{MAX_OPFOR, MAX_WARBOTS},
    AgentId, OpforId, Point, Terrain, WarbotId,
};

use crate::{
    mission::{MapError, MissionMap},
    view::MapView,
};

/// Smallest accepted map side.
pub const MIN_MAP_SIDE: u32 = 2 * (FLANKING_DISTANCE as u32 + 4);

const CELLS_PER_PATCH: u32 = 150;
const PLACEMENT_ATTEMPTS: u32 = 10_000;
const OBJECTIVE_TOP_MARGIN: i32 = 6;

/// Inputs that fully determine a generated map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Warbots spawned around the rally point.
    pub warbots: u8,
    /// Opposing force units spawned around the objective.
    pub opfor: u8,
    /// Seed for terrain and placement.
    pub seed: u64,
}

/// Errors raised while generating a map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// One of the map sides is too short to stage an assault.
    #[error("map of {width}x{height} is smaller than {min}x{min}", min = MIN_MAP_SIDE)]
    TooSmall {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// More units were requested than the tag space holds.
    #[error("cannot spawn {requested} {kind}; at most {limit} fit")]
    TooManyUnits {
        /// Unit kind.
        kind: &'static str,
        /// Requested count.
        requested: u8,
        /// Tag space limit.
        limit: u8,
    },
    /// No free cell was found for a unit.
    #[error("no free cell left around {anchor} for {agent}")]
    NoRoom {
        /// Unit that could not be placed.
        agent: AgentId,
        /// Point the unit spawns around.
        anchor: Point,
    },
    /// A map edit failed.
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Generates a mission map; equal configurations yield equal maps.
pub fn generate(config: &GenerationConfig) -> Result<MissionMap, GenerationError> {
    validate(config)?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut map = MissionMap::new(config.width, config.height, Terrain::Dirt);
    scatter_terrain(&mut map, config, &mut rng)?;

    let objective = pick_objective(config, &mut rng);
    clear(&mut map, objective, OPFOR_GENERATE_RADIUS + 1)?;
    map.place_objective(objective)?;

    let rally_point = pick_rally_point(config, &mut rng);
    clear(&mut map, rally_point, WARBOT_GENERATE_RADIUS + 1)?;
    map.place_rally_point(rally_point)?;

    for number in 1..=config.opfor {
        if let Some(id) = OpforId::new(number) {
            spawn(&mut map, id.into(), objective, OPFOR_GENERATE_RADIUS, &mut rng)?;
        }
    }
    for number in 1..=config.warbots {
        if let Some(id) = WarbotId::new(number) {
            spawn(&mut map, id.into(), rally_point, WARBOT_GENERATE_RADIUS, &mut rng)?;
        }
    }

    tracing::debug!(
        seed = config.seed,
        %objective,
        %rally_point,
        warbots = config.warbots,
        opfor = config.opfor,
        "generated mission map"
    );
    Ok(map)
}

fn validate(config: &GenerationConfig) -> Result<(), GenerationError> {
    if config.width < MIN_MAP_SIDE || config.height < MIN_MAP_SIDE {
        return Err(GenerationError::TooSmall {
            width: config.width,
            height: config.height,
        });
    }
    if config.warbots > MAX_WARBOTS {
        return Err(GenerationError::TooManyUnits {
            kind: "warbots",
            requested: config.warbots,
            limit: MAX_WARBOTS,
        });
    }
    if config.opfor > MAX_OPFOR {
        return Err(GenerationError::TooManyUnits {
            kind: "opfor",
            requested: config.opfor,
            limit: MAX_OPFOR,
        });
    }
    Ok(())
}

fn scatter_terrain(
    map: &mut MissionMap,
    config: &GenerationConfig,
    rng: &mut ChaCha8Rng,
) -> Result<(), GenerationError> {
    let patches = config.width * config.height / CELLS_PER_PATCH;
    for _ in 0..patches {
        let (terrain, max_radius) = match rng.gen_range(0..100) {
            0..=39 => (Terrain::Grass, 5),
            40..=59 => (Terrain::Tree, 4),
            60..=74 => (Terrain::Mud, 3),
            75..=84 => (Terrain::Rock, 2),
            _ => (Terrain::Water, 3),
        };
        let center = random_point(rng, 0..side(config.width), 0..side(config.height));
        let radius = rng.gen_range(1..=max_radius);
        paint_disc(map, center, radius, terrain)?;
    }
    Ok(())
}

fn pick_objective(config: &GenerationConfig, rng: &mut ChaCha8Rng) -> Point {
    let margin = FLANKING_DISTANCE + 2;
    let quarter = (side(config.height) / 4).max(OBJECTIVE_TOP_MARGIN + 1);
    random_point(
        rng,
        margin..side(config.width) - margin,
        OBJECTIVE_TOP_MARGIN..quarter,
    )
}

fn pick_rally_point(config: &GenerationConfig, rng: &mut ChaCha8Rng) -> Point {
    let height = side(config.height);
    let margin = WARBOT_GENERATE_RADIUS as i32 + 1;
    random_point(
        rng,
        margin..side(config.width) - margin,
        height - height / 4..height - margin,
    )
}

fn clear(map: &mut MissionMap, center: Point, radius: u32) -> Result<(), GenerationError> {
    paint_disc(map, center, i32::try_from(radius).unwrap_or(i32::MAX), Terrain::Dirt)
}

fn paint_disc(
    map: &mut MissionMap,
    center: Point,
    radius: i32,
    terrain: Terrain,
) -> Result<(), GenerationError> {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let point = Point::new(center.x() + dx, center.y() + dy);
            if map.on_map(point) {
                map.set_terrain(point, terrain)?;
            }
        }
    }
    Ok(())
}

fn spawn(
    map: &mut MissionMap,
    agent: AgentId,
    anchor: Point,
    radius: u32,
    rng: &mut ChaCha8Rng,
) -> Result<(), GenerationError> {
    let reach = i32::try_from(radius).unwrap_or(i32::MAX);
    for _ in 0..PLACEMENT_ATTEMPTS {
        let point = random_point(
            rng,
            anchor.x() - reach..anchor.x() + reach + 1,
            anchor.y() - reach..anchor.y() + reach + 1,
        );
        if point != anchor && map.can_enter(point) {
            map.place_unit(agent, point)?;
            return Ok(());
        }
    }
    Err(GenerationError::NoRoom { agent, anchor })
}

fn random_point(
    rng: &mut ChaCha8Rng,
    xs: std::ops::Range<i32>,
    ys: std::ops::Range<i32>,
) -> Point {
    Point::new(rng.gen_range(xs), rng.gen_range(ys))
}

fn side(length: u32) -> i32 {
    i32::try_from(length).unwrap_or(i32::MAX)
}
