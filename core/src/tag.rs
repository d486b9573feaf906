//! Bit-flag tags stored in occupancy grid cells.
//!
//! Every cell holds a [`TagSet`], a 64-bit mask where each bit is one
//! [`Tag`]. Unit identities, terrain and mission markers share the same
//! mask so a warbot standing on dirt next to the rally point is a single
//! value. Whether a tag blocks movement or planning is decided by its
//! [`TagCategory`], a closed enumeration, never by a lookup table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{CivilianId, OpforId, WarbotId, MAX_CIVILIANS, MAX_OPFOR, MAX_WARBOTS};

const WARBOT_BASE: u32 = 0;
const OPFOR_BASE: u32 = WARBOT_BASE + MAX_WARBOTS as u32;
const CIVILIAN_BASE: u32 = OPFOR_BASE + MAX_OPFOR as u32;
const MUNITION_BASE: u32 = CIVILIAN_BASE + MAX_CIVILIANS as u32;
const TERRAIN_BASE: u32 = MUNITION_BASE + 3;
const RALLY_POINT_BIT: u32 = 62;
const OBJECTIVE_BIT: u32 = 63;

/// Kinds of ground a cell can be made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Open water; impassable.
    Water,
    /// Soft ground.
    Mud,
    /// Bare ground.
    Dirt,
    /// Low vegetation.
    Grass,
    /// Woodland.
    Tree,
    /// Rocky ground.
    Rock,
    /// Doorway through a wall.
    Door,
    /// Solid wall; impassable.
    Wall,
}

impl Terrain {
    const ALL: [Terrain; 8] = [
        Terrain::Water,
        Terrain::Mud,
        Terrain::Dirt,
        Terrain::Grass,
        Terrain::Tree,
        Terrain::Rock,
        Terrain::Door,
        Terrain::Wall,
    ];

    const fn offset(self) -> u32 {
        match self {
            Self::Water => 0,
            Self::Mud => 1,
            Self::Dirt => 2,
            Self::Grass => 3,
            Self::Tree => 4,
            Self::Rock => 5,
            Self::Door => 6,
            Self::Wall => 7,
        }
    }

    /// Reports whether the terrain can never be traversed.
    #[must_use]
    pub const fn is_impassable(self) -> bool {
        matches!(self, Self::Water | Self::Wall)
    }
}

/// Transient effects of weapons fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Munition {
    /// Round in flight.
    Bullet,
    /// Grenade in flight.
    Grenade,
    /// Burning ground.
    Fire,
}

/// Broad class a tag belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TagCategory {
    /// Friendly warbot.
    Friendly,
    /// Opposing force unit.
    Hostile,
    /// Non-combatant.
    Civilian,
    /// Weapons effect.
    Munition,
    /// Ground type.
    Terrain(Terrain),
    /// Rally point or objective marker.
    Mission,
}

impl TagCategory {
    /// Reports whether a cell holding this category cannot be entered.
    #[must_use]
    pub const fn blocks_movement(self) -> bool {
        match self {
            Self::Friendly | Self::Hostile | Self::Civilian => true,
            Self::Terrain(terrain) => terrain.is_impassable(),
            Self::Munition | Self::Mission => false,
        }
    }

    /// Reports whether route planning must avoid this category.
    #[must_use]
    pub const fn is_impassable(self) -> bool {
        match self {
            Self::Terrain(terrain) => terrain.is_impassable(),
            _ => false,
        }
    }
}

/// Single flag stored in a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    /// A friendly warbot.
    Warbot(WarbotId),
    /// An opposing force unit.
    Opfor(OpforId),
    /// A civilian.
    Civilian(CivilianId),
    /// A weapons effect.
    Munition(Munition),
    /// The ground the cell is made of.
    Terrain(Terrain),
    /// Assembly point where the squad forms up.
    RallyPoint,
    /// Location the squad must seize.
    Objective,
}

impl Tag {
    /// Category that decides how the tag affects movement.
    #[must_use]
    pub const fn category(self) -> TagCategory {
        match self {
            Self::Warbot(_) => TagCategory::Friendly,
            Self::Opfor(_) => TagCategory::Hostile,
            Self::Civilian(_) => TagCategory::Civilian,
            Self::Munition(_) => TagCategory::Munition,
            Self::Terrain(terrain) => TagCategory::Terrain(terrain),
            Self::RallyPoint | Self::Objective => TagCategory::Mission,
        }
    }

    /// Index of the bit representing this tag.
    #[must_use]
    pub const fn bit_index(self) -> u32 {
        match self {
            Self::Warbot(id) => WARBOT_BASE + id.index(),
            Self::Opfor(id) => OPFOR_BASE + id.index(),
            Self::Civilian(id) => CIVILIAN_BASE + id.index(),
            Self::Munition(Munition::Bullet) => MUNITION_BASE,
            Self::Munition(Munition::Grenade) => MUNITION_BASE + 1,
            Self::Munition(Munition::Fire) => MUNITION_BASE + 2,
            Self::Terrain(terrain) => TERRAIN_BASE + terrain.offset(),
            Self::RallyPoint => RALLY_POINT_BIT,
            Self::Objective => OBJECTIVE_BIT,
        }
    }

    /// Mask with only this tag's bit set.
    #[must_use]
    pub const fn bit(self) -> u64 {
        1u64 << self.bit_index()
    }

    /// Recovers the tag stored at `index`, if that bit is assigned.
    #[must_use]
    pub fn from_bit_index(index: u32) -> Option<Self> {
        // Ids are at most 20, so narrowing the block offset cannot truncate.
        let id_number = |base: u32| u8::try_from(index - base + 1).ok();
        match index {
            i if i < OPFOR_BASE => id_number(WARBOT_BASE)
                .and_then(WarbotId::new)
                .map(Self::Warbot),
            i if i < CIVILIAN_BASE => id_number(OPFOR_BASE)
                .and_then(OpforId::new)
                .map(Self::Opfor),
            i if i < MUNITION_BASE => id_number(CIVILIAN_BASE)
                .and_then(CivilianId::new)
                .map(Self::Civilian),
            i if i == MUNITION_BASE => Some(Self::Munition(Munition::Bullet)),
            i if i == MUNITION_BASE + 1 => Some(Self::Munition(Munition::Grenade)),
            i if i == MUNITION_BASE + 2 => Some(Self::Munition(Munition::Fire)),
            i if i >= TERRAIN_BASE && i < TERRAIN_BASE + 8 => Terrain::ALL
                .get(usize::try_from(i - TERRAIN_BASE).ok()?)
                .copied()
                .map(Self::Terrain),
            RALLY_POINT_BIT => Some(Self::RallyPoint),
            OBJECTIVE_BIT => Some(Self::Objective),
            _ => None,
        }
    }

    /// Reports whether a cell holding this tag cannot be entered.
    #[must_use]
    pub const fn blocks_movement(self) -> bool {
        self.category().blocks_movement()
    }

    /// Reports whether route planning must avoid this tag.
    #[must_use]
    pub const fn is_impassable(self) -> bool {
        self.category().is_impassable()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warbot(id) => id.fmt(f),
            Self::Opfor(id) => id.fmt(f),
            Self::Civilian(id) => id.fmt(f),
            Self::Munition(munition) => write!(f, "{munition:?}"),
            Self::Terrain(terrain) => write!(f, "{terrain:?}"),
            Self::RallyPoint => f.write_str("RALLY_POINT"),
            Self::Objective => f.write_str("OBJECTIVE"),
        }
    }
}

/// Combined flags of a single cell.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TagSet(u64);

impl TagSet {
    /// Cell with no flags at all.
    pub const EMPTY: TagSet = TagSet(0);

    /// Wraps a raw cell value.
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw cell value.
    #[must_use]
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// Set holding exactly one tag.
    #[must_use]
    pub const fn only(tag: Tag) -> Self {
        Self(tag.bit())
    }

    /// Copy of the set with `tag` added.
    #[must_use]
    pub const fn with(self, tag: Tag) -> Self {
        Self(self.0 | tag.bit())
    }

    /// Copy of the set with `tag` removed.
    #[must_use]
    pub const fn without(self, tag: Tag) -> Self {
        Self(self.0 & !tag.bit())
    }

    /// Adds `tag` to the set in place.
    pub fn insert(&mut self, tag: Tag) {
        self.0 |= tag.bit();
    }

    /// Removes `tag` from the set in place.
    pub fn remove(&mut self, tag: Tag) {
        self.0 &= !tag.bit();
    }

    /// Reports whether the set holds `tag`.
    #[must_use]
    pub const fn contains(&self, tag: Tag) -> bool {
        self.0 & tag.bit() != 0
    }

    /// Reports whether the set holds no flags.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterator over the tags in ascending bit order.
    pub fn iter(&self) -> impl Iterator<Item = Tag> {
        let bits = self.0;
        (0..u64::BITS)
            .filter(move |index| bits & (1u64 << index) != 0)
            .filter_map(Tag::from_bit_index)
    }

    /// Reports whether any tag in the cell blocks movement.
    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.iter().any(Tag::blocks_movement)
    }

    /// Reports whether route planning may pass through the cell.
    #[must_use]
    pub fn is_navigable(&self) -> bool {
        !self.iter().any(Tag::is_impassable)
    }

    /// Friendly warbot standing in the cell, if any.
    #[must_use]
    pub fn warbot(&self) -> Option<WarbotId> {
        self.iter().find_map(|tag| match tag {
            Tag::Warbot(id) => Some(id),
            _ => None,
        })
    }

    /// Opposing force unit standing in the cell, if any.
    #[must_use]
    pub fn opfor(&self) -> Option<OpforId> {
        self.iter().find_map(|tag| match tag {
            Tag::Opfor(id) => Some(id),
            _ => None,
        })
    }

    /// Terrain the cell is made of, if any.
    #[must_use]
    pub fn terrain(&self) -> Option<Terrain> {
        self.iter().find_map(|tag| match tag {
            Tag::Terrain(terrain) => Some(terrain),
            _ => None,
        })
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        iter.into_iter().fold(TagSet::EMPTY, TagSet::with)
    }
}
