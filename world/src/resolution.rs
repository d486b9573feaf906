//! Resolves unit actions against the mission map.

use warbots_core::{
    doctrine::FIRE_RANGE, Action, AgentId, Direction, OpforId, Point, Terrain, WarbotId,
};

use crate::{mission::MissionMap, view::MapView};

/// Why a move was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveRejection {
    /// The destination is not a single step away.
    NotAdjacent,
    /// The destination is off the map, impassable or taken.
    Blocked,
    /// The unit is no longer on the map.
    UnknownUnit,
}

/// Observable outcome of resolving an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// A unit stepped into a new cell.
    UnitMoved {
        /// Unit that moved.
        agent: AgentId,
        /// Previous cell.
        from: Point,
        /// New cell.
        to: Point,
    },
    /// A move was refused and the unit stayed put.
    MoveRejected {
        /// Unit that tried to move.
        agent: AgentId,
        /// Requested destination.
        target: Point,
        /// Reason for the refusal.
        reason: MoveRejection,
    },
    /// A round left the shooter's cell.
    ShotFired {
        /// Shooter.
        agent: AgentId,
        /// Shooter's cell.
        origin: Point,
        /// Direction the round travelled.
        direction: Direction,
    },
    /// A round struck a hostile, which leaves the map.
    OpforNeutralized {
        /// Shooter.
        by: AgentId,
        /// Unit struck.
        target: OpforId,
        /// Cell where the hit landed.
        location: Point,
    },
    /// A round struck a warbot fired by an opposing unit.
    WarbotHit {
        /// Shooter.
        by: AgentId,
        /// Unit struck.
        target: WarbotId,
        /// Cell where the hit landed.
        location: Point,
    },
    /// A round struck a unit on the shooter's own side; nothing happens.
    FriendlyFire {
        /// Shooter.
        by: AgentId,
        /// Unit struck.
        target: AgentId,
        /// Cell where the hit landed.
        location: Point,
    },
}

/// Applies one unit's action to the mission map, recording what happened.
pub fn apply(map: &mut MissionMap, agent: AgentId, action: Action, out_events: &mut Vec<Event>) {
    match action {
        Action::DoNothing => {}
        Action::MoveTo { location } => resolve_move(map, agent, location, out_events),
        Action::FireAt { direction, .. } => resolve_fire(map, agent, direction, out_events),
    }
}

fn resolve_move(map: &mut MissionMap, agent: AgentId, target: Point, out_events: &mut Vec<Event>) {
    let Some(from) = map.location_of(agent) else {
        out_events.push(Event::MoveRejected {
            agent,
            target,
            reason: MoveRejection::UnknownUnit,
        });
        return;
    };

    if from.chebyshev_distance(target) != 1 {
        tracing::debug!(%agent, %from, %target, "move rejected: not adjacent");
        out_events.push(Event::MoveRejected {
            agent,
            target,
            reason: MoveRejection::NotAdjacent,
        });
        return;
    }

    match map.move_unit(agent, target) {
        Ok(from) => out_events.push(Event::UnitMoved {
            agent,
            from,
            to: target,
        }),
        Err(error) => {
            tracing::debug!(%agent, %target, %error, "move rejected");
            out_events.push(Event::MoveRejected {
                agent,
                target,
                reason: MoveRejection::Blocked,
            });
        }
    }
}

fn resolve_fire(
    map: &mut MissionMap,
    agent: AgentId,
    direction: Direction,
    out_events: &mut Vec<Event>,
) {
    let Some(origin) = map.location_of(agent) else {
        return;
    };
    out_events.push(Event::ShotFired {
        agent,
        origin,
        direction,
    });

    // Rounds fly over water and stop at the first unit or wall.
    let mut cell = origin;
    for _ in 0..FIRE_RANGE {
        cell = cell + direction;
        if !map.on_map(cell) {
            return;
        }

        let contents = map.get(cell);
        let struck = contents
            .opfor()
            .map(AgentId::from)
            .or_else(|| contents.warbot().map(AgentId::from));

        match (agent, struck) {
            (AgentId::Warbot(_), Some(AgentId::Opfor(target))) => {
                let _ = map.remove_unit(target.into());
                tracing::info!(by = %agent, %target, location = %cell, "opfor neutralized");
                out_events.push(Event::OpforNeutralized {
                    by: agent,
                    target,
                    location: cell,
                });
                return;
            }
            (AgentId::Opfor(_), Some(AgentId::Warbot(target))) => {
                tracing::info!(by = %agent, %target, location = %cell, "warbot hit");
                out_events.push(Event::WarbotHit {
                    by: agent,
                    target,
                    location: cell,
                });
                return;
            }
            (_, Some(target)) => {
                tracing::warn!(by = %agent, %target, location = %cell, "friendly fire");
                out_events.push(Event::FriendlyFire {
                    by: agent,
                    target,
                    location: cell,
                });
                return;
            }
            (_, None) if contents.terrain() == Some(Terrain::Wall) => return,
            (_, None) => {}
        }
    }
}
