//! Round loop of the turn protocol.

use std::collections::{BTreeMap, BTreeSet};

use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
    time::Instant,
};
use warbots_core::{Action, AgentId, AgentMessage, SimMessage};
use warbots_radio::Broker;
use warbots_system_coordination::Warbot;
use warbots_system_opfor::Opfor;
use warbots_world::{self as world, generate, Event, MissionMap};

use crate::{actor, config::SimulationConfig, RuntimeError};

/// What one round did to the mission map.
#[derive(Debug)]
pub struct RoundReport<'a> {
    /// One-based round number.
    pub round: u32,
    /// Map after the round's actions were resolved.
    pub map: &'a MissionMap,
    /// Events raised while resolving the round.
    pub events: &'a [Event],
}

/// Final state of a run.
#[derive(Debug)]
pub struct Outcome {
    /// Rounds played.
    pub rounds: u32,
    /// Whether the squad leader reported the objective secured.
    pub completed: bool,
    /// Units dropped after missing too many turns.
    pub lost: Vec<AgentId>,
    /// Map as it stood at the end.
    pub map: MissionMap,
}

/// Stages a mission, plays rounds until it completes or runs out, and shuts everything down.
///
/// `observe` sees every round after its actions were resolved.
pub async fn run<F>(config: &SimulationConfig, mut observe: F) -> Result<Outcome, RuntimeError>
where
    F: FnMut(&RoundReport<'_>),
{
    config.validate()?;
    let mut map = generate(&config.generation())?;
    let rally_point = map
        .rally_point()
        .ok_or(RuntimeError::MissingMarker("rally point"))?;
    let objective = map
        .objective()
        .ok_or(RuntimeError::MissingMarker("objective"))?;
    tracing::info!(
        seed = config.seed,
        width = config.width,
        height = config.height,
        %rally_point,
        %objective,
        "mission staged"
    );

    let broker = Broker::spawn();
    let (replies, mut inbound) = mpsc::unbounded_channel();
    let mut units = Vec::new();

    let warbots: Vec<_> = map.warbots().collect();
    let radios = warbots
        .iter()
        .map(|(id, _)| broker.subscribe(*id))
        .collect::<Result<Vec<_>, _>>()?;
    for ((id, location), radio) in warbots.into_iter().zip(radios) {
        let (turns, requests) = mpsc::unbounded_channel();
        let warbot = Warbot::new(id, location, rally_point, objective);
        let task = tokio::spawn(actor::run_warbot(
            warbot,
            radio,
            requests,
            replies.clone(),
            config.cycle(),
        ));
        units.push(Unit::new(id.into(), config.warbot_vision, turns, task));
    }

    let opfor: Vec<_> = map.opfor().map(|(id, _)| id).collect();
    for id in opfor {
        let (turns, requests) = mpsc::unbounded_channel();
        let task = tokio::spawn(actor::run_opfor(Opfor::new(id), requests, replies.clone()));
        units.push(Unit::new(id.into(), config.opfor_vision, turns, task));
    }

    let mut ledger = MissedTurns::new(config.max_missed_turns);
    let mut completed = false;
    let mut rounds = 0;
    while rounds < config.max_rounds && !completed {
        rounds += 1;
        let mut events = Vec::new();
        completed = play_round(
            config,
            rounds,
            &mut map,
            &mut units,
            &mut inbound,
            &mut ledger,
            &mut events,
        )
        .await?;
        observe(&RoundReport {
            round: rounds,
            map: &map,
            events: &events,
        });

        if !completed && !config.turn_delay().is_zero() {
            tokio::time::sleep(config.turn_delay()).await;
        }
    }

    while let Ok(message) = inbound.try_recv() {
        completed |= matches!(message, AgentMessage::MissionComplete { .. });
    }
    if completed {
        tracing::info!(rounds, "objective secured");
    } else {
        tracing::warn!(rounds, "mission abandoned after the round limit");
    }

    let lost = ledger.lost().collect();
    shut_down(units, &broker).await;
    broker.shutdown().await;

    Ok(Outcome {
        rounds,
        completed,
        lost,
        map,
    })
}

async fn play_round(
    config: &SimulationConfig,
    round: u32,
    map: &mut MissionMap,
    units: &mut [Unit],
    inbound: &mut UnboundedReceiver<AgentMessage>,
    ledger: &mut MissedTurns,
    events: &mut Vec<Event>,
) -> Result<bool, RuntimeError> {
    let mut requested = Vec::new();
    let mut pending = PendingReplies::new(round);

    for unit in units.iter_mut().filter(|unit| unit.active) {
        let Some(location) = map.location_of(unit.agent) else {
            tracing::info!(agent = %unit.agent, "unit left the map");
            unit.retire();
            continue;
        };
        let window = map.window_around(location, unit.vision)?;
        requested.push(unit.agent);
        if unit.turns.send(SimMessage::your_turn(round, window)).is_ok() {
            pending.expect(unit.agent);
        }
    }

    let mut actions: BTreeMap<AgentId, Action> = BTreeMap::new();
    let mut completed = false;
    let deadline = Instant::now() + config.turn_timeout();
    while !pending.is_empty() {
        match tokio::time::timeout_at(deadline, inbound.recv()).await {
            Ok(Some(AgentMessage::TakeTurn {
                from,
                round: answered,
                action,
                ..
            })) => {
                if !pending.accept(from, answered) {
                    tracing::debug!(agent = %from, answered, round, "discarding stale turn reply");
                    continue;
                }
                let _ = actions.insert(from, action);
            }
            Ok(Some(AgentMessage::MissionComplete { from, .. })) => {
                tracing::info!(leader = %from, "mission complete reported");
                completed = true;
            }
            Ok(None) | Err(_) => break,
        }
    }

    for agent in requested {
        let replied = actions.contains_key(&agent);
        if !replied {
            tracing::debug!(%agent, "turn missed");
        }
        if ledger.record(agent, replied) {
            tracing::warn!(%agent, missed = config.max_missed_turns, "unit lost");
            if let Some(unit) = units.iter_mut().find(|unit| unit.agent == agent) {
                unit.retire();
            }
        }
    }

    for (agent, action) in actions {
        world::apply(map, agent, action, events);
    }
    Ok(completed)
}

async fn shut_down(units: Vec<Unit>, broker: &Broker) {
    for unit in units {
        unit.stop();
        if let Err(error) = unit.task.await {
            tracing::warn!(agent = %unit.agent, %error, "unit task ended abnormally");
        }
        if let AgentId::Warbot(id) = unit.agent {
            let _ = broker.unsubscribe(id);
        }
    }
}

/// Turn replies still owed for one round.
#[derive(Debug)]
struct PendingReplies {
    round: u32,
    waiting: BTreeSet<AgentId>,
}

impl PendingReplies {
    fn new(round: u32) -> Self {
        Self {
            round,
            waiting: BTreeSet::new(),
        }
    }

    fn expect(&mut self, agent: AgentId) {
        let _ = self.waiting.insert(agent);
    }

    /// Accepts the first reply `agent` sends for this round; anything else is stale.
    fn accept(&mut self, agent: AgentId, answered: u32) -> bool {
        answered == self.round && self.waiting.remove(&agent)
    }

    fn is_empty(&self) -> bool {
        self.waiting.is_empty()
    }
}

struct Unit {
    agent: AgentId,
    vision: u32,
    turns: UnboundedSender<SimMessage>,
    task: JoinHandle<()>,
    active: bool,
}

impl Unit {
    fn new(
        agent: AgentId,
        vision: u32,
        turns: UnboundedSender<SimMessage>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            agent,
            vision,
            turns,
            task,
            active: true,
        }
    }

    fn stop(&self) {
        if self.turns.send(SimMessage::shutdown()).is_err() {
            tracing::trace!(agent = %self.agent, "unit already stopped");
        }
    }

    fn retire(&mut self) {
        self.stop();
        self.active = false;
    }
}

/// Consecutive missed turns per unit.
#[derive(Debug)]
struct MissedTurns {
    limit: u32,
    missed: BTreeMap<AgentId, u32>,
    lost: BTreeSet<AgentId>,
}

impl MissedTurns {
    fn new(limit: u32) -> Self {
        Self {
            limit,
            missed: BTreeMap::new(),
            lost: BTreeSet::new(),
        }
    }

    /// Records one round for `agent`, reporting whether it just became lost.
    fn record(&mut self, agent: AgentId, replied: bool) -> bool {
        if replied {
            let _ = self.missed.remove(&agent);
            return false;
        }

        let missed = self.missed.entry(agent).or_insert(0);
        *missed += 1;
        *missed >= self.limit && self.lost.insert(agent)
    }

    fn lost(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.lost.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warbots_core::OpforId;

    fn hostile(number: u8) -> AgentId {
        OpforId::new(number).expect("valid id").into()
    }

    #[test]
    fn units_are_lost_after_consecutive_misses() {
        let mut ledger = MissedTurns::new(3);
        assert!(!ledger.record(hostile(1), false));
        assert!(!ledger.record(hostile(1), false));
        assert!(ledger.record(hostile(1), false));
        assert!(!ledger.record(hostile(1), false));
        assert_eq!(ledger.lost().collect::<Vec<_>>(), vec![hostile(1)]);
    }

    #[test]
    fn late_replies_to_an_earlier_round_are_stale() {
        let mut pending = PendingReplies::new(4);
        pending.expect(hostile(1));
        pending.expect(hostile(2));

        assert!(!pending.accept(hostile(1), 3));
        assert!(pending.accept(hostile(1), 4));
        assert!(!pending.accept(hostile(1), 4));
        assert!(!pending.accept(hostile(3), 4));
        assert!(!pending.is_empty());
        assert!(pending.accept(hostile(2), 4));
        assert!(pending.is_empty());
    }

    #[test]
    fn replies_reset_the_miss_count() {
        let mut ledger = MissedTurns::new(2);
        assert!(!ledger.record(hostile(2), false));
        assert!(!ledger.record(hostile(2), true));
        assert!(!ledger.record(hostile(2), false));
        assert!(ledger.lost().next().is_none());
    }
}
