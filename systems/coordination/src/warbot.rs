//! Per-unit coordination state machine.

use std::collections::BTreeSet;

use warbots_core::{
    doctrine::{
        member_offset, perimeter_offset, FLANKING_DISTANCE, FLANKING_OFFSETS,
        LEADER_OBJECTIVE_STANDOFF, QUORUM_WAIT_TURNS, SUPPRESSIVE_OFFSETS,
        TEAM_ASSIGNMENT_WAIT_CYCLES,
    },
    Action, Direction, Offset, Point, RadioBody, RadioMessage, TeamAssignment, VisibleWindow,
    WarbotId,
};
use warbots_world::{FlankingRoute, MapView, VisibleMap};

use crate::{
    election::Election,
    teams::{assign_teams, formation_slot, Role},
    travel::Travel,
    CoordinationError, Outbound,
};

/// Maneuver phase a warbot is in, in the order the squad moves through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhaseKind {
    /// Choosing the squad leader.
    Election,
    /// Waiting for or handing out team roles.
    TeamAssignment,
    /// Forming the squad column wedge at the rally point.
    Formation,
    /// Advancing on the objective.
    Movement,
    /// Suppressing and flanking after hostiles were seen.
    Contact,
    /// Team A lifts fire while team B assaults across the objective.
    LiftAndShift,
    /// Taking up the security perimeter.
    SecureObjective,
    /// Nothing left to do.
    Complete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Phase {
    Election(Election),
    TeamAssignment { waited_cycles: u32 },
    Formation(Formation),
    Movement { last_waypoint: Option<Point> },
    Contact(Contact),
    LiftAndShift(Assault),
    SecureObjective(Perimeter),
    Complete,
}

impl Phase {
    fn kind(&self) -> PhaseKind {
        match self {
            Self::Election(_) => PhaseKind::Election,
            Self::TeamAssignment { .. } => PhaseKind::TeamAssignment,
            Self::Formation(_) => PhaseKind::Formation,
            Self::Movement { .. } => PhaseKind::Movement,
            Self::Contact(_) => PhaseKind::Contact,
            Self::LiftAndShift(_) => PhaseKind::LiftAndShift,
            Self::SecureObjective(_) => PhaseKind::SecureObjective,
            Self::Complete => PhaseKind::Complete,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Formation {
    reported: bool,
    waited_turns: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FlankLeg {
    Waypoint,
    Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Contact {
    leg: FlankLeg,
    reported: bool,
    waited_turns: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Assault {
    limit: Option<Point>,
    fire_next: bool,
    reported: bool,
    waited_turns: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Perimeter {
    waited_turns: u32,
}

/// Leader-originated orders and shared positions heard over the radio.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Signals {
    start_movement: bool,
    waypoint: Option<Point>,
    contact: Option<Point>,
    suppressive_position: Option<Point>,
    flank: Option<FlankingRoute>,
    lift_and_shift: bool,
    secure_objective: bool,
}

/// Peer acknowledgements tallied by the squad leader.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Tallies {
    ready: BTreeSet<WarbotId>,
    ready_to_flank: BTreeSet<WarbotId>,
    limit_of_advance: BTreeSet<WarbotId>,
    perimeter: BTreeSet<WarbotId>,
}

/// Autonomous squad member.
///
/// The warbot never performs I/O. [`Warbot::handle_radio`] runs once per
/// receive cycle and advances the election and team assignment;
/// [`Warbot::take_turn`] runs once per orchestrator round and advances every
/// later phase before deriving the round's action. Frames to broadcast and
/// reports for the orchestrator are pushed to the caller's outbox.
#[derive(Clone, Debug)]
pub struct Warbot {
    id: WarbotId,
    rally_point: Point,
    objective: Point,
    location: Point,
    visible: Option<VisibleMap>,
    peers: BTreeSet<WarbotId>,
    lost: BTreeSet<WarbotId>,
    leader: Option<WarbotId>,
    assignment: Option<TeamAssignment>,
    role: Option<Role>,
    formation_offset: Offset,
    phase: Phase,
    signals: Signals,
    tallies: Tallies,
    travel: Option<Travel>,
    fire_at: Option<Point>,
    pulse: Option<Point>,
}

impl Warbot {
    /// Creates a warbot that knows the mission's rally point and objective.
    #[must_use]
    pub fn new(id: WarbotId, location: Point, rally_point: Point, objective: Point) -> Self {
        Self {
            id,
            rally_point,
            objective,
            location,
            visible: None,
            peers: BTreeSet::new(),
            lost: BTreeSet::new(),
            leader: None,
            assignment: None,
            role: None,
            formation_offset: Offset::new(0, 0),
            phase: Phase::Election(Election::default()),
            signals: Signals::default(),
            tallies: Tallies::default(),
            travel: None,
            fire_at: None,
            pulse: None,
        }
    }

    /// Announces the warbot on the radio and enters the election.
    pub fn start(&mut self, out: &mut Vec<Outbound>) {
        tracing::debug!(warbot = %self.id, "joining the squad radio");
        out.push(Outbound::Radio(RadioBody::WarbotOnline));
        out.push(Outbound::Radio(RadioBody::ElectionNameDeclare));
    }

    /// Identity of the warbot.
    #[must_use]
    pub const fn id(&self) -> WarbotId {
        self.id
    }

    /// Last known location.
    #[must_use]
    pub const fn location(&self) -> Point {
        self.location
    }

    /// Squad leader the warbot currently follows, itself included.
    #[must_use]
    pub const fn leader(&self) -> Option<WarbotId> {
        self.leader
    }

    /// Reports whether the warbot leads the squad.
    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.leader == Some(self.id)
    }

    /// Team assignment the warbot adopted.
    #[must_use]
    pub fn assignment(&self) -> Option<&TeamAssignment> {
        self.assignment.as_ref()
    }

    /// Role taken from the team assignment.
    #[must_use]
    pub const fn role(&self) -> Option<Role> {
        self.role
    }

    /// Current maneuver phase.
    #[must_use]
    pub fn phase(&self) -> PhaseKind {
        self.phase.kind()
    }

    /// Peers excluded from quorum counts after failing to report in time.
    #[must_use]
    pub fn lost_peers(&self) -> &BTreeSet<WarbotId> {
        &self.lost
    }

    /// Window the warbot saw on its latest turn.
    #[must_use]
    pub fn visible_map(&self) -> Option<&VisibleMap> {
        self.visible.as_ref()
    }

    /// Processes one receive cycle worth of radio frames.
    ///
    /// Fails only when a signal only the squad leader can give never came.
    pub fn handle_radio(
        &mut self,
        inbox: &[RadioMessage],
        out: &mut Vec<Outbound>,
    ) -> Result<(), CoordinationError> {
        for message in inbox {
            if message.from != self.id {
                self.observe(message, out);
            }
        }

        let mut won = false;
        match &mut self.phase {
            Phase::Election(election) => {
                won = election.finish_cycle();
                if election.is_defeated() && election.waited_cycles() > TEAM_ASSIGNMENT_WAIT_CYCLES {
                    return Err(CoordinationError::Stalled {
                        id: self.id,
                        waiting_for: "election result",
                        cycles: election.waited_cycles(),
                    });
                }
            }
            Phase::TeamAssignment { waited_cycles } => {
                *waited_cycles = waited_cycles.saturating_add(1);
                if *waited_cycles > TEAM_ASSIGNMENT_WAIT_CYCLES {
                    return Err(CoordinationError::Stalled {
                        id: self.id,
                        waiting_for: "team assignment",
                        cycles: *waited_cycles,
                    });
                }
            }
            _ => {}
        }

        if won {
            self.claim_leadership(out);
        }
        if self.is_leader() && self.phase.kind() == PhaseKind::TeamAssignment {
            self.hand_out_teams(out);
        }
        Ok(())
    }

    /// Advances turn-driven work on a fresh window and picks the round's action.
    pub fn take_turn(&mut self, window: VisibleWindow, out: &mut Vec<Outbound>) -> Action {
        let map = VisibleMap::new(window);
        self.location = map.location();

        match self.phase.kind() {
            PhaseKind::Election | PhaseKind::TeamAssignment | PhaseKind::Complete => {}
            PhaseKind::Formation => self.formation_turn(&map, out),
            PhaseKind::Movement => self.movement_turn(&map, out),
            PhaseKind::Contact => self.contact_turn(&map, out),
            PhaseKind::LiftAndShift => self.lift_and_shift_turn(&map, out),
            PhaseKind::SecureObjective => self.secure_turn(&map, out),
        }

        let action = self.decide(&map);
        self.visible = Some(map);
        action
    }

    fn observe(&mut self, message: &RadioMessage, out: &mut Vec<Outbound>) {
        let from = message.from;
        let from_leader = self.leader == Some(from);
        match &message.body {
            RadioBody::WarbotOnline | RadioBody::ElectionNameDeclare => {
                let newcomer = self.peers.insert(from);
                if newcomer && self.is_leader() && self.phase.kind() <= PhaseKind::Formation {
                    tracing::info!(warbot = %self.id, %from, "late peer, reassigning teams");
                    out.push(Outbound::Radio(RadioBody::ElectionEnd { winner: self.id }));
                    self.phase = Phase::TeamAssignment { waited_cycles: 0 };
                }
                if let Phase::Election(election) = &mut self.phase {
                    if let Some(compare) = election.observe_candidate(self.id, from) {
                        out.push(Outbound::Radio(compare));
                    }
                }
            }
            RadioBody::ElectionCompare { winner, loser } => {
                for peer in [*winner, *loser] {
                    if peer != self.id {
                        let _ = self.peers.insert(peer);
                    }
                }
                if let Phase::Election(election) = &mut self.phase {
                    election.observe_compare(self.id, *winner, *loser);
                }
            }
            RadioBody::ElectionEnd { winner } => self.adopt_leader(*winner),
            RadioBody::TeamAssignment(assignment) => self.adopt_assignment(assignment),
            RadioBody::ReadyForMovement => {
                let _ = self.tallies.ready.insert(from);
            }
            RadioBody::StartMovement if from_leader => self.signals.start_movement = true,
            RadioBody::SquadLeaderWaypoint { waypoint } if from_leader => {
                self.signals.waypoint = Some(*waypoint);
            }
            RadioBody::Contact { location } => self.signals.contact = Some(*location),
            RadioBody::SuppressiveFirePosition { location } if from_leader => {
                self.signals.suppressive_position = Some(*location);
            }
            RadioBody::FlankingPosition { location, waypoint } => {
                let from_team_b_leader = self
                    .assignment
                    .as_ref()
                    .is_some_and(|assignment| assignment.team_b_leader == from);
                if from_team_b_leader {
                    self.signals.flank = Some(FlankingRoute {
                        position: *location,
                        waypoint: *waypoint,
                    });
                }
            }
            RadioBody::ReadyToFlank => {
                let _ = self.tallies.ready_to_flank.insert(from);
            }
            RadioBody::LiftAndShift if from_leader => self.signals.lift_and_shift = true,
            RadioBody::LimitOfAdvance => {
                let _ = self.tallies.limit_of_advance.insert(from);
            }
            RadioBody::SecureObjective if from_leader => self.signals.secure_objective = true,
            RadioBody::InSecurityPerimeterPosition => {
                let _ = self.tallies.perimeter.insert(from);
            }
            other => {
                tracing::debug!(warbot = %self.id, %from, ?other, "ignoring order from a non-leader");
            }
        }
    }

    fn claim_leadership(&mut self, out: &mut Vec<Outbound>) {
        tracing::info!(warbot = %self.id, peers = self.peers.len(), "won the election");
        self.leader = Some(self.id);
        out.push(Outbound::Radio(RadioBody::ElectionEnd { winner: self.id }));
        self.phase = Phase::TeamAssignment { waited_cycles: 0 };
    }

    fn hand_out_teams(&mut self, out: &mut Vec<Outbound>) {
        let Some(assignment) = assign_teams(self.id, self.peers.iter().copied()) else {
            return;
        };
        tracing::info!(
            warbot = %self.id,
            team_b_leader = %assignment.team_b_leader,
            team_a = assignment.team_a.len(),
            team_b = assignment.team_b.len(),
            "assigned teams"
        );
        out.push(Outbound::Radio(RadioBody::TeamAssignment(assignment.clone())));
        self.apply_assignment(assignment);
    }

    fn adopt_leader(&mut self, winner: WarbotId) {
        if self.outranks_in_election(winner) {
            tracing::debug!(warbot = %self.id, %winner, "still contesting the election");
            return;
        }
        if let Some(current) = self.leader {
            if current <= winner {
                if current != winner {
                    tracing::debug!(warbot = %self.id, %current, %winner, "ignoring competing election end");
                }
                return;
            }
        }
        if self.phase.kind() >= PhaseKind::Movement {
            tracing::warn!(warbot = %self.id, %winner, "election end arrived after the squad moved out");
            return;
        }

        tracing::debug!(warbot = %self.id, %winner, "adopting squad leader");
        self.leader = Some(winner);
        let current_assignment = self
            .assignment
            .as_ref()
            .is_some_and(|assignment| assignment.squad_leader == winner);
        if !current_assignment {
            self.assignment = None;
            self.role = None;
            self.travel = None;
            self.phase = Phase::TeamAssignment { waited_cycles: 0 };
        }
    }

    fn adopt_assignment(&mut self, assignment: &TeamAssignment) {
        if self.outranks_in_election(assignment.squad_leader) {
            return;
        }
        if let Some(current) = self.leader {
            if assignment.squad_leader > current {
                tracing::debug!(warbot = %self.id, leader = %assignment.squad_leader, "ignoring assignment from a displaced leader");
                return;
            }
        }
        if self.phase.kind() >= PhaseKind::Movement || self.assignment.as_ref() == Some(assignment) {
            return;
        }

        self.leader = Some(assignment.squad_leader);
        self.apply_assignment(assignment.clone());
    }

    /// Reports whether the warbot is undefeated in an election it would win against `winner`.
    fn outranks_in_election(&self, winner: WarbotId) -> bool {
        let contesting = matches!(&self.phase, Phase::Election(election) if !election.is_defeated());
        contesting && self.id < winner
    }

    fn apply_assignment(&mut self, assignment: TeamAssignment) {
        let Some(role) = Role::from_assignment(&assignment, self.id) else {
            tracing::warn!(warbot = %self.id, leader = %assignment.squad_leader, "left out of the team assignment");
            self.phase = Phase::TeamAssignment { waited_cycles: 0 };
            return;
        };

        let slot = formation_slot(self.rally_point, role);
        let leader_slot = formation_slot(self.rally_point, Role::SquadLeader);
        tracing::debug!(warbot = %self.id, ?role, %slot, "taking formation slot");

        self.role = Some(role);
        self.formation_offset = slot - leader_slot;
        self.assignment = Some(assignment);
        self.tallies = Tallies::default();
        self.travel = Some(Travel::new(slot));
        self.phase = Phase::Formation(Formation {
            reported: false,
            waited_turns: 0,
        });
    }

    fn formation_turn(&mut self, map: &VisibleMap, out: &mut Vec<Outbound>) {
        let Phase::Formation(mut formation) = self.phase.clone() else {
            return;
        };
        let arrived = self.settle(map);

        if self.is_leader() {
            if arrived {
                formation.waited_turns += 1;
                let expected = self.expected_peers(|assignment| assignment.members().collect());
                let reported = self.tallies.ready.clone();
                if self.quorum_reached(&expected, &reported, formation.waited_turns, "ready for movement") {
                    tracing::info!(warbot = %self.id, "squad formed, moving out");
                    out.push(Outbound::Radio(RadioBody::StartMovement));
                    self.enter_movement();
                    return;
                }
            }
        } else {
            if arrived && !formation.reported {
                out.push(Outbound::Radio(RadioBody::ReadyForMovement));
                formation.reported = true;
            }
            if self.signals.start_movement {
                self.enter_movement();
                return;
            }
        }

        self.phase = Phase::Formation(formation);
    }

    fn movement_turn(&mut self, map: &VisibleMap, out: &mut Vec<Outbound>) {
        let Phase::Movement { mut last_waypoint } = self.phase.clone() else {
            return;
        };
        if self.signals.secure_objective {
            self.enter_secure();
            return;
        }
        if let Some(hostile) = map.closest_opfor(self.location) {
            tracing::info!(warbot = %self.id, %hostile, "contact");
            out.push(Outbound::Radio(RadioBody::Contact { location: hostile }));
            self.signals.contact = Some(hostile);
        }
        if self.signals.contact.is_some() {
            self.enter_contact(map, out);
            return;
        }

        let standoff = self.objective + LEADER_OBJECTIVE_STANDOFF;
        if self.is_leader() {
            self.head_for(standoff);
            if self.settle(map) {
                tracing::info!(warbot = %self.id, "objective reached without contact");
                out.push(Outbound::Radio(RadioBody::SecureObjective));
                self.signals.secure_objective = true;
                self.enter_secure();
                return;
            }
            if !map.on_map(self.objective) {
                let waypoint = map
                    .find_closest_boundary_point(standoff)
                    .filter(|waypoint| Some(*waypoint) != last_waypoint);
                if let Some(waypoint) = waypoint {
                    out.push(Outbound::Radio(RadioBody::SquadLeaderWaypoint { waypoint }));
                    last_waypoint = Some(waypoint);
                }
            }
        } else {
            let anchor = if map.on_map(self.objective) {
                Some(standoff)
            } else {
                self.signals.waypoint
            };
            if let Some(anchor) = anchor {
                self.head_for(anchor + self.formation_offset);
            }
        }

        self.phase = Phase::Movement { last_waypoint };
    }

    fn enter_movement(&mut self) {
        self.travel = None;
        self.fire_at = None;
        self.phase = Phase::Movement {
            last_waypoint: None,
        };
    }

    fn enter_contact(&mut self, map: &VisibleMap, out: &mut Vec<Outbound>) {
        self.travel = None;
        self.fire_at = None;

        match self.role {
            Some(Role::SquadLeader) => {
                tracing::info!(warbot = %self.id, location = %self.location, "establishing base of fire");
                out.push(Outbound::Radio(RadioBody::SuppressiveFirePosition {
                    location: self.location,
                }));
                self.signals.suppressive_position = Some(self.location);
                self.fire_at = Some(self.suppression_target());
            }
            Some(Role::TeamBLeader) => {
                let route = map
                    .find_flanking_position(self.objective, self.location)
                    .unwrap_or_else(|| {
                        let position = self.objective + Direction::East.scaled_vector(FLANKING_DISTANCE);
                        FlankingRoute {
                            position,
                            waypoint: Point::new(position.x(), self.location.y()),
                        }
                    });
                tracing::info!(warbot = %self.id, position = %route.position, waypoint = %route.waypoint, "flanking");
                out.push(Outbound::Radio(RadioBody::FlankingPosition {
                    location: route.position,
                    waypoint: route.waypoint,
                }));
                self.signals.flank = Some(route);
            }
            Some(Role::TeamAMember { .. } | Role::TeamBMember { .. }) | None => {}
        }

        self.phase = Phase::Contact(Contact {
            leg: FlankLeg::Waypoint,
            reported: false,
            waited_turns: 0,
        });
    }

    fn contact_turn(&mut self, map: &VisibleMap, out: &mut Vec<Outbound>) {
        let Phase::Contact(mut contact) = self.phase.clone() else {
            return;
        };
        if self.signals.secure_objective {
            self.enter_secure();
            return;
        }

        match self.role {
            Some(Role::SquadLeader) => {
                contact.waited_turns += 1;
                self.fire_at = Some(self.suppression_target());
                let expected = self.expected_peers(|assignment| assignment.team_b.clone());
                let reported = self.tallies.ready_to_flank.clone();
                if self.quorum_reached(&expected, &reported, contact.waited_turns, "ready to flank") {
                    tracing::info!(warbot = %self.id, "lift and shift");
                    out.push(Outbound::Radio(RadioBody::LiftAndShift));
                    self.signals.lift_and_shift = true;
                    self.enter_lift_and_shift(map);
                    return;
                }
            }
            Some(Role::TeamAMember { index }) => {
                if self.signals.lift_and_shift {
                    self.enter_lift_and_shift(map);
                    return;
                }
                if let Some(line) = self.signals.suppressive_position {
                    let mut position = line + member_offset(&SUPPRESSIVE_OFFSETS, index);
                    if map.on_map(position) && !map.is_navigable(position) {
                        position = map.line_position(line, self.location);
                    }
                    self.head_for(position);
                    if self.settle(map) {
                        self.fire_at = Some(self.suppression_target());
                    }
                }
            }
            Some(Role::TeamBLeader | Role::TeamBMember { .. }) => {
                if self.signals.lift_and_shift {
                    self.enter_lift_and_shift(map);
                    return;
                }
                if let Some(route) = self.signals.flank {
                    let offset = self.flank_offset();
                    match contact.leg {
                        FlankLeg::Waypoint => {
                            self.head_for(route.waypoint + offset);
                            if self.settle(map) {
                                contact.leg = FlankLeg::Position;
                                self.head_for(route.position + offset);
                            }
                        }
                        FlankLeg::Position => {
                            self.head_for(route.position + offset);
                            if self.settle(map) && !contact.reported {
                                tracing::info!(warbot = %self.id, "in flanking position");
                                out.push(Outbound::Radio(RadioBody::ReadyToFlank));
                                contact.reported = true;
                            }
                        }
                    }
                }
            }
            None => {}
        }

        self.phase = Phase::Contact(contact);
    }

    fn enter_lift_and_shift(&mut self, map: &VisibleMap) {
        self.travel = None;
        self.fire_at = None;

        let limit = match self.role {
            Some(Role::TeamBLeader | Role::TeamBMember { .. }) => Some(self.limit_of_advance(map)),
            _ => None,
        };
        self.phase = Phase::LiftAndShift(Assault {
            limit,
            fire_next: true,
            reported: false,
            waited_turns: 0,
        });
    }

    /// Point beyond the objective where the flanking sweep stops.
    fn limit_of_advance(&self, map: &VisibleMap) -> Point {
        let Some(route) = self.signals.flank else {
            return self.location;
        };
        let start = route.position + self.flank_offset();
        let Some(direction) = Direction::between(route.position, self.objective) else {
            return start;
        };

        let distance = i32::try_from(route.position.chebyshev_distance(self.objective)).unwrap_or(0);
        let limit = start + direction.scaled_vector(distance.saturating_mul(2));
        let limit = Point::new(limit.x().max(0), limit.y().max(0));
        tracing::debug!(warbot = %self.id, %limit, visible = map.on_map(limit), "limit of advance");
        limit
    }

    fn lift_and_shift_turn(&mut self, map: &VisibleMap, out: &mut Vec<Outbound>) {
        let Phase::LiftAndShift(mut assault) = self.phase.clone() else {
            return;
        };
        if self.signals.secure_objective {
            self.enter_secure();
            return;
        }

        match (self.role, assault.limit) {
            (Some(Role::SquadLeader), _) => {
                assault.waited_turns += 1;
                let expected = self.expected_peers(|assignment| assignment.team_b.clone());
                let reported = self.tallies.limit_of_advance.clone();
                if self.quorum_reached(&expected, &reported, assault.waited_turns, "limit of advance") {
                    tracing::info!(warbot = %self.id, "securing the objective");
                    out.push(Outbound::Radio(RadioBody::SecureObjective));
                    self.signals.secure_objective = true;
                    self.enter_secure();
                    return;
                }
            }
            (_, Some(limit)) if !assault.reported => {
                self.head_for(limit);
                if self.settle(map) {
                    tracing::info!(warbot = %self.id, "reached limit of advance");
                    out.push(Outbound::Radio(RadioBody::LimitOfAdvance));
                    assault.reported = true;
                } else {
                    if assault.fire_next {
                        self.pulse = Some(limit);
                    }
                    assault.fire_next = !assault.fire_next;
                }
            }
            _ => {}
        }

        self.phase = Phase::LiftAndShift(assault);
    }

    fn enter_secure(&mut self) {
        let position = self.objective + perimeter_offset(self.id.get());
        tracing::debug!(warbot = %self.id, %position, "moving to the security perimeter");
        self.fire_at = None;
        self.pulse = None;
        self.travel = Some(Travel::new(position));
        self.phase = Phase::SecureObjective(Perimeter { waited_turns: 0 });
    }

    fn secure_turn(&mut self, map: &VisibleMap, out: &mut Vec<Outbound>) {
        let Phase::SecureObjective(mut perimeter) = self.phase.clone() else {
            return;
        };
        let arrived = self.settle(map);

        if self.is_leader() {
            if arrived {
                perimeter.waited_turns += 1;
                let expected = self.expected_peers(|assignment| assignment.members().collect());
                let reported = self.tallies.perimeter.clone();
                if self.quorum_reached(&expected, &reported, perimeter.waited_turns, "security perimeter") {
                    tracing::info!(warbot = %self.id, "mission complete");
                    out.push(Outbound::MissionComplete);
                    self.phase = Phase::Complete;
                    return;
                }
            }
        } else if arrived {
            out.push(Outbound::Radio(RadioBody::InSecurityPerimeterPosition));
            self.phase = Phase::Complete;
            return;
        }

        self.phase = Phase::SecureObjective(perimeter);
    }

    /// Picks the round's action: a pending fire pulse, then the next step, then standing fire.
    fn decide(&mut self, map: &VisibleMap) -> Action {
        if let Some(target) = self.pulse.take() {
            if let Some(action) = self.fire(target) {
                return action;
            }
        }
        if let Some(travel) = self.travel.as_mut() {
            if let Some(location) = travel.next_step(map) {
                return Action::MoveTo { location };
            }
        }
        self.fire_at
            .and_then(|target| self.fire(target))
            .unwrap_or(Action::DoNothing)
    }

    fn fire(&self, target: Point) -> Option<Action> {
        Direction::between(self.location, target).map(|direction| Action::FireAt {
            location: target,
            direction,
        })
    }

    /// Last reported hostile, or the objective when nobody has reported one.
    fn suppression_target(&self) -> Point {
        self.signals.contact.unwrap_or(self.objective)
    }

    /// Points travel at `target`, keeping progress when the target is unchanged.
    fn head_for(&mut self, target: Point) {
        if self.travel.as_ref().map(Travel::target) != Some(target) {
            self.travel = Some(Travel::new(target));
        }
    }

    /// Reports arrival, dropping the finished travel.
    fn settle(&mut self, map: &VisibleMap) -> bool {
        let arrived = self.travel.as_ref().map_or(true, |travel| travel.arrived(map));
        if arrived {
            self.travel = None;
        }
        arrived
    }

    fn flank_offset(&self) -> Offset {
        match self.role {
            Some(Role::TeamBMember { index }) => member_offset(&FLANKING_OFFSETS, index),
            _ => Offset::new(0, 0),
        }
    }

    /// Peers selected from the assignment, minus this warbot and anyone lost.
    fn expected_peers<F>(&self, select: F) -> BTreeSet<WarbotId>
    where
        F: FnOnce(&TeamAssignment) -> Vec<WarbotId>,
    {
        self.assignment
            .as_ref()
            .map(select)
            .unwrap_or_default()
            .into_iter()
            .filter(|peer| *peer != self.id && !self.lost.contains(peer))
            .collect()
    }

    /// Reports whether every expected peer reported, excluding stragglers once the wait runs out.
    fn quorum_reached(
        &mut self,
        expected: &BTreeSet<WarbotId>,
        reported: &BTreeSet<WarbotId>,
        waited_turns: u32,
        waiting_for: &'static str,
    ) -> bool {
        let missing: Vec<WarbotId> = expected.difference(reported).copied().collect();
        if missing.is_empty() {
            return true;
        }
        if waited_turns <= QUORUM_WAIT_TURNS {
            return false;
        }

        for peer in missing {
            tracing::warn!(warbot = %self.id, %peer, waiting_for, "peer lost");
            let _ = self.lost.insert(peer);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warbots_core::{
        doctrine::{ELECTION_WINNER_WAIT_CYCLES, WARBOT_VISION_DISTANCE},
        OpforId, Terrain,
    };
    use warbots_world::MissionMap;

    const RALLY_POINT: Point = Point::new(20, 30);
    const OBJECTIVE: Point = Point::new(20, 8);

    fn id(number: u8) -> WarbotId {
        WarbotId::new(number).expect("valid id")
    }

    fn from(number: u8, body: RadioBody) -> RadioMessage {
        RadioMessage::new(id(number), body)
    }

    fn mission() -> MissionMap {
        let mut map = MissionMap::new(40, 40, Terrain::Dirt);
        map.place_objective(OBJECTIVE).expect("objective");
        map.place_rally_point(RALLY_POINT).expect("rally point");
        map
    }

    fn window(map: &MissionMap, warbot: &Warbot) -> VisibleWindow {
        let location = map.warbot_location(warbot.id()).expect("on the map");
        map.window_around(location, WARBOT_VISION_DISTANCE)
            .expect("window")
    }

    fn count(out: &[Outbound], wanted: &RadioBody) -> usize {
        out.iter()
            .filter(|outbound| matches!(outbound, Outbound::Radio(body) if body == wanted))
            .count()
    }

    fn elected_leader(map: &mut MissionMap) -> Warbot {
        let location = Point::new(20, 25);
        map.place_unit(id(1).into(), location).expect("placed");
        let mut leader = Warbot::new(id(1), location, RALLY_POINT, OBJECTIVE);
        let mut out = Vec::new();
        leader.start(&mut out);

        let declarations: Vec<_> = (2..=4)
            .map(|number| from(number, RadioBody::ElectionNameDeclare))
            .collect();
        leader.handle_radio(&declarations, &mut out).expect("radio");
        for _ in 0..ELECTION_WINNER_WAIT_CYCLES {
            leader.handle_radio(&[], &mut out).expect("radio");
        }

        assert!(leader.is_leader());
        assert_eq!(count(&out, &RadioBody::ElectionEnd { winner: id(1) }), 1);
        leader
    }

    #[test]
    fn leader_hands_out_teams_and_takes_the_head_of_the_wedge() {
        let mut map = mission();
        let leader = elected_leader(&mut map);
        let assignment = leader.assignment().expect("assignment");
        assert_eq!(assignment.team_b_leader, id(2));
        assert_eq!(assignment.team_a, vec![id(1), id(3)]);
        assert_eq!(assignment.team_b, vec![id(2), id(4)]);
        assert_eq!(leader.role(), Some(Role::SquadLeader));
        assert_eq!(leader.phase(), PhaseKind::Formation);
    }

    #[test]
    fn lift_and_shift_is_ordered_exactly_once() {
        let mut map = mission();
        let mut leader = elected_leader(&mut map);
        let mut out = Vec::new();

        let ready: Vec<_> = (2..=4)
            .map(|number| from(number, RadioBody::ReadyForMovement))
            .collect();
        leader.handle_radio(&ready, &mut out).expect("radio");
        let _ = leader.take_turn(window(&map, &leader), &mut out);
        assert_eq!(leader.phase(), PhaseKind::Movement);
        assert_eq!(count(&out, &RadioBody::StartMovement), 1);

        let hostile = Point::new(20, 14);
        map.place_unit(OpforId::new(1).expect("valid id").into(), hostile)
            .expect("placed");
        let action = leader.take_turn(window(&map, &leader), &mut out);
        assert_eq!(leader.phase(), PhaseKind::Contact);
        assert_eq!(count(&out, &RadioBody::Contact { location: hostile }), 1);
        assert_eq!(
            count(
                &out,
                &RadioBody::SuppressiveFirePosition {
                    location: Point::new(20, 25)
                }
            ),
            1
        );
        assert_eq!(
            action,
            Action::FireAt {
                location: hostile,
                direction: Direction::North,
            }
        );

        let flank_ready = [
            from(2, RadioBody::ReadyToFlank),
            from(4, RadioBody::ReadyToFlank),
            from(4, RadioBody::ReadyToFlank),
        ];
        leader.handle_radio(&flank_ready, &mut out).expect("radio");
        for _ in 0..5 {
            let _ = leader.take_turn(window(&map, &leader), &mut out);
            leader
                .handle_radio(&[from(2, RadioBody::ReadyToFlank)], &mut out)
                .expect("radio");
        }

        assert_eq!(count(&out, &RadioBody::LiftAndShift), 1);
        assert_eq!(leader.phase(), PhaseKind::LiftAndShift);
    }

    #[test]
    fn perimeter_wait_starts_when_the_leader_arrives() {
        let mut map = mission();
        let mut leader = elected_leader(&mut map);
        let mut out = Vec::new();

        let ready: Vec<_> = (2..=4)
            .map(|number| from(number, RadioBody::ReadyForMovement))
            .collect();
        leader.handle_radio(&ready, &mut out).expect("radio");
        let _ = leader.take_turn(window(&map, &leader), &mut out);
        map.place_unit(OpforId::new(1).expect("valid id").into(), Point::new(20, 14))
            .expect("placed");
        let _ = leader.take_turn(window(&map, &leader), &mut out);
        assert_eq!(leader.phase(), PhaseKind::Contact);

        let flank_ready = [from(2, RadioBody::ReadyToFlank), from(4, RadioBody::ReadyToFlank)];
        leader.handle_radio(&flank_ready, &mut out).expect("radio");
        let _ = leader.take_turn(window(&map, &leader), &mut out);
        let limits = [from(2, RadioBody::LimitOfAdvance), from(4, RadioBody::LimitOfAdvance)];
        leader.handle_radio(&limits, &mut out).expect("radio");
        let _ = leader.take_turn(window(&map, &leader), &mut out);
        assert_eq!(leader.phase(), PhaseKind::SecureObjective);

        // The leader is held in place, so the trip outlasts the quorum wait.
        for _ in 0..QUORUM_WAIT_TURNS + 10 {
            let _ = leader.take_turn(window(&map, &leader), &mut out);
        }
        assert_eq!(leader.phase(), PhaseKind::SecureObjective);

        let _ = map.move_unit(id(1).into(), OBJECTIVE + perimeter_offset(1))
            .expect("free cell");
        let _ = leader.take_turn(window(&map, &leader), &mut out);
        assert_eq!(leader.phase(), PhaseKind::SecureObjective);
        assert!(leader.lost_peers().is_empty());

        let reports: Vec<_> = (2..=4)
            .map(|number| from(number, RadioBody::InSecurityPerimeterPosition))
            .collect();
        leader.handle_radio(&reports, &mut out).expect("radio");
        let _ = leader.take_turn(window(&map, &leader), &mut out);
        assert_eq!(leader.phase(), PhaseKind::Complete);
        assert!(leader.lost_peers().is_empty());
        let completions = out
            .iter()
            .filter(|outbound| matches!(outbound, Outbound::MissionComplete))
            .count();
        assert_eq!(completions, 1);
    }

    #[test]
    fn team_a_falls_back_onto_the_firing_line_and_aims_at_the_hostile() {
        let mut map = mission();
        let slot = Point::new(18, 27);
        map.place_unit(id(3).into(), slot).expect("placed");
        let line = Point::new(22, 25);
        map.set_terrain(line + member_offset(&SUPPRESSIVE_OFFSETS, 1), Terrain::Water)
            .expect("in bounds");
        let mut member = Warbot::new(id(3), slot, RALLY_POINT, OBJECTIVE);
        let mut out = Vec::new();

        let assignment = assign_teams(id(1), [id(2), id(3)]).expect("assignment");
        member
            .handle_radio(&[from(1, RadioBody::TeamAssignment(assignment))], &mut out)
            .expect("radio");
        member
            .handle_radio(&[from(1, RadioBody::StartMovement)], &mut out)
            .expect("radio");
        let _ = member.take_turn(window(&map, &member), &mut out);
        assert_eq!(member.phase(), PhaseKind::Movement);

        let hostile = Point::new(20, 14);
        let orders = [
            from(2, RadioBody::Contact { location: hostile }),
            from(1, RadioBody::SuppressiveFirePosition { location: line }),
        ];
        member.handle_radio(&orders, &mut out).expect("radio");
        let _ = member.take_turn(window(&map, &member), &mut out);
        assert_eq!(member.phase(), PhaseKind::Contact);

        let firing_line = Point::new(18, 25);
        match member.take_turn(window(&map, &member), &mut out) {
            Action::MoveTo { location } => assert_eq!(location.chebyshev_distance(firing_line), 1),
            other => panic!("expected a step toward the firing line, got {other:?}"),
        }

        let _ = map.move_unit(id(3).into(), firing_line).expect("free cell");
        assert_eq!(
            member.take_turn(window(&map, &member), &mut out),
            Action::FireAt {
                location: hostile,
                direction: Direction::NorthEast,
            }
        );
    }

    #[test]
    fn silent_peers_are_marked_lost_once_the_quorum_wait_expires() {
        let mut map = mission();
        let mut leader = elected_leader(&mut map);
        let mut out = Vec::new();

        let ready = [
            from(2, RadioBody::ReadyForMovement),
            from(3, RadioBody::ReadyForMovement),
        ];
        leader.handle_radio(&ready, &mut out).expect("radio");
        for _ in 0..QUORUM_WAIT_TURNS {
            let _ = leader.take_turn(window(&map, &leader), &mut out);
            assert_eq!(leader.phase(), PhaseKind::Formation);
        }

        let _ = leader.take_turn(window(&map, &leader), &mut out);
        assert_eq!(leader.phase(), PhaseKind::Movement);
        assert_eq!(leader.lost_peers().iter().copied().collect::<Vec<_>>(), vec![id(4)]);
    }

    #[test]
    fn followers_converge_on_the_lowest_announced_leader() {
        let mut follower = Warbot::new(id(3), Point::new(18, 27), RALLY_POINT, OBJECTIVE);
        let mut out = Vec::new();

        follower
            .handle_radio(&[from(2, RadioBody::ElectionEnd { winner: id(2) })], &mut out)
            .expect("radio");
        assert_eq!(follower.leader(), Some(id(2)));
        assert_eq!(follower.phase(), PhaseKind::TeamAssignment);

        follower
            .handle_radio(&[from(1, RadioBody::ElectionEnd { winner: id(1) })], &mut out)
            .expect("radio");
        follower
            .handle_radio(&[from(2, RadioBody::ElectionEnd { winner: id(2) })], &mut out)
            .expect("radio");
        assert_eq!(follower.leader(), Some(id(1)));

        let displaced = assign_teams(id(2), [id(3)]).expect("assignment");
        follower
            .handle_radio(&[from(2, RadioBody::TeamAssignment(displaced))], &mut out)
            .expect("radio");
        assert_eq!(follower.phase(), PhaseKind::TeamAssignment);

        let assignment = assign_teams(id(1), [id(2), id(3)]).expect("assignment");
        follower
            .handle_radio(&[from(1, RadioBody::TeamAssignment(assignment))], &mut out)
            .expect("radio");
        assert_eq!(follower.phase(), PhaseKind::Formation);
        assert_eq!(follower.role(), Some(Role::TeamAMember { index: 1 }));
    }

    #[test]
    fn followers_only_move_out_on_the_leaders_order() {
        let mut map = mission();
        let slot = Point::new(18, 27);
        map.place_unit(id(3).into(), slot).expect("placed");
        let mut follower = Warbot::new(id(3), slot, RALLY_POINT, OBJECTIVE);
        let mut out = Vec::new();

        let assignment = assign_teams(id(1), [id(2), id(3)]).expect("assignment");
        follower
            .handle_radio(&[from(1, RadioBody::TeamAssignment(assignment))], &mut out)
            .expect("radio");
        assert_eq!(formation_slot(RALLY_POINT, Role::TeamAMember { index: 1 }), slot);

        follower
            .handle_radio(&[from(2, RadioBody::StartMovement)], &mut out)
            .expect("radio");
        let _ = follower.take_turn(window(&map, &follower), &mut out);
        assert_eq!(follower.phase(), PhaseKind::Formation);
        assert_eq!(count(&out, &RadioBody::ReadyForMovement), 1);

        follower
            .handle_radio(&[from(1, RadioBody::StartMovement)], &mut out)
            .expect("radio");
        let _ = follower.take_turn(window(&map, &follower), &mut out);
        assert_eq!(follower.phase(), PhaseKind::Movement);
        assert_eq!(count(&out, &RadioBody::ReadyForMovement), 1);
    }

    #[test]
    fn defeated_units_stall_without_an_election_result() {
        let mut follower = Warbot::new(id(4), Point::new(0, 0), RALLY_POINT, OBJECTIVE);
        let mut out = Vec::new();
        follower
            .handle_radio(&[from(1, RadioBody::ElectionNameDeclare)], &mut out)
            .expect("radio");
        for _ in 1..TEAM_ASSIGNMENT_WAIT_CYCLES {
            follower.handle_radio(&[], &mut out).expect("radio");
        }

        let error = follower
            .handle_radio(&[], &mut out)
            .expect_err("stalled");
        assert_eq!(
            error,
            CoordinationError::Stalled {
                id: id(4),
                waiting_for: "election result",
                cycles: TEAM_ASSIGNMENT_WAIT_CYCLES + 1,
            }
        );
    }
}
