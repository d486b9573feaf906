//! ASCII frames of the mission map.

use std::fmt::Write as _;

use warbots_runtime::RoundReport;
use warbots_world::{query, Event, MissionMap};

/// Renders the map under a one-line status header.
pub(crate) fn render(round: u32, map: &MissionMap) -> String {
    let mut frame = format!(
        "round {round}  warbots {}  opfor {}\n",
        map.warbots().count(),
        map.opfor().count()
    );
    for row in query::render_rows(map) {
        frame.push_str(&row);
        frame.push('\n');
    }
    frame
}

/// Hostiles neutralized during the reported round.
pub(crate) fn neutralized(report: &RoundReport<'_>) -> usize {
    report
        .events
        .iter()
        .filter(|event| matches!(event, Event::OpforNeutralized { .. }))
        .count()
}

/// One-line summary printed once the run ends.
pub(crate) fn summary(rounds: u32, completed: bool, neutralized: usize, lost: usize) -> String {
    let mut line = String::new();
    let verdict = if completed {
        "objective secured"
    } else {
        "mission abandoned"
    };
    let _ = write!(
        line,
        "{verdict} after {rounds} rounds, {neutralized} hostiles neutralized"
    );
    if lost > 0 {
        let _ = write!(line, ", {lost} units lost");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use warbots_core::{Point, Terrain, WarbotId};

    #[test]
    fn frames_carry_a_header_and_every_row() {
        let mut map = MissionMap::new(4, 3, Terrain::Dirt);
        map.place_objective(Point::new(1, 0)).expect("objective");
        map.place_unit(WarbotId::new(3).expect("valid id").into(), Point::new(2, 2))
            .expect("placed");

        let frame = render(7, &map);
        let lines: Vec<_> = frame.lines().collect();
        assert_eq!(lines[0], "round 7  warbots 1  opfor 0");
        assert_eq!(lines[1], ".O..");
        assert_eq!(lines[2], "....");
        assert_eq!(lines[3], "..3.");
    }

    #[test]
    fn summaries_mention_losses_only_when_present() {
        assert_eq!(
            summary(120, true, 3, 0),
            "objective secured after 120 rounds, 3 hostiles neutralized"
        );
        assert_eq!(
            summary(9, false, 0, 2),
            "mission abandoned after 9 rounds, 0 hostiles neutralized, 2 units lost"
        );
    }
}
