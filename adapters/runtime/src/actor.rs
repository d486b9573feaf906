//! Per-unit tasks answering the turn protocol.

use std::time::Duration;

use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender},
    time::MissedTickBehavior,
};
use warbots_core::{AgentMessage, SimMessage, WarbotId};
use warbots_radio::Radio;
use warbots_system_coordination::{Outbound, Warbot};
use warbots_system_opfor::Opfor;

/// Drives one warbot until shutdown.
///
/// Each loop iteration serves whichever comes first: a turn request, the end
/// of a receive cycle, or the next radio frame. Frames are buffered until the
/// cycle ends and then handed to the coordination system in one batch.
pub(crate) async fn run_warbot(
    mut warbot: Warbot,
    mut radio: Radio,
    mut turns: UnboundedReceiver<SimMessage>,
    replies: UnboundedSender<AgentMessage>,
    cycle: Duration,
) {
    let id = warbot.id();
    let mut out = Vec::new();
    warbot.start(&mut out);
    publish(id, &radio, &replies, &mut out);

    let mut ticker = tokio::time::interval(cycle);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut inbox = Vec::new();

    loop {
        tokio::select! {
            biased;

            message = turns.recv() => {
                let Some(SimMessage::YourTurn { round, visible_map, .. }) = message else {
                    break;
                };
                let action = warbot.take_turn(visible_map, &mut out);
                publish(id, &radio, &replies, &mut out);
                if replies.send(AgentMessage::take_turn(id, round, action)).is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                inbox.extend(radio.receive_all());
                let frames = std::mem::take(&mut inbox);
                if let Err(error) = warbot.handle_radio(&frames, &mut out) {
                    tracing::error!(warbot = %id, %error, "coordination stalled, leaving the squad");
                    break;
                }
                publish(id, &radio, &replies, &mut out);
            }
            frame = radio.wait_next(cycle) => match frame {
                Ok(Some(message)) => inbox.push(message),
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(warbot = %id, %error, "radio lost");
                    break;
                }
            },
        }
    }

    tracing::debug!(warbot = %id, phase = ?warbot.phase(), "warbot stopped");
}

/// Drives one hostile until shutdown.
pub(crate) async fn run_opfor(
    mut opfor: Opfor,
    mut turns: UnboundedReceiver<SimMessage>,
    replies: UnboundedSender<AgentMessage>,
) {
    while let Some(SimMessage::YourTurn {
        round, visible_map, ..
    }) = turns.recv().await
    {
        let action = opfor.take_turn(visible_map);
        if replies.send(AgentMessage::take_turn(opfor.id(), round, action)).is_err() {
            break;
        }
    }
    tracing::debug!(opfor = %opfor.id(), turns = opfor.turns(), "hostile stopped");
}

fn publish(
    id: WarbotId,
    radio: &Radio,
    replies: &UnboundedSender<AgentMessage>,
    out: &mut Vec<Outbound>,
) {
    for outbound in out.drain(..) {
        match outbound {
            Outbound::Radio(body) => {
                if let Err(error) = radio.send(body) {
                    tracing::warn!(warbot = %id, %error, "radio frame not sent");
                }
            }
            Outbound::MissionComplete => {
                tracing::info!(warbot = %id, "reporting mission complete");
                if replies.send(AgentMessage::mission_complete(id)).is_err() {
                    tracing::debug!(warbot = %id, "orchestrator gone");
                }
            }
        }
    }
}
