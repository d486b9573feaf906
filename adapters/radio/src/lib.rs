#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Broadcast radio shared by the squad.
//!
//! A single [`Broker`] owns a relay task that fans every frame posted on the
//! central channel out to each subscribed warbot. Frames travel as JSON text
//! produced by [`warbots_core::wire`], so a subscriber decodes what it reads
//! and skips anything malformed. Delivery is at least once per subscriber and
//! first-in first-out per sender; nothing is acknowledged.

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::Mutex;
use thiserror::Error;
use tokio::{
    sync::{
        mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender},
        oneshot,
    },
    task::JoinHandle,
    time::Instant,
};
use warbots_core::{wire, RadioBody, RadioMessage, WarbotId, WireError};

type Subscribers = Arc<Mutex<HashMap<WarbotId, UnboundedSender<String>>>>;

/// Errors raised by the radio.
#[derive(Debug, Error)]
pub enum RadioError {
    /// The warbot already holds a subscription.
    #[error("{id} is already subscribed to the radio")]
    AlreadySubscribed {
        /// Warbot that subscribed twice.
        id: WarbotId,
    },
    /// The broker shut down.
    #[error("radio broker is closed")]
    Closed,
    /// A frame could not be encoded.
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Fan-out hub relaying every frame to every subscriber.
#[derive(Debug)]
pub struct Broker {
    frames: UnboundedSender<String>,
    subscribers: Subscribers,
    stop: oneshot::Sender<()>,
    relay: JoinHandle<()>,
}

impl Broker {
    /// Starts the relay task on the current tokio runtime.
    #[must_use]
    pub fn spawn() -> Self {
        let (frames, inbound) = mpsc::unbounded_channel();
        let (stop, stopped) = oneshot::channel();
        let subscribers = Subscribers::default();
        let relay = tokio::spawn(relay(inbound, stopped, Arc::clone(&subscribers)));
        tracing::debug!("radio broker started");

        Self {
            frames,
            subscribers,
            stop,
            relay,
        }
    }

    /// Registers `id` and hands back its radio.
    pub fn subscribe(&self, id: WarbotId) -> Result<Radio, RadioError> {
        let mut subscribers = self.subscribers.lock();
        if subscribers.contains_key(&id) {
            return Err(RadioError::AlreadySubscribed { id });
        }

        let (sender, inbound) = mpsc::unbounded_channel();
        let _ = subscribers.insert(id, sender);
        tracing::debug!(warbot = %id, subscribers = subscribers.len(), "radio subscribed");

        Ok(Radio {
            id,
            outbound: self.frames.clone(),
            inbound,
        })
    }

    /// Drops the subscription of `id`, reporting whether it existed.
    pub fn unsubscribe(&self, id: WarbotId) -> bool {
        let removed = self.subscribers.lock().remove(&id).is_some();
        if removed {
            tracing::debug!(warbot = %id, "radio unsubscribed");
        }
        removed
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Stops the relay and closes every remaining subscription.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(error) = self.relay.await {
            tracing::warn!(%error, "radio relay ended abnormally");
        }
        self.subscribers.lock().clear();
        tracing::debug!("radio broker stopped");
    }
}

async fn relay(
    mut frames: UnboundedReceiver<String>,
    mut stopped: oneshot::Receiver<()>,
    subscribers: Subscribers,
) {
    loop {
        tokio::select! {
            _ = &mut stopped => break,
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    break;
                };
                fan_out(&subscribers, &frame);
            }
        }
    }
}

fn fan_out(subscribers: &Subscribers, frame: &str) {
    for (id, sender) in subscribers.lock().iter() {
        if sender.send(frame.to_owned()).is_err() {
            tracing::trace!(warbot = %id, "subscriber gone, frame dropped");
        }
    }
}

/// One warbot's handle on the squad radio.
#[derive(Debug)]
pub struct Radio {
    id: WarbotId,
    outbound: UnboundedSender<String>,
    inbound: UnboundedReceiver<String>,
}

impl Radio {
    /// Warbot owning the handle.
    #[must_use]
    pub const fn id(&self) -> WarbotId {
        self.id
    }

    /// Stamps `body` with the sender and the current time and broadcasts it.
    pub fn send(&self, body: RadioBody) -> Result<(), RadioError> {
        let frame = wire::encode(&RadioMessage::new(self.id, body))?;
        self.outbound.send(frame).map_err(|_| RadioError::Closed)
    }

    /// Drains every frame that already arrived without waiting.
    pub fn receive_all(&mut self) -> Vec<RadioMessage> {
        let mut messages = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(frame) => messages.extend(self.accept(&frame)),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        messages
    }

    /// Waits up to `timeout` for the next frame from another warbot.
    ///
    /// Returns `Ok(None)` when the wait runs out and [`RadioError::Closed`]
    /// once the broker shut down.
    pub async fn wait_next(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<RadioMessage>, RadioError> {
        let deadline = Instant::now() + timeout;
        loop {
            match tokio::time::timeout_at(deadline, self.inbound.recv()).await {
                Ok(Some(frame)) => {
                    if let Some(message) = self.accept(&frame) {
                        return Ok(Some(message));
                    }
                }
                Ok(None) => return Err(RadioError::Closed),
                Err(_) => return Ok(None),
            }
        }
    }

    fn accept(&self, frame: &str) -> Option<RadioMessage> {
        match wire::decode::<RadioMessage>(frame) {
            Ok(message) if message.from == self.id => None,
            Ok(message) => Some(message),
            Err(error) => {
                tracing::warn!(warbot = %self.id, %error, frame, "skipping malformed radio frame");
                None
            }
        }
    }
}
