//! Transport events
//!
//! The controller publishes an event for every observable change so a
//! renderer can redraw without polling. Each subscriber gets its own bounded
//! crossbeam channel; publishing never blocks the control thread.

use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::types::TransportState;

/// Events published by the transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A new track set replaced the previous one
    TrackSetLoaded { tracks: usize, duration: f64 },

    /// Transport state changed
    StateChanged {
        state: TransportState,
        position: f64,
    },

    /// The playhead jumped
    Seeked { position: f64 },

    /// A track was muted or unmuted
    MuteChanged { index: usize, muted: bool },

    /// Playback reached the end of the timeline and stopped
    EndOfTimeline,
}

/// Fan-out of transport events to any number of subscribers
pub struct EventBus {
    subscribers: Vec<Sender<TransportEvent>>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus whose subscribers buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Get a receiver for all events published from now on
    pub fn subscribe(&mut self) -> Receiver<TransportEvent> {
        let (tx, rx) = channel::bounded(self.capacity);
        self.subscribers.push(tx);
        rx
    }

    /// Publish an event to every subscriber
    ///
    /// A subscriber whose queue is full misses the event; disconnected
    /// subscribers are dropped.
    pub fn publish(&mut self, event: TransportEvent) {
        self.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::debug!("Event subscriber lagging, dropped {:?}", event);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
