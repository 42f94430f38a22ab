use crossterm::event::{self, Event, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::api::models::{AgentListing, QueryResponse, ServerListing, ServerMutation};
use crate::api::GatewayError;
use crate::form::FormError;

/// Application events
#[derive(Debug)]
pub enum AppEvent {
    /// A key was pressed
    Key(KeyEvent),
    /// Time to refresh the registries
    Poll,
    /// Time to advance the workflow animation
    Animate,
    /// Terminal was resized
    #[allow(dead_code)]
    Resize(u16, u16),
    /// A server listing request finished
    Servers(Result<ServerListing, GatewayError>),
    /// An agent listing request finished
    Agents(Result<AgentListing, GatewayError>),
    /// A query request finished
    Answer {
        result: Result<QueryResponse, GatewayError>,
        elapsed: Duration,
    },
    /// An add-server form submission finished
    ServerAdded(Result<ServerMutation, FormError>),
    /// A delete or clear request finished; carries the status line text
    Done(Result<String, GatewayError>),
}

/// Handles input events, timers, and results of spawned requests
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<AppEvent>,
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl EventHandler {
    /// Create a new event handler with the given poll and animation rates
    pub fn new(poll_rate: Duration, animation_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            let mut poll_interval = tokio::time::interval(poll_rate);
            let mut animation_interval = tokio::time::interval(animation_rate);
            // The first tick of each interval fires immediately
            animation_interval.tick().await;

            loop {
                let event = tokio::select! {
                    _ = poll_interval.tick() => AppEvent::Poll,
                    _ = animation_interval.tick() => AppEvent::Animate,
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {
                        // Poll for crossterm events
                        if event::poll(Duration::from_millis(0)).unwrap_or(false) {
                            match event::read() {
                                Ok(Event::Key(key)) => AppEvent::Key(key),
                                Ok(Event::Resize(w, h)) => AppEvent::Resize(w, h),
                                _ => continue,
                            }
                        } else {
                            continue;
                        }
                    }
                };

                if event_tx.send(event).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Sender for tasks that report back into the event loop
    pub fn sender(&self) -> mpsc::UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    /// Get the next event
    pub async fn next(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}
