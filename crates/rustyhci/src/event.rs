//! HCI event routing
//!
//! Routes are collected in [`EventRoutes`] and frozen into an
//! [`EventDispatcher`], which is never modified afterwards and can be shared
//! between dispatch threads without locking.

use crate::error::{HciError, HciResult};
use crate::hci::packet::HciEvent;
use log::debug;
use std::collections::HashMap;
use std::fmt;

/// Handler for the parameters of one kind of event
pub type EventHandler = Box<dyn Fn(&[u8]) -> HciResult<()> + Send + Sync>;

/// Event code to handler mapping under construction
#[derive(Default)]
pub struct EventRoutes {
    handlers: HashMap<u8, EventHandler>,
}

impl EventRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route events with `event_code` to `handler`
    ///
    /// Each code takes exactly one handler.
    pub fn route<F>(mut self, event_code: u8, handler: F) -> HciResult<Self>
    where
        F: Fn(&[u8]) -> HciResult<()> + Send + Sync + 'static,
    {
        if self.handlers.contains_key(&event_code) {
            return Err(HciError::DuplicateEventHandler(event_code));
        }
        self.handlers.insert(event_code, Box::new(handler));
        Ok(self)
    }

    pub fn build(self) -> EventDispatcher {
        EventDispatcher {
            handlers: self.handlers,
        }
    }
}

/// Immutable event routing table
pub struct EventDispatcher {
    handlers: HashMap<u8, EventHandler>,
}

impl EventDispatcher {
    /// Dispatch an event packet (event code, length, parameters)
    ///
    /// The handler receives only the parameters. Events without a route are
    /// dropped.
    pub fn dispatch(&self, data: &[u8]) -> HciResult<()> {
        let event = HciEvent::parse(data).ok_or(HciError::InvalidPacketFormat)?;
        match self.handlers.get(&event.event_code) {
            Some(handler) => handler(&event.parameters),
            None => {
                debug!(
                    "unhandled event 0x{:02X} [{}]",
                    event.event_code,
                    hex::encode(&event.parameters)
                );
                Ok(())
            }
        }
    }

    /// Routed event codes in ascending order
    pub fn event_codes(&self) -> Vec<u8> {
        let mut codes: Vec<u8> = self.handlers.keys().copied().collect();
        codes.sort_unstable();
        codes
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("event_codes", &self.event_codes())
            .finish()
    }
}
