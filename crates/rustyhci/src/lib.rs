//! RustyHCI - host-side transport driver for the Bluetooth HCI
//!
//! This library turns the raw byte stream of a Bluetooth controller into
//! dispatched protocol events. A [`Transport`] reads frames from a
//! [`ControllerLink`], routes each one by its packet type to the command,
//! event or L2CAP subsystem, and brings the controller up with an ordered
//! list of commands before higher layers use it.

pub mod command;
pub mod error;
pub mod event;
pub mod hci;
pub mod l2cap;
pub mod link;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export common types for convenience
pub use command::{CommandChannel, Commander, CommanderConfig};
pub use error::{HciError, HciResult};
pub use event::{EventDispatcher, EventRoutes};
pub use hci::{CommandParam, HciChannel, HciSocket, Opcode, PacketType};
pub use l2cap::L2capHandler;
pub use link::ControllerLink;
pub use transport::{BringUpSequence, CloseReason, CommandStep, Transport, TransportConfig};
