//! Bluetooth HCI (Host Controller Interface) implementation
//!
//! This module provides the packet layout, command encoders and the Linux
//! socket used to talk to a controller.

pub mod command;
pub mod constants;
pub mod packet;
pub mod socket;


pub use command::{CommandParam, LeEventMask, LinkPolicy};
pub use packet::{CommandComplete, CommandStatus, HciEvent, Opcode, PacketType};
pub use socket::{HciChannel, HciSocket};
