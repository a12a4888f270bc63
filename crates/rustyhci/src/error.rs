//! Error types for the rustyhci library
//!
//! This module defines the error types used throughout the library.

use crate::hci::packet::{Opcode, PacketType};
use crate::transport::bringup::Stage;
use thiserror::Error;

/// Errors that can occur while driving an HCI transport
#[derive(Error, Debug)]
pub enum HciError {
    #[error("Failed to open HCI socket: {0}")]
    SocketError(#[from] std::io::Error),

    #[error("Failed to bind to HCI device: {0}")]
    BindError(std::io::Error),

    #[error("Failed to send HCI command: {0}")]
    SendError(std::io::Error),

    #[error("Failed to close controller link: {0}")]
    CloseError(std::io::Error),

    #[error("Invalid parameter length: {0}")]
    InvalidParamLength(usize),

    #[error("Invalid HCI packet format")]
    InvalidPacketFormat,

    #[error("{0:?} packet not supported")]
    Unsupported(PacketType),

    #[error("Unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    #[error("Unexpected response to {opcode}: expected [{}], got [{}]", hex::encode(.expected), hex::encode(.actual))]
    UnexpectedResponse {
        opcode: Opcode,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    #[error("Timed out waiting for response to {0}")]
    CommandTimeout(Opcode),

    #[error("A command with opcode {0} is already outstanding")]
    CommandPending(Opcode),

    #[error("Event code 0x{0:02X} already has a handler")]
    DuplicateEventHandler(u8),

    #[error("Failed to spawn thread: {0}")]
    Spawn(std::io::Error),

    #[error("Transport already started")]
    AlreadyStarted,

    #[error("Controller link closed")]
    LinkClosed,

    #[error("Bring-up failed at {stage} step {step} ({opcode}): {source}")]
    BringUp {
        stage: Stage,
        step: usize,
        opcode: Opcode,
        #[source]
        source: Box<HciError>,
    },

    #[error("Handler error: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Result type for HCI operations
pub type HciResult<T> = std::result::Result<T, HciError>;
