//! Packet demultiplexer
//!
//! Classifies each inbound frame by its packet type byte and hands the
//! payload to the matching subsystem.

use crate::command::CommandChannel;
use crate::error::{HciError, HciResult};
use crate::event::EventDispatcher;
use crate::hci::constants::{EVT_CMD_COMPLETE, EVT_CMD_STATUS, HCI_EVENT_PKT};
use crate::hci::packet::{Opcode, PacketType};
use crate::l2cap::L2capHandler;
use log::{info, warn};
use std::convert::TryFrom;
use std::sync::Arc;

/// Routes frames to the command, event and L2CAP subsystems
pub struct Demux {
    events: EventDispatcher,
    l2cap: Arc<dyn L2capHandler>,
}

impl Demux {
    pub fn new(events: EventDispatcher, l2cap: Arc<dyn L2capHandler>) -> Self {
        Self { events, l2cap }
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Route one frame, starting with its packet type byte
    pub fn handle_packet(&self, frame: &[u8]) -> HciResult<()> {
        let (&tag, payload) = frame.split_first().ok_or(HciError::InvalidPacketFormat)?;
        match PacketType::try_from(tag)? {
            PacketType::Command => {
                self.handle_command(payload);
                Ok(())
            }
            PacketType::AclData => self.l2cap.on_data_frame(payload),
            PacketType::ScoData => Err(HciError::Unsupported(PacketType::ScoData)),
            PacketType::Event => self.events.dispatch(payload),
            PacketType::Vendor => Err(HciError::Unsupported(PacketType::Vendor)),
        }
    }

    /// Whether `frame` is a Command Complete or Command Status event
    pub fn is_command_response(frame: &[u8]) -> bool {
        matches!(
            frame,
            [HCI_EVENT_PKT, EVT_CMD_COMPLETE | EVT_CMD_STATUS, ..]
        )
    }

    /// Route one frame, logging any failure with the frame's bytes
    pub fn dispatch(&self, frame: &[u8]) {
        if let Err(e) = self.handle_packet(frame) {
            warn!("hci: {}, [{}]", e, hex::encode(frame));
        }
    }

    // A command on the inbound path was issued by another host-side agent
    // sharing the controller, usually the kernel.
    fn handle_command(&self, payload: &[u8]) {
        match Opcode::from_le_slice(payload) {
            Some(opcode) => info!("unmanaged cmd: {}", opcode),
            None => info!("unmanaged cmd: truncated [{}]", hex::encode(payload)),
        }
    }
}

/// Wire the five routed events to their subsystems
///
/// LE Meta, Disconnection Complete and Number Of Completed Packets go to
/// L2CAP; Command Complete and Command Status go to the command channel.
pub fn event_routes(
    commands: &Arc<dyn CommandChannel>,
    l2cap: &Arc<dyn L2capHandler>,
) -> HciResult<EventDispatcher> {
    use crate::event::EventRoutes;
    use crate::hci::constants::*;

    let le_meta = Arc::clone(l2cap);
    let disconnected = Arc::clone(l2cap);
    let completed = Arc::clone(l2cap);
    let complete = Arc::clone(commands);
    let status = Arc::clone(commands);

    Ok(EventRoutes::new()
        .route(EVT_LE_META_EVENT, move |p| le_meta.on_le_meta(p))?
        .route(EVT_DISCONN_COMPLETE, move |p| {
            disconnected.on_disconnection_complete(p)
        })?
        .route(EVT_NUM_COMP_PKTS, move |p| {
            completed.on_number_of_completed_packets(p)
        })?
        .route(EVT_CMD_COMPLETE, move |p| complete.on_command_complete(p))?
        .route(EVT_CMD_STATUS, move |p| status.on_command_status(p))?
        .build())
}
