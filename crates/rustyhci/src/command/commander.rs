//! Command sender over a controller link
//!
//! The commander writes encoded commands to the link and waits for the
//! controller's answer in a [`ResponseRegistry`]. Answers are fed in by the
//! event dispatcher through [`CommandChannel::on_command_complete`] and
//! [`CommandChannel::on_command_status`].

use super::registry::ResponseRegistry;
use super::CommandChannel;
use crate::error::{HciError, HciResult};
use crate::hci::command::{to_packet, CommandParam};
use crate::hci::packet::{CommandComplete, CommandStatus, Opcode};
use crate::link::ControllerLink;
use log::{debug, trace, warn};
use std::sync::Arc;
use std::time::Duration;

/// Commander configuration
#[derive(Debug, Clone, Default)]
pub struct CommanderConfig {
    /// Bound on how long a command waits for its response.
    /// `None` waits until the response arrives.
    pub response_timeout: Option<Duration>,
}

/// Sends commands and correlates their responses by opcode
pub struct Commander<L: ControllerLink> {
    link: Arc<L>,
    registry: ResponseRegistry,
    config: CommanderConfig,
}

impl<L: ControllerLink> Commander<L> {
    pub fn new(link: Arc<L>, config: CommanderConfig) -> Self {
        Self {
            link,
            registry: ResponseRegistry::new(),
            config,
        }
    }

    pub fn config(&self) -> &CommanderConfig {
        &self.config
    }

    /// Send `command` and return the raw response bytes
    ///
    /// For Command Complete these are the return parameters; for Command
    /// Status it is the single status byte.
    pub fn send(&self, command: &dyn CommandParam) -> HciResult<Vec<u8>> {
        let opcode = command.opcode();
        let packet = to_packet(command)?;

        // Register first so a fast controller cannot answer before we listen.
        let slot = self.registry.register(opcode)?;

        debug!("sending {}: {:?}", opcode, command);
        if let Err(e) = self.link.write(&packet) {
            self.registry.cancel(opcode);
            return Err(HciError::SendError(e));
        }

        match slot.wait(self.config.response_timeout) {
            Some(response) => Ok(response),
            None => {
                self.registry.cancel(opcode);
                Err(HciError::CommandTimeout(opcode))
            }
        }
    }

    fn deliver(&self, opcode: Opcode, response: Vec<u8>) {
        trace!("response for {}: [{}]", opcode, hex::encode(&response));
        if !self.registry.complete(opcode, response) {
            warn!("no outstanding command for {}", opcode);
        }
    }
}

impl<L: ControllerLink> CommandChannel for Commander<L> {
    fn send_and_verify(&self, command: &dyn CommandParam, expected: &[u8]) -> HciResult<()> {
        let response = self.send(command)?;
        if response != expected {
            return Err(HciError::UnexpectedResponse {
                opcode: command.opcode(),
                expected: expected.to_vec(),
                actual: response,
            });
        }
        Ok(())
    }

    fn on_command_complete(&self, params: &[u8]) -> HciResult<()> {
        let complete = CommandComplete::parse(params).ok_or(HciError::InvalidPacketFormat)?;
        // Opcode 0 only reports command credits.
        if complete.opcode.value() == 0 {
            trace!("controller ready for {} commands", complete.num_hci_command_packets);
            return Ok(());
        }
        self.deliver(complete.opcode, complete.return_parameters);
        Ok(())
    }

    fn on_command_status(&self, params: &[u8]) -> HciResult<()> {
        let status = CommandStatus::parse(params).ok_or(HciError::InvalidPacketFormat)?;
        if status.opcode.value() == 0 {
            trace!("controller ready for {} commands", status.num_hci_command_packets);
            return Ok(());
        }
        self.deliver(status.opcode, vec![status.status]);
        Ok(())
    }
}
