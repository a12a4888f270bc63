//! Controller bring-up sequence
//!
//! Bring-up is a fixed list of commands, each paired with the response the
//! controller must give. The baseline steps reset the controller and set the
//! event masks; the vendor steps configure a freshly reset controller and
//! therefore only run once every baseline step has succeeded.

use crate::command::CommandChannel;
use crate::error::{HciError, HciResult};
use crate::hci::command::*;
use crate::hci::constants::{DEFAULT_EVENT_MASK, HCI_SUCCESS};
use log::{debug, info};
use std::fmt;

/// Response of a command that only returns a success status
pub const EXPECT_SUCCESS: &[u8] = &[HCI_SUCCESS];

/// Which list a bring-up step belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Baseline,
    Vendor,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Baseline => write!(f, "baseline"),
            Stage::Vendor => write!(f, "vendor"),
        }
    }
}

/// A command paired with the response it must produce
#[derive(Debug)]
pub struct CommandStep {
    command: Box<dyn CommandParam>,
    expected: Vec<u8>,
}

impl CommandStep {
    pub fn new<C: CommandParam + 'static>(command: C, expected: &[u8]) -> Self {
        Self {
            command: Box::new(command),
            expected: expected.to_vec(),
        }
    }

    /// Step expecting a bare success status
    pub fn expect_success<C: CommandParam + 'static>(command: C) -> Self {
        Self::new(command, EXPECT_SUCCESS)
    }

    pub fn command(&self) -> &dyn CommandParam {
        self.command.as_ref()
    }

    pub fn expected(&self) -> &[u8] {
        &self.expected
    }
}

/// Ordered baseline and vendor command lists
#[derive(Debug)]
pub struct BringUpSequence {
    baseline: Vec<CommandStep>,
    vendor: Vec<CommandStep>,
}

impl BringUpSequence {
    pub fn new(baseline: Vec<CommandStep>, vendor: Vec<CommandStep>) -> Self {
        Self { baseline, vendor }
    }

    pub fn baseline(&self) -> &[CommandStep] {
        &self.baseline
    }

    pub fn vendor(&self) -> &[CommandStep] {
        &self.vendor
    }

    /// Reset the controller and enable the events the host consumes
    pub fn default_baseline() -> Vec<CommandStep> {
        vec![
            CommandStep::expect_success(Reset),
            CommandStep::expect_success(SetEventMask {
                event_mask: DEFAULT_EVENT_MASK,
            }),
            CommandStep::expect_success(LeSetEventMask {
                le_event_mask: LeEventMask::all(),
            }),
        ]
    }

    /// Configuration for Broadcom controllers
    pub fn broadcom() -> Vec<CommandStep> {
        vec![
            CommandStep::expect_success(WriteSimplePairingMode {
                simple_pairing_mode: 1,
            }),
            CommandStep::expect_success(WriteLeHostSupported {
                le_supported_host: 1,
                simultaneous_le_host: 0,
            }),
            CommandStep::expect_success(WriteInquiryMode { inquiry_mode: 2 }),
            CommandStep::expect_success(WritePageScanType { page_scan_type: 1 }),
            CommandStep::expect_success(WriteInquiryScanType { scan_type: 1 }),
            CommandStep::expect_success(WriteClassOfDevice {
                class_of_device: [0x40, 0x02, 0x04],
            }),
            CommandStep::expect_success(WritePageTimeout {
                page_timeout: 0x2000,
            }),
            CommandStep::expect_success(WriteDefaultLinkPolicy {
                settings: LinkPolicy::ROLE_SWITCH | LinkPolicy::SNIFF_MODE,
            }),
            CommandStep::expect_success(HostBufferSize {
                acl_data_packet_length: 0x1000,
                synchronous_data_packet_length: 0xff,
                total_num_acl_data_packets: 0x0014,
                total_num_synchronous_data_packets: 0x000a,
            }),
        ]
    }

    /// Run every baseline step, then every vendor step
    ///
    /// Stops at the first step whose command fails or whose response does not
    /// match. Steps already applied are not undone.
    pub fn run(&self, commands: &dyn CommandChannel) -> HciResult<()> {
        run_stage(Stage::Baseline, &self.baseline, commands)?;
        run_stage(Stage::Vendor, &self.vendor, commands)?;
        info!(
            "controller initialized ({} commands)",
            self.baseline.len() + self.vendor.len()
        );
        Ok(())
    }
}

impl Default for BringUpSequence {
    fn default() -> Self {
        Self::new(Self::default_baseline(), Self::broadcom())
    }
}

fn run_stage(stage: Stage, steps: &[CommandStep], commands: &dyn CommandChannel) -> HciResult<()> {
    for (step, s) in steps.iter().enumerate() {
        let opcode = s.command().opcode();
        debug!("{} step {}: {}", stage, step, opcode);
        commands
            .send_and_verify(s.command(), s.expected())
            .map_err(|e| HciError::BringUp {
                stage,
                step,
                opcode,
                source: Box::new(e),
            })?;
    }
    Ok(())
}
