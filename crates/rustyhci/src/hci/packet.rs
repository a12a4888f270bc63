//! HCI packet structures and parsing
//!
//! This module contains the packet type tag, the command opcode and the
//! event packet layout shared by the transport and the command subsystem.

use crate::error::{HciError, HciResult};
use crate::hci::constants::*;
use byteorder::{ByteOrder, LittleEndian};
use std::convert::TryFrom;
use std::fmt;

/// Packet type tag carried in the first byte of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Command,
    AclData,
    ScoData,
    Event,
    Vendor,
}

impl TryFrom<u8> for PacketType {
    type Error = HciError;

    fn try_from(raw: u8) -> HciResult<Self> {
        match raw {
            HCI_COMMAND_PKT => Ok(PacketType::Command),
            HCI_ACL_PKT => Ok(PacketType::AclData),
            HCI_SCO_PKT => Ok(PacketType::ScoData),
            HCI_EVENT_PKT => Ok(PacketType::Event),
            HCI_VENDOR_PKT => Ok(PacketType::Vendor),
            other => Err(HciError::UnknownPacketType(other)),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(ty: PacketType) -> u8 {
        match ty {
            PacketType::Command => HCI_COMMAND_PKT,
            PacketType::AclData => HCI_ACL_PKT,
            PacketType::ScoData => HCI_SCO_PKT,
            PacketType::Event => HCI_EVENT_PKT,
            PacketType::Vendor => HCI_VENDOR_PKT,
        }
    }
}

/// A 16-bit HCI command opcode
///
/// The upper 6 bits hold the OGF and the lower 10 bits the OCF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Build an opcode from its group and command fields
    pub const fn new(ogf: u8, ocf: u16) -> Self {
        Opcode(((ogf as u16) << 10) | (ocf & 0x03ff))
    }

    /// Decode an opcode from its little-endian wire form
    ///
    /// Returns `None` if fewer than two bytes are available.
    pub fn from_le_slice(data: &[u8]) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }
        Some(Opcode(LittleEndian::read_u16(data)))
    }

    pub fn value(&self) -> u16 {
        self.0
    }

    pub fn ogf(&self) -> u8 {
        (self.0 >> 10) as u8
    }

    pub fn ocf(&self) -> u16 {
        self.0 & 0x03ff
    }

    /// Human-readable name for the commands this crate knows about
    pub fn name(&self) -> &'static str {
        match (self.ogf(), self.ocf()) {
            (0, 0) => "NOP",
            (OGF_LINK_CTL, OCF_INQUIRY) => "Inquiry",
            (OGF_LINK_CTL, OCF_INQUIRY_CANCEL) => "InquiryCancel",
            (OGF_LINK_CTL, OCF_CREATE_CONNECTION) => "CreateConnection",
            (OGF_LINK_CTL, OCF_DISCONNECT) => "Disconnect",
            (OGF_LINK_POLICY, OCF_SNIFF_MODE) => "SniffMode",
            (OGF_LINK_POLICY, OCF_EXIT_SNIFF_MODE) => "ExitSniffMode",
            (OGF_LINK_POLICY, OCF_WRITE_DEFAULT_LINK_POLICY) => "WriteDefaultLinkPolicy",
            (OGF_HOST_CTL, OCF_SET_EVENT_MASK) => "SetEventMask",
            (OGF_HOST_CTL, OCF_RESET) => "Reset",
            (OGF_HOST_CTL, OCF_SET_EVENT_FILTER) => "SetEventFilter",
            (OGF_HOST_CTL, OCF_WRITE_PAGE_TIMEOUT) => "WritePageTimeout",
            (OGF_HOST_CTL, OCF_WRITE_CLASS_OF_DEVICE) => "WriteClassOfDevice",
            (OGF_HOST_CTL, OCF_HOST_BUFFER_SIZE) => "HostBufferSize",
            (OGF_HOST_CTL, OCF_WRITE_INQUIRY_SCAN_TYPE) => "WriteInquiryScanType",
            (OGF_HOST_CTL, OCF_WRITE_INQUIRY_MODE) => "WriteInquiryMode",
            (OGF_HOST_CTL, OCF_WRITE_PAGE_SCAN_TYPE) => "WritePageScanType",
            (OGF_HOST_CTL, OCF_WRITE_SIMPLE_PAIRING_MODE) => "WriteSimplePairingMode",
            (OGF_HOST_CTL, OCF_SET_EVENT_MASK_PAGE_2) => "SetEventMaskPage2",
            (OGF_HOST_CTL, OCF_WRITE_LE_HOST_SUPPORTED) => "WriteLEHostSupported",
            (OGF_INFO_PARAM, OCF_READ_LOCAL_VERSION) => "ReadLocalVersionInformation",
            (OGF_INFO_PARAM, OCF_READ_BUFFER_SIZE) => "ReadBufferSize",
            (OGF_INFO_PARAM, OCF_READ_BD_ADDR) => "ReadBDADDR",
            (OGF_LE, OCF_LE_SET_EVENT_MASK) => "LESetEventMask",
            (OGF_LE, OCF_LE_READ_BUFFER_SIZE) => "LEReadBufferSize",
            (OGF_LE, OCF_LE_SET_ADVERTISING_ENABLE) => "LESetAdvertiseEnable",
            (OGF_LE, OCF_LE_SET_SCAN_PARAMETERS) => "LESetScanParameters",
            (OGF_LE, OCF_LE_SET_SCAN_ENABLE) => "LESetScanEnable",
            (OGF_LE, OCF_LE_CREATE_CONNECTION) => "LECreateConnection",
            (OGF_LE, OCF_LE_CREATE_CONNECTION_CANCEL) => "LECreateConnectionCancel",
            (OGF_VENDOR, _) => "Vendor",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:04X})", self.name(), self.0)
    }
}

/// HCI Event packet, without the leading packet type byte
#[derive(Debug, Clone)]
pub struct HciEvent {
    pub event_code: u8,
    pub parameter_total_length: u8,
    pub parameters: Vec<u8>,
}

impl HciEvent {
    /// Parse an HCI event from raw bytes
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HCI_EVENT_HDR_SIZE {
            return None;
        }

        let event_code = data[0];
        let parameter_total_length = data[1];

        let end = parameter_total_length as usize + HCI_EVENT_HDR_SIZE;
        if data.len() < end {
            return None;
        }

        let parameters = data[HCI_EVENT_HDR_SIZE..end].to_vec();

        Some(HciEvent {
            event_code,
            parameter_total_length,
            parameters,
        })
    }
}

/// Parameters of a Command Complete event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandComplete {
    /// Number of command packets the controller can accept
    pub num_hci_command_packets: u8,
    pub opcode: Opcode,
    /// Return parameters, starting with the status byte for most commands
    pub return_parameters: Vec<u8>,
}

impl CommandComplete {
    pub fn parse(params: &[u8]) -> Option<Self> {
        if params.len() < 3 {
            return None;
        }
        Some(Self {
            num_hci_command_packets: params[0],
            opcode: Opcode::from_le_slice(&params[1..3])?,
            return_parameters: params[3..].to_vec(),
        })
    }
}

/// Parameters of a Command Status event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    pub status: u8,
    /// Number of command packets the controller can accept
    pub num_hci_command_packets: u8,
    pub opcode: Opcode,
}

impl CommandStatus {
    pub fn parse(params: &[u8]) -> Option<Self> {
        if params.len() < 4 {
            return None;
        }
        Some(Self {
            status: params[0],
            num_hci_command_packets: params[1],
            opcode: Opcode::from_le_slice(&params[2..4])?,
        })
    }
}
