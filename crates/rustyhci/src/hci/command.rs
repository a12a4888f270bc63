//! HCI command parameter encoding
//!
//! Every command the host can issue implements [`CommandParam`], which gives
//! its opcode and writes its parameters in wire order.

use crate::error::{HciError, HciResult};
use crate::hci::constants::*;
use crate::hci::packet::Opcode;
use bitflags::bitflags;
use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt;
use std::io::{self, Write};

/// A command that can be sent to the controller
pub trait CommandParam: fmt::Debug + Send + Sync {
    /// Opcode identifying the command
    fn opcode(&self) -> Opcode;

    /// Write the command parameters, little-endian, without any header
    fn write_params(&self, w: &mut dyn Write) -> io::Result<()>;
}

/// Encode a command into a complete HCI command packet
///
/// The packet is `0x01 | opcode (le16) | parameter length | parameters`.
pub fn to_packet(command: &dyn CommandParam) -> HciResult<Vec<u8>> {
    let mut params = Vec::new();
    command.write_params(&mut params)?;
    if params.len() > HCI_MAX_PARAM_LEN {
        return Err(HciError::InvalidParamLength(params.len()));
    }

    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(HCI_COMMAND_PKT);
    packet.write_u16::<LittleEndian>(command.opcode().value())?;
    packet.push(params.len() as u8);
    packet.extend_from_slice(&params);
    Ok(packet)
}

bitflags! {
    /// LE Meta event subevents the controller is allowed to report
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LeEventMask: u64 {
        const CONNECTION_COMPLETE = 1 << 0;
        const ADVERTISING_REPORT = 1 << 1;
        const CONNECTION_UPDATE_COMPLETE = 1 << 2;
        const READ_REMOTE_FEATURES_COMPLETE = 1 << 3;
        const LONG_TERM_KEY_REQUEST = 1 << 4;
    }
}

bitflags! {
    /// Default link policy settings for new connections
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LinkPolicy: u16 {
        const ROLE_SWITCH = 1 << 0;
        const SNIFF_MODE = 1 << 2;
    }
}

/// HCI_Reset
#[derive(Debug, Clone, Copy, Default)]
pub struct Reset;

impl CommandParam for Reset {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_HOST_CTL, OCF_RESET)
    }

    fn write_params(&self, _w: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

/// HCI_Set_Event_Mask
#[derive(Debug, Clone, Copy)]
pub struct SetEventMask {
    pub event_mask: u64,
}

impl CommandParam for SetEventMask {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_HOST_CTL, OCF_SET_EVENT_MASK)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_u64::<LittleEndian>(self.event_mask)
    }
}

/// HCI_LE_Set_Event_Mask
#[derive(Debug, Clone, Copy)]
pub struct LeSetEventMask {
    pub le_event_mask: LeEventMask,
}

impl CommandParam for LeSetEventMask {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_LE, OCF_LE_SET_EVENT_MASK)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_u64::<LittleEndian>(self.le_event_mask.bits())
    }
}

/// HCI_Write_Simple_Pairing_Mode
#[derive(Debug, Clone, Copy)]
pub struct WriteSimplePairingMode {
    pub simple_pairing_mode: u8,
}

impl CommandParam for WriteSimplePairingMode {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_HOST_CTL, OCF_WRITE_SIMPLE_PAIRING_MODE)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_u8(self.simple_pairing_mode)
    }
}

/// HCI_Write_LE_Host_Support
#[derive(Debug, Clone, Copy)]
pub struct WriteLeHostSupported {
    pub le_supported_host: u8,
    pub simultaneous_le_host: u8,
}

impl CommandParam for WriteLeHostSupported {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_HOST_CTL, OCF_WRITE_LE_HOST_SUPPORTED)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_u8(self.le_supported_host)?;
        w.write_u8(self.simultaneous_le_host)
    }
}

/// HCI_Write_Inquiry_Mode
#[derive(Debug, Clone, Copy)]
pub struct WriteInquiryMode {
    pub inquiry_mode: u8,
}

impl CommandParam for WriteInquiryMode {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_HOST_CTL, OCF_WRITE_INQUIRY_MODE)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_u8(self.inquiry_mode)
    }
}

/// HCI_Write_Page_Scan_Type
#[derive(Debug, Clone, Copy)]
pub struct WritePageScanType {
    pub page_scan_type: u8,
}

impl CommandParam for WritePageScanType {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_HOST_CTL, OCF_WRITE_PAGE_SCAN_TYPE)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_u8(self.page_scan_type)
    }
}

/// HCI_Write_Inquiry_Scan_Type
#[derive(Debug, Clone, Copy)]
pub struct WriteInquiryScanType {
    pub scan_type: u8,
}

impl CommandParam for WriteInquiryScanType {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_HOST_CTL, OCF_WRITE_INQUIRY_SCAN_TYPE)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_u8(self.scan_type)
    }
}

/// HCI_Write_Class_Of_Device
#[derive(Debug, Clone, Copy)]
pub struct WriteClassOfDevice {
    pub class_of_device: [u8; 3],
}

impl CommandParam for WriteClassOfDevice {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_HOST_CTL, OCF_WRITE_CLASS_OF_DEVICE)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_all(&self.class_of_device)
    }
}

/// HCI_Write_Page_Timeout
#[derive(Debug, Clone, Copy)]
pub struct WritePageTimeout {
    /// Timeout in 0.625 ms slots
    pub page_timeout: u16,
}

impl CommandParam for WritePageTimeout {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_HOST_CTL, OCF_WRITE_PAGE_TIMEOUT)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self.page_timeout)
    }
}

/// HCI_Write_Default_Link_Policy_Settings
#[derive(Debug, Clone, Copy)]
pub struct WriteDefaultLinkPolicy {
    pub settings: LinkPolicy,
}

impl CommandParam for WriteDefaultLinkPolicy {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_LINK_POLICY, OCF_WRITE_DEFAULT_LINK_POLICY)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self.settings.bits())
    }
}

/// HCI_Host_Buffer_Size
#[derive(Debug, Clone, Copy)]
pub struct HostBufferSize {
    pub acl_data_packet_length: u16,
    pub synchronous_data_packet_length: u8,
    pub total_num_acl_data_packets: u16,
    pub total_num_synchronous_data_packets: u16,
}

impl CommandParam for HostBufferSize {
    fn opcode(&self) -> Opcode {
        Opcode::new(OGF_HOST_CTL, OCF_HOST_BUFFER_SIZE)
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_u16::<LittleEndian>(self.acl_data_packet_length)?;
        w.write_u8(self.synchronous_data_packet_length)?;
        w.write_u16::<LittleEndian>(self.total_num_acl_data_packets)?;
        w.write_u16::<LittleEndian>(self.total_num_synchronous_data_packets)
    }
}

/// A command given as a raw opcode and parameter block
///
/// Used for vendor commands whose payloads this crate does not model.
#[derive(Debug, Clone)]
pub struct RawCommand {
    pub opcode: Opcode,
    pub parameters: Vec<u8>,
}

impl RawCommand {
    pub fn new(ogf: u8, ocf: u16, parameters: Vec<u8>) -> Self {
        Self {
            opcode: Opcode::new(ogf, ocf),
            parameters,
        }
    }
}

impl CommandParam for RawCommand {
    fn opcode(&self) -> Opcode {
        self.opcode
    }

    fn write_params(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_all(&self.parameters)
    }
}
