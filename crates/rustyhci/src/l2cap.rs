//! Upper-layer (L2CAP) boundary
//!
//! The transport hands ACL data and connection-related events to an
//! implementation of [`L2capHandler`]. The L2CAP state machine itself lives
//! outside this crate.

use crate::error::HciResult;

/// Consumer of ACL data and connection events
pub trait L2capHandler: Send + Sync {
    /// ACL data packet, without the packet type byte
    fn on_data_frame(&self, data: &[u8]) -> HciResult<()>;

    /// Parameters of an LE Meta event
    fn on_le_meta(&self, params: &[u8]) -> HciResult<()>;

    /// Parameters of a Disconnection Complete event
    fn on_disconnection_complete(&self, params: &[u8]) -> HciResult<()>;

    /// Parameters of a Number Of Completed Packets event
    fn on_number_of_completed_packets(&self, params: &[u8]) -> HciResult<()>;
}
