//! Transport configuration

use crate::hci::constants::HCI_MAX_FRAME_SIZE;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Size of the buffer each link read lands in
    pub read_buffer_size: usize,
    /// Number of threads handling frames
    pub workers: usize,
    /// Frames that may wait for a worker before the read loop blocks
    pub queue_depth: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: HCI_MAX_FRAME_SIZE,
            workers: 4,
            queue_depth: 64,
        }
    }
}
