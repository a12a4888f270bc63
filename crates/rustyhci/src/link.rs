//! Controller link abstraction
//!
//! A controller link is the opened duplex connection to a Bluetooth
//! controller. One thread reads from it while command senders write to it,
//! so every operation takes `&self`.

use std::io;

/// Duplex byte-stream endpoint to a Bluetooth controller
///
/// Each successful `read` delivers exactly one whole HCI frame, starting
/// with its packet type byte. A read of zero bytes or a read error means the
/// link is gone.
pub trait ControllerLink: Send + Sync + 'static {
    /// Read one frame into `buf`, returning the number of bytes read
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write one complete frame
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Release the link. A blocked or subsequent `read` returns 0 or fails.
    fn close(&self) -> io::Result<()>;
}
