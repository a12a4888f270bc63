//! HCI Socket implementation for Bluetooth communication
//!
//! This module provides a wrapper around the Linux HCI socket interface,
//! used as the [`ControllerLink`] of a transport.

use crate::error::HciError;
use crate::link::ControllerLink;
use log::{debug, info};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

// Bluetooth socket constants
const AF_BLUETOOTH: i32 = 31;
const BTPROTO_HCI: i32 = 1;
const SOL_HCI: i32 = 0;
const HCI_FILTER: i32 = 2;

// How often a blocked read checks whether the socket was closed
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// HCI socket channel to bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HciChannel {
    /// Shared access alongside the kernel's Bluetooth stack
    Raw,
    /// Exclusive access; the device must be down in the kernel
    User,
}

impl HciChannel {
    fn value(self) -> u16 {
        match self {
            HciChannel::Raw => 0,
            HciChannel::User => 1,
        }
    }
}

/// Represents an HCI socket
#[derive(Debug)]
pub struct HciSocket {
    fd: RawFd,
    dev_id: u16,
    closed: AtomicBool,
}

// Define the sockaddr_hci structure
#[repr(C)]
struct SockaddrHci {
    hci_family: libc::sa_family_t,
    hci_dev: u16,
    hci_channel: u16,
}

// Define the hci_filter structure
#[repr(C)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciSocket {
    /// Index of the controller this socket is bound to
    pub fn dev_id(&self) -> u16 {
        self.dev_id
    }

    /// Opens a raw HCI socket that passes every packet type and event
    ///
    /// # Arguments
    ///
    /// * `dev_id` - The device ID to open (0 for the first device)
    pub fn open(dev_id: u16) -> Result<Self, HciError> {
        let socket = Self::open_channel(dev_id, HciChannel::Raw)?;
        socket.set_pass_all_filter()?;
        Ok(socket)
    }

    /// Opens an HCI user channel socket with exclusive access to the device
    pub fn open_user(dev_id: u16) -> Result<Self, HciError> {
        Self::open_channel(dev_id, HciChannel::User)
    }

    /// Opens the first device in `dev_ids` that can be bound
    ///
    /// Returns the error of the last attempt if none succeed.
    pub fn open_first(dev_ids: &[u16], channel: HciChannel) -> Result<Self, HciError> {
        let mut last_err = HciError::BindError(io::Error::new(
            io::ErrorKind::NotFound,
            "no HCI device ids given",
        ));
        for &dev_id in dev_ids {
            let opened = match channel {
                HciChannel::Raw => Self::open(dev_id),
                HciChannel::User => Self::open_user(dev_id),
            };
            match opened {
                Ok(socket) => return Ok(socket),
                Err(e) => {
                    debug!("hci{} unavailable: {}", dev_id, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    fn open_channel(dev_id: u16, channel: HciChannel) -> Result<Self, HciError> {
        let fd = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                BTPROTO_HCI,
            )
        };

        if fd < 0 {
            return Err(HciError::SocketError(io::Error::last_os_error()));
        }

        // Bind to the specified device
        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as libc::sa_family_t,
            hci_dev: dev_id,
            hci_channel: channel.value(),
        };

        let result = unsafe {
            libc::bind(
                fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<SockaddrHci>() as libc::socklen_t,
            )
        };

        if result < 0 {
            let err = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(HciError::BindError(err));
        }

        info!("opened hci{} on {:?} channel", dev_id, channel);
        Ok(HciSocket {
            fd,
            dev_id,
            closed: AtomicBool::new(false),
        })
    }

    /// The raw channel filters everything out until a filter is installed
    fn set_pass_all_filter(&self) -> Result<(), HciError> {
        let filter = HciFilter {
            type_mask: u32::MAX,
            event_mask: [u32::MAX, u32::MAX],
            opcode: 0,
        };

        let result = unsafe {
            libc::setsockopt(
                self.fd,
                SOL_HCI,
                HCI_FILTER,
                &filter as *const _ as *const libc::c_void,
                std::mem::size_of::<HciFilter>() as libc::socklen_t,
            )
        };

        if result < 0 {
            return Err(HciError::SocketError(io::Error::last_os_error()));
        }
        Ok(())
    }

    /// Wait until the socket is readable or the timeout expires
    ///
    /// Returns `Ok(false)` on timeout.
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLIN,
            revents: 0,
        };

        let result = unsafe { libc::poll(&mut pfd, 1, timeout.as_millis() as libc::c_int) };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(result > 0)
    }
}

impl ControllerLink for HciSocket {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Ok(0);
            }
            if !self.wait_readable(READ_POLL_INTERVAL)? {
                continue;
            }

            let bytes_read =
                unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };

            if bytes_read < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    continue;
                }
                return Err(err);
            }
            return Ok(bytes_read as usize);
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "HCI socket closed"));
        }
        match unsafe { libc::write(self.fd, buf.as_ptr() as *const libc::c_void, buf.len()) } {
            -1 => Err(io::Error::last_os_error()),
            n => Ok(n as usize),
        }
    }

    fn close(&self) -> io::Result<()> {
        // The descriptor itself is released on drop, once no reader can be using it.
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!("closing hci{}", self.dev_id);
        }
        Ok(())
    }
}

impl AsRawFd for HciSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

impl Drop for HciSocket {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}
