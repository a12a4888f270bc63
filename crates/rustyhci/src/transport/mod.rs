//! HCI transport
//!
//! The transport owns the controller link. It runs a read loop that hands
//! inbound frames to a pool of worker threads, and drives the controller
//! through its bring-up sequence:
//!
//! - Command frames are logged (they come from another agent on the link)
//! - ACL data goes to the L2CAP handler
//! - Events go through the event routing table to the command subsystem or
//!   to L2CAP
//! - SCO and vendor frames are rejected as unsupported
//!
//! Command Complete and Command Status events are dispatched on the reader
//! thread itself. Handlers on the pool may block in
//! [`CommandChannel::send_and_verify`], and the answer must not queue
//! behind them.

pub mod bringup;
pub mod config;
pub mod demux;
pub mod pool;

#[cfg(test)]
mod tests;

use crate::command::{CommandChannel, Commander, CommanderConfig};
use crate::error::{HciError, HciResult};
use crate::event::EventDispatcher;
use crate::l2cap::L2capHandler;
use crate::link::ControllerLink;
use log::{debug, error, info, warn};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub use self::bringup::{BringUpSequence, CommandStep, Stage, EXPECT_SUCCESS};
pub use self::config::TransportConfig;
pub use self::demux::Demux;
pub use self::pool::WorkerPool;

/// Why the read loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The link returned a zero-length read
    EndOfStream,
    /// The link returned a read error
    ReadError(io::ErrorKind, String),
}

#[derive(Debug, Default)]
struct ClosedSignal {
    reason: Mutex<Option<CloseReason>>,
    closed: Condvar,
}

impl ClosedSignal {
    fn lock(&self) -> MutexGuard<'_, Option<CloseReason>> {
        self.reason.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, reason: CloseReason) {
        let mut guard = self.lock();
        guard.get_or_insert(reason);
        self.closed.notify_all();
    }

    fn wait(&self, timeout: Option<Duration>) -> Option<CloseReason> {
        let guard = self.lock();
        match timeout {
            Some(timeout) => self
                .closed
                .wait_timeout_while(guard, timeout, |r| r.is_none())
                .unwrap_or_else(PoisonError::into_inner)
                .0
                .clone(),
            None => self
                .closed
                .wait_while(guard, |r| r.is_none())
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}

/// Host side of an HCI transport
pub struct Transport<L: ControllerLink> {
    link: Arc<L>,
    commands: Arc<dyn CommandChannel>,
    l2cap: Arc<dyn L2capHandler>,
    demux: Arc<Demux>,
    sequence: BringUpSequence,
    config: TransportConfig,
    started: AtomicBool,
    reader: Mutex<Option<JoinHandle<()>>>,
    closed: Arc<ClosedSignal>,
}

impl<L: ControllerLink> Transport<L> {
    /// Create a transport with the default configuration and bring-up sequence
    pub fn new(
        link: Arc<L>,
        commands: Arc<dyn CommandChannel>,
        l2cap: Arc<dyn L2capHandler>,
    ) -> HciResult<Self> {
        Self::with_config(
            link,
            commands,
            l2cap,
            TransportConfig::default(),
            BringUpSequence::default(),
        )
    }

    /// Create a transport whose commands are sent by a [`Commander`] on `link`
    pub fn with_commander(
        link: Arc<L>,
        l2cap: Arc<dyn L2capHandler>,
        commander: CommanderConfig,
        config: TransportConfig,
        sequence: BringUpSequence,
    ) -> HciResult<Self> {
        let commands: Arc<dyn CommandChannel> =
            Arc::new(Commander::new(Arc::clone(&link), commander));
        Self::with_config(link, commands, l2cap, config, sequence)
    }

    pub fn with_config(
        link: Arc<L>,
        commands: Arc<dyn CommandChannel>,
        l2cap: Arc<dyn L2capHandler>,
        config: TransportConfig,
        sequence: BringUpSequence,
    ) -> HciResult<Self> {
        let events = demux::event_routes(&commands, &l2cap)?;
        let demux = Arc::new(Demux::new(events, Arc::clone(&l2cap)));

        Ok(Self {
            link,
            commands,
            l2cap,
            demux,
            sequence,
            config,
            started: AtomicBool::new(false),
            reader: Mutex::new(None),
            closed: Arc::new(ClosedSignal::default()),
        })
    }

    pub fn link(&self) -> &Arc<L> {
        &self.link
    }

    pub fn commands(&self) -> &Arc<dyn CommandChannel> {
        &self.commands
    }

    pub fn l2cap(&self) -> &Arc<dyn L2capHandler> {
        &self.l2cap
    }

    pub fn events(&self) -> &EventDispatcher {
        self.demux.events()
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Start the read loop, then bring the controller up
    ///
    /// The read loop is running before the first bring-up command is sent,
    /// so the responses have somewhere to go.
    pub fn start(&self) -> HciResult<()> {
        self.start_reading()?;
        self.initialize()
    }

    /// Start the read loop on its own thread
    ///
    /// Returns once the loop is about to issue its first read.
    pub fn start_reading(&self) -> HciResult<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(HciError::AlreadyStarted);
        }

        let pool = WorkerPool::new(
            self.config.workers,
            self.config.queue_depth,
            Arc::clone(&self.demux),
        )?;
        let link = Arc::clone(&self.link);
        let demux = Arc::clone(&self.demux);
        let closed = Arc::clone(&self.closed);
        let buffer_size = self.config.read_buffer_size;
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("hci-reader".into())
            .spawn(move || {
                let _ = ready_tx.send(());
                let reason = read_loop(&*link, &demux, &pool, buffer_size);
                pool.shutdown();
                closed.notify(reason);
            })
            .map_err(HciError::Spawn)?;

        // The reader signals before its first read; a failed recv means it already exited.
        let _ = ready_rx.recv();
        *self.reader.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Run the bring-up sequence
    pub fn initialize(&self) -> HciResult<()> {
        self.sequence.run(self.commands.as_ref()).map_err(|e| {
            error!("controller bring-up failed: {}", e);
            e
        })
    }

    /// Close the controller link
    ///
    /// The read loop stops on its next read. The link itself is released
    /// only once the last handle to it drops: the transport, its
    /// [`Commander`] and the reader thread each hold one, so an
    /// [`HciSocket`](crate::HciSocket) user channel keeps the controller
    /// until the transport is dropped.
    pub fn close(&self) -> HciResult<()> {
        info!("closing HCI transport");
        self.link.close().map_err(HciError::CloseError)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.lock().is_some()
    }

    /// Why the read loop stopped, if it has
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.closed.lock().clone()
    }

    /// Block until the read loop has stopped and queued frames are handled
    ///
    /// Returns `None` if `timeout` elapses first.
    pub fn wait_closed(&self, timeout: Option<Duration>) -> Option<CloseReason> {
        self.closed.wait(timeout)
    }

    /// Close the link and wait for the read loop thread to exit
    pub fn shutdown(&self) -> HciResult<()> {
        self.close()?;
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(reader) = reader {
            let _ = reader.join();
        }
        Ok(())
    }
}

impl<L: ControllerLink> Drop for Transport<L> {
    fn drop(&mut self) {
        if let Err(e) = self.link.close() {
            debug!("closing controller link on drop: {}", e);
        }
    }
}

/// Read frames until the link goes away
fn read_loop<L: ControllerLink + ?Sized>(
    link: &L,
    demux: &Demux,
    pool: &WorkerPool,
    buffer_size: usize,
) -> CloseReason {
    let mut buf = vec![0u8; buffer_size];
    loop {
        match link.read(&mut buf) {
            Ok(0) => {
                warn!("controller link read 0 bytes; link closed");
                return CloseReason::EndOfStream;
            }
            Ok(n) if Demux::is_command_response(&buf[..n]) => demux.dispatch(&buf[..n]),
            Ok(n) => {
                // Handlers run concurrently; the buffer is reused for the next read.
                let frame = buf[..n].to_vec();
                if pool.submit(frame).is_err() {
                    warn!("worker pool gone; stopping read loop");
                    return CloseReason::EndOfStream;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("failed to read from controller link: {}", e);
                return CloseReason::ReadError(e.kind(), e.to_string());
            }
        }
    }
}
