//! Bounded pool of frame handling threads

use super::demux::Demux;
use crate::error::{HciError, HciResult};
use log::trace;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Fixed set of worker threads fed through a bounded queue
///
/// `submit` blocks while the queue is full. Dropping the pool through
/// [`WorkerPool::shutdown`] lets the workers drain what is queued and exit.
pub struct WorkerPool {
    sender: Option<SyncSender<Vec<u8>>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(workers: usize, queue_depth: usize, demux: Arc<Demux>) -> HciResult<Self> {
        let (sender, receiver) = mpsc::sync_channel(queue_depth);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut handles = Vec::with_capacity(workers.max(1));
        for id in 0..workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let demux = Arc::clone(&demux);
            let handle = thread::Builder::new()
                .name(format!("hci-worker-{}", id))
                .spawn(move || work(receiver, demux))
                .map_err(HciError::Spawn)?;
            handles.push(handle);
        }

        Ok(Self {
            sender: Some(sender),
            workers: handles,
        })
    }

    /// Queue a frame for handling
    pub fn submit(&self, frame: Vec<u8>) -> HciResult<()> {
        let sender = self.sender.as_ref().ok_or(HciError::LinkClosed)?;
        sender.send(frame).map_err(|_| HciError::LinkClosed)
    }

    /// Stop accepting frames and wait for queued frames to be handled
    pub fn shutdown(mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn work(receiver: Arc<Mutex<Receiver<Vec<u8>>>>, demux: Arc<Demux>) {
    loop {
        let frame = {
            let receiver = receiver.lock().unwrap_or_else(PoisonError::into_inner);
            receiver.recv()
        };
        match frame {
            Ok(frame) => demux.dispatch(&frame),
            Err(_) => break,
        }
    }
    trace!("{} exiting", thread::current().name().unwrap_or("hci-worker"));
}
