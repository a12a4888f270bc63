//! In-memory stand-ins for the controller and the subsystems around the transport

use crate::command::CommandChannel;
use crate::error::{HciError, HciResult};
use crate::hci::command::CommandParam;
use crate::hci::constants::*;
use crate::hci::packet::Opcode;
use crate::l2cap::L2capHandler;
use crate::link::ControllerLink;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

/// Controller link backed by a channel of frames
pub(crate) struct FakeLink {
    inbound_tx: Mutex<Option<Sender<io::Result<Vec<u8>>>>>,
    inbound_rx: Mutex<Receiver<io::Result<Vec<u8>>>>,
    written: Mutex<Vec<Vec<u8>>>,
    responder: Option<Responder>,
}

impl FakeLink {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: Mutex::new(rx),
            written: Mutex::new(Vec::new()),
            responder: None,
        }
    }

    /// A link that answers every command with Command Complete
    ///
    /// The status is 0x00 unless `statuses` says otherwise for the opcode.
    pub(crate) fn controller(statuses: HashMap<Opcode, u8>) -> Self {
        let mut link = Self::new();
        link.responder = Some(Box::new(move |packet| {
            let opcode = Opcode::from_le_slice(packet.get(1..)?)?;
            let status = statuses.get(&opcode).copied().unwrap_or(HCI_SUCCESS);
            Some(command_complete_frame(opcode, &[status]))
        }));
        link
    }

    /// A link that accepts writes and never answers
    pub(crate) fn silent() -> Self {
        Self::new()
    }

    pub(crate) fn push(&self, frame: Vec<u8>) {
        if let Some(tx) = self.inbound_tx.lock().unwrap().as_ref() {
            tx.send(Ok(frame)).unwrap();
        }
    }

    pub(crate) fn push_error(&self, kind: io::ErrorKind) {
        if let Some(tx) = self.inbound_tx.lock().unwrap().as_ref() {
            tx.send(Err(io::Error::new(kind, "injected"))).unwrap();
        }
    }

    pub(crate) fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }

    pub(crate) fn written_opcodes(&self) -> Vec<Opcode> {
        self.written()
            .iter()
            .filter_map(|p| Opcode::from_le_slice(&p[1..]))
            .collect()
    }
}

impl ControllerLink for FakeLink {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let rx = self.inbound_rx.lock().unwrap();
        match rx.recv() {
            Ok(Ok(frame)) => {
                buf[..frame.len()].copy_from_slice(&frame);
                Ok(frame.len())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Ok(0),
        }
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        if self.inbound_tx.lock().unwrap().is_none() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        self.written.lock().unwrap().push(buf.to_vec());
        if let Some(reply) = self.responder.as_ref().and_then(|r| r(buf)) {
            self.push(reply);
        }
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        self.inbound_tx.lock().unwrap().take();
        Ok(())
    }
}

/// Event frame carrying a Command Complete for `opcode`
pub(crate) fn command_complete_frame(opcode: Opcode, return_params: &[u8]) -> Vec<u8> {
    let mut frame = vec![
        HCI_EVENT_PKT,
        EVT_CMD_COMPLETE,
        (3 + return_params.len()) as u8,
        1,
    ];
    frame.extend_from_slice(&opcode.value().to_le_bytes());
    frame.extend_from_slice(return_params);
    frame
}

/// Event frame carrying a Command Status for `opcode`
pub(crate) fn command_status_frame(opcode: Opcode, status: u8) -> Vec<u8> {
    let mut frame = vec![HCI_EVENT_PKT, EVT_CMD_STATUS, 4, status, 1];
    frame.extend_from_slice(&opcode.value().to_le_bytes());
    frame
}

/// L2CAP handler that records every call
#[derive(Default)]
pub(crate) struct RecordingL2cap {
    calls: Mutex<Vec<(&'static str, Vec<u8>)>>,
}

impl RecordingL2cap {
    pub(crate) fn calls(&self) -> Vec<(&'static str, Vec<u8>)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|(n, _)| *n == name).count()
    }

    fn record(&self, name: &'static str, data: &[u8]) -> HciResult<()> {
        self.calls.lock().unwrap().push((name, data.to_vec()));
        Ok(())
    }
}

impl L2capHandler for RecordingL2cap {
    fn on_data_frame(&self, data: &[u8]) -> HciResult<()> {
        self.record("data", data)
    }

    fn on_le_meta(&self, params: &[u8]) -> HciResult<()> {
        self.record("le_meta", params)
    }

    fn on_disconnection_complete(&self, params: &[u8]) -> HciResult<()> {
        self.record("disconnection_complete", params)
    }

    fn on_number_of_completed_packets(&self, params: &[u8]) -> HciResult<()> {
        self.record("number_of_completed_packets", params)
    }
}

/// Command channel that answers from a script instead of a controller
#[derive(Default)]
pub(crate) struct ScriptedCommands {
    /// Responses handed out in order; success once exhausted
    responses: Mutex<VecDeque<Vec<u8>>>,
    sent: Mutex<Vec<Opcode>>,
    completes: Mutex<Vec<Vec<u8>>>,
    statuses: Mutex<Vec<Vec<u8>>>,
}

impl ScriptedCommands {
    pub(crate) fn with_responses(responses: Vec<Vec<u8>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub(crate) fn sent(&self) -> Vec<Opcode> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn completes(&self) -> Vec<Vec<u8>> {
        self.completes.lock().unwrap().clone()
    }

    pub(crate) fn statuses(&self) -> Vec<Vec<u8>> {
        self.statuses.lock().unwrap().clone()
    }
}

impl CommandChannel for ScriptedCommands {
    fn send_and_verify(&self, command: &dyn CommandParam, expected: &[u8]) -> HciResult<()> {
        self.sent.lock().unwrap().push(command.opcode());
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![HCI_SUCCESS]);
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
        self.completes.lock().unwrap().push(params.to_vec());
        Ok(())
    }

    fn on_command_status(&self, params: &[u8]) -> HciResult<()> {
        self.statuses.lock().unwrap().push(params.to_vec());
        Ok(())
    }
}
