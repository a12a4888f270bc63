//! Tests for the transport: routing, the read loop and bring-up

use super::*;
use crate::command::CommandChannel;
use crate::hci::command::{RawCommand, Reset, SetEventMask, WriteInquiryMode};
use crate::hci::constants::*;
use crate::hci::packet::{Opcode, PacketType};
use crate::testing::{
    command_complete_frame, command_status_frame, FakeLink, RecordingL2cap, ScriptedCommands,
};
use std::collections::{HashMap, HashSet};
use std::io;
use std::time::Duration;

const WAIT: Option<Duration> = Some(Duration::from_secs(5));

fn demux(commands: &Arc<ScriptedCommands>, l2cap: &Arc<RecordingL2cap>) -> Demux {
    let commands: Arc<dyn CommandChannel> = commands.clone();
    let l2cap: Arc<dyn L2capHandler> = l2cap.clone();
    let events = demux::event_routes(&commands, &l2cap).unwrap();
    Demux::new(events, l2cap)
}

fn transport(
    link: &Arc<FakeLink>,
    commands: &Arc<ScriptedCommands>,
    l2cap: &Arc<RecordingL2cap>,
    sequence: BringUpSequence,
) -> Transport<FakeLink> {
    Transport::with_config(
        Arc::clone(link),
        commands.clone(),
        l2cap.clone(),
        TransportConfig::default(),
        sequence,
    )
    .unwrap()
}

fn success_steps(n: usize) -> Vec<CommandStep> {
    (0..n)
        .map(|i| CommandStep::expect_success(WriteInquiryMode { inquiry_mode: i as u8 }))
        .collect()
}

#[test]
fn test_event_routes_wired() {
    let commands = Arc::new(ScriptedCommands::default());
    let l2cap = Arc::new(RecordingL2cap::default());
    let demux = demux(&commands, &l2cap);

    assert_eq!(
        demux.events().event_codes(),
        vec![
            EVT_DISCONN_COMPLETE,
            EVT_CMD_COMPLETE,
            EVT_CMD_STATUS,
            EVT_NUM_COMP_PKTS,
            EVT_LE_META_EVENT
        ]
    );
}

#[test]
fn test_command_complete_event_routing() {
    let commands = Arc::new(ScriptedCommands::default());
    let l2cap = Arc::new(RecordingL2cap::default());
    let demux = demux(&commands, &l2cap);

    let frame = command_complete_frame(Opcode::new(OGF_HOST_CTL, OCF_RESET), &[0x00]);
    demux.handle_packet(&frame).unwrap();

    // Event code and length stripped
    assert_eq!(commands.completes(), vec![vec![1, 0x03, 0x0C, 0x00]]);
    assert!(commands.statuses().is_empty());
    assert!(l2cap.calls().is_empty());
}

#[test]
fn test_each_tag_reaches_its_handler() {
    let commands = Arc::new(ScriptedCommands::default());
    let l2cap = Arc::new(RecordingL2cap::default());
    let demux = demux(&commands, &l2cap);

    // Command echo is observed only
    demux.handle_packet(&[HCI_COMMAND_PKT, 0x03, 0x0C, 0x00]).unwrap();
    assert!(l2cap.calls().is_empty());
    assert!(commands.completes().is_empty());

    demux.handle_packet(&[HCI_ACL_PKT, 0x40, 0x20, 0x01, 0x00, 0xAB]).unwrap();
    assert_eq!(l2cap.calls(), vec![("data", vec![0x40, 0x20, 0x01, 0x00, 0xAB])]);

    demux
        .handle_packet(&command_status_frame(Opcode::new(OGF_LE, OCF_LE_CREATE_CONNECTION), 0))
        .unwrap();
    assert_eq!(commands.statuses(), vec![vec![0x00, 1, 0x0D, 0x20]]);

    demux.handle_packet(&[HCI_EVENT_PKT, EVT_LE_META_EVENT, 2, 0x01, 0x00]).unwrap();
    demux
        .handle_packet(&[HCI_EVENT_PKT, EVT_DISCONN_COMPLETE, 4, 0x00, 0x40, 0x00, 0x13])
        .unwrap();
    demux
        .handle_packet(&[HCI_EVENT_PKT, EVT_NUM_COMP_PKTS, 5, 1, 0x40, 0x00, 0x02, 0x00])
        .unwrap();

    assert_eq!(l2cap.count("data"), 1);
    assert_eq!(l2cap.count("le_meta"), 1);
    assert_eq!(l2cap.count("disconnection_complete"), 1);
    assert_eq!(l2cap.count("number_of_completed_packets"), 1);
    assert_eq!(
        l2cap.calls()[1..],
        [
            ("le_meta", vec![0x01, 0x00]),
            ("disconnection_complete", vec![0x00, 0x40, 0x00, 0x13]),
            ("number_of_completed_packets", vec![1, 0x40, 0x00, 0x02, 0x00]),
        ]
    );
}

#[test]
fn test_sco_and_vendor_unsupported() {
    let commands = Arc::new(ScriptedCommands::default());
    let l2cap = Arc::new(RecordingL2cap::default());
    let demux = demux(&commands, &l2cap);

    assert!(matches!(
        demux.handle_packet(&[HCI_SCO_PKT, 0x01, 0x00, 0x00]),
        Err(HciError::Unsupported(PacketType::ScoData))
    ));
    assert!(matches!(
        demux.handle_packet(&[HCI_VENDOR_PKT, EVT_CMD_COMPLETE, 0x00]),
        Err(HciError::Unsupported(PacketType::Vendor))
    ));

    assert!(l2cap.calls().is_empty());
    assert!(commands.completes().is_empty());
    assert!(commands.statuses().is_empty());
}

#[test]
fn test_malformed_frames_are_recoverable() {
    let commands = Arc::new(ScriptedCommands::default());
    let l2cap = Arc::new(RecordingL2cap::default());
    let demux = demux(&commands, &l2cap);

    assert!(matches!(
        demux.handle_packet(&[0x42, 0x00]),
        Err(HciError::UnknownPacketType(0x42))
    ));
    assert!(matches!(
        demux.handle_packet(&[]),
        Err(HciError::InvalidPacketFormat)
    ));
    assert!(matches!(
        demux.handle_packet(&[HCI_EVENT_PKT, EVT_CMD_COMPLETE, 4, 1]),
        Err(HciError::InvalidPacketFormat)
    ));

    // Truncated command echo is still just logged
    demux.handle_packet(&[HCI_COMMAND_PKT, 0x03]).unwrap();

    // Events without a route are dropped quietly
    demux.handle_packet(&[HCI_EVENT_PKT, EVT_ENCRYPTION_CHANGE, 1, 0x00]).unwrap();

    // dispatch never propagates
    demux.dispatch(&[0x42]);
    assert!(l2cap.calls().is_empty());
}

#[test]
fn test_duplicate_route_rejected() {
    let result = crate::event::EventRoutes::new()
        .route(EVT_CMD_COMPLETE, |_| Ok(()))
        .and_then(|routes| routes.route(EVT_CMD_COMPLETE, |_| Ok(())));
    assert!(matches!(
        result,
        Err(HciError::DuplicateEventHandler(EVT_CMD_COMPLETE))
    ));
}

#[test]
fn test_bring_up_runs_baseline_then_vendor() {
    let commands = ScriptedCommands::default();
    let sequence = BringUpSequence::default();
    sequence.run(&commands).unwrap();

    let expected: Vec<Opcode> = sequence
        .baseline()
        .iter()
        .chain(sequence.vendor())
        .map(|s| s.command().opcode())
        .collect();
    assert_eq!(expected.len(), 12);
    assert_eq!(commands.sent(), expected);
    assert_eq!(commands.sent()[0], Opcode::new(OGF_HOST_CTL, OCF_RESET));
    assert_eq!(
        commands.sent()[3],
        Opcode::new(OGF_HOST_CTL, OCF_WRITE_SIMPLE_PAIRING_MODE)
    );
}

#[test]
fn test_bring_up_stops_at_first_mismatch() {
    let commands = ScriptedCommands::with_responses(vec![vec![0x00], vec![0x01], vec![0x00]]);
    let sequence = BringUpSequence::new(success_steps(3), success_steps(2));

    match sequence.run(&commands) {
        Err(HciError::BringUp {
            stage, step, source, ..
        }) => {
            assert_eq!(stage, Stage::Baseline);
            assert_eq!(step, 1);
            assert!(matches!(*source, HciError::UnexpectedResponse { .. }));
        }
        other => panic!("unexpected result: {:?}", other),
    }

    // Step 3 and the vendor list were never issued
    assert_eq!(commands.sent().len(), 2);
}

#[test]
fn test_bring_up_vendor_failure() {
    let mut responses = vec![vec![0x00]; 3];
    responses.push(vec![0x0C]);
    let commands = ScriptedCommands::with_responses(responses);
    let sequence = BringUpSequence::new(success_steps(3), success_steps(4));

    let err = sequence.run(&commands).unwrap_err();
    assert!(matches!(
        err,
        HciError::BringUp {
            stage: Stage::Vendor,
            step: 0,
            ..
        }
    ));
    assert_eq!(commands.sent().len(), 4);
}

#[test]
fn test_read_loop_delivers_every_frame() {
    let link = Arc::new(FakeLink::new());
    let commands = Arc::new(ScriptedCommands::default());
    let l2cap = Arc::new(RecordingL2cap::default());
    let transport = transport(&link, &commands, &l2cap, BringUpSequence::default());

    const FRAMES: u16 = 200;
    let mut sent = HashSet::new();
    for i in 0..FRAMES {
        let payload = vec![0x40, 0x20, (i & 0xff) as u8, (i >> 8) as u8];
        let mut frame = vec![HCI_ACL_PKT];
        frame.extend_from_slice(&payload);
        link.push(frame);
        sent.insert(payload);
    }

    transport.start_reading().unwrap();
    transport.close().unwrap();
    assert_eq!(transport.wait_closed(WAIT), Some(CloseReason::EndOfStream));

    let received: Vec<Vec<u8>> = l2cap.calls().into_iter().map(|(_, d)| d).collect();
    assert_eq!(received.len(), FRAMES as usize);
    let received: HashSet<Vec<u8>> = received.into_iter().collect();
    assert_eq!(received, sent);
}

#[test]
fn test_read_loop_survives_bad_frames() {
    let link = Arc::new(FakeLink::new());
    let commands = Arc::new(ScriptedCommands::default());
    let l2cap = Arc::new(RecordingL2cap::default());
    let transport = transport(&link, &commands, &l2cap, BringUpSequence::default());
    transport.start_reading().unwrap();

    link.push(vec![0x42, 0x00]);
    link.push(vec![HCI_SCO_PKT, 0x00]);
    link.push(vec![HCI_VENDOR_PKT]);
    link.push(vec![HCI_ACL_PKT, 0x01]);
    link.push_error(std::io::ErrorKind::BrokenPipe);

    match transport.wait_closed(WAIT) {
        Some(CloseReason::ReadError(kind, _)) => assert_eq!(kind, std::io::ErrorKind::BrokenPipe),
        other => panic!("unexpected close reason: {:?}", other),
    }
    assert!(transport.is_closed());
    assert_eq!(l2cap.calls(), vec![("data", vec![0x01])]);
}

#[test]
fn test_start_reading_twice() {
    let link = Arc::new(FakeLink::new());
    let commands = Arc::new(ScriptedCommands::default());
    let l2cap = Arc::new(RecordingL2cap::default());
    let transport = transport(&link, &commands, &l2cap, BringUpSequence::default());

    transport.start_reading().unwrap();
    assert!(matches!(transport.start_reading(), Err(HciError::AlreadyStarted)));
    assert!(!transport.is_closed());

    transport.shutdown().unwrap();
    assert_eq!(transport.close_reason(), Some(CloseReason::EndOfStream));
}

#[test]
fn test_start_brings_up_controller_end_to_end() {
    let link = Arc::new(FakeLink::controller(HashMap::new()));
    let l2cap: Arc<RecordingL2cap> = Arc::new(RecordingL2cap::default());
    let transport = Transport::with_commander(
        Arc::clone(&link),
        l2cap.clone(),
        CommanderConfig {
            response_timeout: Some(Duration::from_secs(5)),
        },
        TransportConfig::default(),
        BringUpSequence::default(),
    )
    .unwrap();

    transport.start().unwrap();

    let expected: Vec<Opcode> = BringUpSequence::default()
        .baseline()
        .iter()
        .chain(BringUpSequence::default().vendor())
        .map(|s| s.command().opcode())
        .collect();
    assert_eq!(link.written_opcodes(), expected);
    assert!(l2cap.calls().is_empty());

    transport.shutdown().unwrap();
    assert!(transport.is_closed());
}

#[test]
fn test_start_aborts_on_controller_error() {
    let set_event_mask = Opcode::new(OGF_HOST_CTL, OCF_SET_EVENT_MASK);
    let mut statuses = HashMap::new();
    statuses.insert(set_event_mask, 0x12);

    let link = Arc::new(FakeLink::controller(statuses));
    let l2cap = Arc::new(RecordingL2cap::default());
    let transport = Transport::with_commander(
        Arc::clone(&link),
        l2cap,
        CommanderConfig {
            response_timeout: Some(Duration::from_secs(5)),
        },
        TransportConfig::default(),
        BringUpSequence::default(),
    )
    .unwrap();

    let err = transport.start().unwrap_err();
    match err {
        HciError::BringUp {
            stage,
            step,
            opcode,
            source,
        } => {
            assert_eq!(stage, Stage::Baseline);
            assert_eq!(step, 1);
            assert_eq!(opcode, set_event_mask);
            assert!(matches!(
                *source,
                HciError::UnexpectedResponse { ref actual, .. } if actual == &vec![0x12]
            ));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(
        link.written_opcodes(),
        vec![Opcode::new(OGF_HOST_CTL, OCF_RESET), set_event_mask]
    );
    transport.shutdown().unwrap();
}

#[test]
fn test_bring_up_times_out_without_controller() {
    let link = Arc::new(FakeLink::silent());
    let l2cap = Arc::new(RecordingL2cap::default());
    let transport = Transport::with_commander(
        Arc::clone(&link),
        l2cap,
        CommanderConfig {
            response_timeout: Some(Duration::from_millis(50)),
        },
        TransportConfig::default(),
        BringUpSequence::new(
            vec![CommandStep::expect_success(Reset)],
            vec![CommandStep::expect_success(SetEventMask { event_mask: 0 })],
        ),
    )
    .unwrap();

    let err = transport.start().unwrap_err();
    assert!(matches!(
        err,
        HciError::BringUp { source, .. } if matches!(*source, HciError::CommandTimeout(_))
    ));
    assert_eq!(link.written().len(), 1);
    transport.shutdown().unwrap();
}

#[test]
fn test_command_responses_recognized() {
    let reset = Opcode::new(OGF_HOST_CTL, OCF_RESET);
    assert!(Demux::is_command_response(&command_complete_frame(reset, &[0x00])));
    assert!(Demux::is_command_response(&command_status_frame(reset, 0x00)));

    assert!(!Demux::is_command_response(&[HCI_EVENT_PKT, EVT_LE_META_EVENT, 1, 0x01]));
    assert!(!Demux::is_command_response(&[HCI_VENDOR_PKT, EVT_CMD_COMPLETE, 0x00]));
    assert!(!Demux::is_command_response(&[HCI_EVENT_PKT]));
}

/// L2CAP handler that sends a vendor command for every LE Meta event
struct CommandingL2cap {
    commander: Arc<Commander<FakeLink>>,
    results: Mutex<Vec<HciResult<()>>>,
}

impl L2capHandler for CommandingL2cap {
    fn on_data_frame(&self, _data: &[u8]) -> HciResult<()> {
        Ok(())
    }

    fn on_le_meta(&self, params: &[u8]) -> HciResult<()> {
        let command = RawCommand::new(OGF_VENDOR, 0x0010 + u16::from(params[0]), Vec::new());
        let result = self.commander.send_and_verify(&command, &[HCI_SUCCESS]);
        self.results.lock().unwrap().push(result);
        Ok(())
    }

    fn on_disconnection_complete(&self, _params: &[u8]) -> HciResult<()> {
        Ok(())
    }

    fn on_number_of_completed_packets(&self, _params: &[u8]) -> HciResult<()> {
        Ok(())
    }
}

#[test]
fn test_handlers_can_send_commands_with_every_worker_busy() {
    let link = Arc::new(FakeLink::controller(HashMap::new()));
    let commander = Arc::new(Commander::new(
        Arc::clone(&link),
        CommanderConfig {
            response_timeout: Some(Duration::from_secs(5)),
        },
    ));
    let l2cap = Arc::new(CommandingL2cap {
        commander: Arc::clone(&commander),
        results: Mutex::new(Vec::new()),
    });
    let config = TransportConfig::default();
    let transport = Transport::with_config(
        Arc::clone(&link),
        commander,
        l2cap.clone(),
        config.clone(),
        BringUpSequence::default(),
    )
    .unwrap();
    transport.start_reading().unwrap();

    // One event per worker, so every worker ends up waiting on a response
    for i in 0..config.workers as u8 {
        link.push(vec![HCI_EVENT_PKT, EVT_LE_META_EVENT, 1, i]);
    }

    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while l2cap.results.lock().unwrap().len() < config.workers {
        assert!(std::time::Instant::now() < deadline, "handlers never finished");
        std::thread::sleep(Duration::from_millis(5));
    }

    let results = l2cap.results.lock().unwrap();
    assert!(results.iter().all(|r| r.is_ok()), "{:?}", *results);
    drop(results);

    let mut sent: Vec<u16> = link.written_opcodes().iter().map(|o| o.ocf()).collect();
    sent.sort_unstable();
    assert_eq!(sent, (0..config.workers as u16).map(|i| 0x0010 + i).collect::<Vec<_>>());

    transport.shutdown().unwrap();
}

/// Link whose close always fails
struct StuckLink;

impl ControllerLink for StuckLink {
    fn read(&self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn close(&self) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, "busy"))
    }
}

#[test]
fn test_close_failure_reported_as_close_error() {
    let commands = Arc::new(ScriptedCommands::default());
    let l2cap = Arc::new(RecordingL2cap::default());
    let transport = Transport::with_config(
        Arc::new(StuckLink),
        commands,
        l2cap,
        TransportConfig::default(),
        BringUpSequence::default(),
    )
    .unwrap();

    match transport.close() {
        Err(HciError::CloseError(e)) => assert_eq!(e.kind(), io::ErrorKind::Other),
        other => panic!("unexpected result: {:?}", other),
    }
}
