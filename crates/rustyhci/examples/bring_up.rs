//! Example: Bringing up a controller
//!
//! Opens an HCI user channel socket (hci1, falling back to hci0), starts the
//! transport, runs the default bring-up sequence, and logs ACL data and
//! connection events for a few seconds.
//!
//! The device must be down in the kernel (`hciconfig hci0 down`) and the
//! process needs CAP_NET_ADMIN.

use rustyhci::{
    BringUpSequence, CommanderConfig, HciChannel, HciResult, HciSocket, L2capHandler, Transport,
    TransportConfig,
};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use std::sync::Arc;
use std::time::Duration;

struct LoggingL2cap;

impl L2capHandler for LoggingL2cap {
    fn on_data_frame(&self, data: &[u8]) -> HciResult<()> {
        log::info!("ACL data: {:02X?}", data);
        Ok(())
    }

    fn on_le_meta(&self, params: &[u8]) -> HciResult<()> {
        log::info!("LE meta event: {:02X?}", params);
        Ok(())
    }

    fn on_disconnection_complete(&self, params: &[u8]) -> HciResult<()> {
        log::info!("disconnection complete: {:02X?}", params);
        Ok(())
    }

    fn on_number_of_completed_packets(&self, params: &[u8]) -> HciResult<()> {
        log::debug!("completed packets: {:02X?}", params);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let socket = Arc::new(HciSocket::open_first(&[1, 0], HciChannel::User)?);
    println!("Opened hci{}", socket.dev_id());

    let transport = Transport::with_commander(
        socket,
        Arc::new(LoggingL2cap),
        CommanderConfig {
            response_timeout: Some(Duration::from_secs(2)),
        },
        TransportConfig::default(),
        BringUpSequence::default(),
    )?;

    transport.start()?;
    println!("Controller initialized, listening for 5 seconds...");

    if let Some(reason) = transport.wait_closed(Some(Duration::from_secs(5))) {
        println!("Link closed early: {:?}", reason);
    }

    transport.shutdown()?;
    println!("Transport closed");
    Ok(())
}
