//! Command subsystem
//!
//! Sends commands to the controller and correlates the Command Complete and
//! Command Status events that answer them.

pub mod commander;
pub mod registry;


use crate::error::HciResult;
use crate::hci::command::CommandParam;

pub use commander::{Commander, CommanderConfig};
pub use registry::ResponseRegistry;

/// Blocking command channel to the controller
pub trait CommandChannel: Send + Sync {
    /// Send `command` and block until its response arrives
    ///
    /// Fails unless the correlated response equals `expected` exactly.
    fn send_and_verify(&self, command: &dyn CommandParam, expected: &[u8]) -> HciResult<()>;

    /// Handle the parameters of a Command Complete event
    ///
    /// Runs on the transport's reader thread and must not block.
    fn on_command_complete(&self, params: &[u8]) -> HciResult<()>;

    /// Handle the parameters of a Command Status event
    ///
    /// Runs on the transport's reader thread and must not block.
    fn on_command_status(&self, params: &[u8]) -> HciResult<()>;
}
