//! Gated command dispatch shared by the sun evaluator and the rule
//! executor.

use lamella_domain::error::LamellaError;
use lamella_domain::item::{ItemName, ShutterId};
use lamella_domain::shutter::ShutterCommand;
use tracing::{info, warn};

use crate::ports::ItemGateway;

/// Whether physical commands may go out right now.
///
/// Reads the master automation switch. An unreadable switch counts as
/// off, so a misconfigured installation never moves shutters.
pub(crate) async fn dispatch_enabled<G: ItemGateway>(gateway: &G, master: &ItemName) -> bool {
    match gateway.state(master).await {
        Ok(state) => matches!(state.as_deref(), Some("ON")),
        Err(err) => {
            warn!(item = %master, error = %err, "cannot read master switch, treating as off");
            false
        }
    }
}

/// Send a command to a shutter's actuator item, unless command
/// dispatch is disabled.
///
/// State bookkeeping is never gated, only the physical movement, so a
/// disabled installation keeps tracking what it *would* have done.
pub(crate) async fn send_shutter_command<G: ItemGateway>(
    gateway: &G,
    shutter: &ShutterId,
    command: ShutterCommand,
    enabled: bool,
) -> Result<(), LamellaError> {
    if enabled {
        info!(shutter = %shutter, command = %command, "sending shutter command");
        gateway.send_command(&shutter.device_item(), command).await
    } else {
        info!(shutter = %shutter, command = %command, "automation disabled, suppressing command");
        Ok(())
    }
}
