//! Item gateway port — how the automation talks to the host's items.
//!
//! The gateway distinguishes an *unknown* item (an error, usually a
//! configuration typo) from a known item whose state is *undefined*
//! (`Ok(None)`, e.g. freshly created and never written).

use std::future::Future;

use lamella_domain::error::LamellaError;
use lamella_domain::item::ItemName;
use lamella_domain::shutter::ShutterCommand;

/// Read and write access to the host's named items.
pub trait ItemGateway: Send + Sync {
    /// Current state of an item.
    ///
    /// Returns `Ok(None)` when the item exists but holds no state and
    /// [`LamellaError::NotFound`] when the item is not registered.
    fn state(
        &self,
        item: &ItemName,
    ) -> impl Future<Output = Result<Option<String>, LamellaError>> + Send;

    /// Set an item's state without commanding the device behind it.
    fn post_update(
        &self,
        item: &ItemName,
        state: &str,
    ) -> impl Future<Output = Result<(), LamellaError>> + Send;

    /// Send a movement command to a shutter actuator item.
    fn send_command(
        &self,
        item: &ItemName,
        command: ShutterCommand,
    ) -> impl Future<Output = Result<(), LamellaError>> + Send;
}
