//! # lamella-adapter-memory
//!
//! In-memory host adapter for demos and tests.
//!
//! ## Behaviour
//!
//! - Items are registered by name and start undefined. Reading an
//!   unregistered item is an error, reading a registered one yields
//!   its current state.
//! - State updates are applied and broadcast as
//!   [`ItemEvent::StateChanged`], so a scheduler subscribed to the
//!   host sees every change, including its own writes.
//! - Shutter commands are journalled and applied to the device item as
//!   a position value: `UP` = 0, `STOP` = 50, `DOWN` = 100.
//! - Channel events can be injected to simulate device signals such as
//!   wall buttons or astro events.
//!
//! ## Dependency rule
//!
//! Depends on `lamella-app` (port trait) and `lamella-domain` only.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use lamella_app::ports::ItemGateway;
use lamella_domain::error::{LamellaError, NotFoundError};
use lamella_domain::event::ItemEvent;
use lamella_domain::item::ItemName;
use lamella_domain::shutter::ShutterCommand;
use tokio::sync::broadcast;
use tracing::{debug, info};

const EVENT_CAPACITY: usize = 256;
const COMMAND_JOURNAL_LIMIT: usize = 256;

/// Shared in-memory host. Cloning yields another handle on the same
/// registry.
#[derive(Clone)]
pub struct MemoryHost {
    inner: Arc<Inner>,
}

struct Inner {
    items: RwLock<HashMap<ItemName, Option<String>>>,
    events: broadcast::Sender<ItemEvent>,
    commands: Mutex<VecDeque<(ItemName, ShutterCommand)>>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                items: RwLock::new(HashMap::new()),
                events,
                commands: Mutex::new(VecDeque::new()),
            }),
        }
    }
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A host with the given items already registered, all undefined.
    pub fn with_items<I, N>(items: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<ItemName>,
    {
        let host = Self::new();
        for item in items {
            host.register_item(item.into());
        }
        host
    }

    /// Register an item. Re-registering keeps any existing state.
    pub fn register_item(&self, name: ItemName) {
        if let Ok(mut items) = self.inner.items.write() {
            items.entry(name).or_insert(None);
        }
    }

    /// Listen to everything the host publishes.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ItemEvent> {
        self.inner.events.subscribe()
    }

    /// Current state of an item, `None` when undefined or unknown.
    #[must_use]
    pub fn state_of(&self, item: &ItemName) -> Option<String> {
        self.inner
            .items
            .read()
            .ok()
            .and_then(|items| items.get(item).cloned().flatten())
    }

    /// Snapshot of the command journal, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<(ItemName, ShutterCommand)> {
        self.inner
            .commands
            .lock()
            .map(|commands| commands.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Drain the command journal.
    pub fn take_commands(&self) -> Vec<(ItemName, ShutterCommand)> {
        self.inner
            .commands
            .lock()
            .map(|mut commands| commands.drain(..).collect())
            .unwrap_or_default()
    }

    /// Inject a device channel event, e.g. a wall button press.
    pub fn emit_channel_event(&self, channel: impl Into<String>, event: impl Into<String>) {
        self.publish(ItemEvent::Channel {
            channel: channel.into(),
            event: event.into(),
        });
    }

    fn publish(&self, event: ItemEvent) {
        debug!(%event, "publishing host event");
        // Nobody listening is fine.
        let _ = self.inner.events.send(event);
    }
}

fn poisoned() -> LamellaError {
    LamellaError::Gateway("item registry lock poisoned".to_string())
}

impl ItemGateway for MemoryHost {
    async fn state(&self, item: &ItemName) -> Result<Option<String>, LamellaError> {
        let items = self.inner.items.read().map_err(|_| poisoned())?;
        match items.get(item) {
            Some(state) => Ok(state.clone()),
            None => Err(NotFoundError::item(item.as_str()).into()),
        }
    }

    async fn post_update(&self, item: &ItemName, state: &str) -> Result<(), LamellaError> {
        let from = {
            let mut items = self.inner.items.write().map_err(|_| poisoned())?;
            let Some(slot) = items.get_mut(item) else {
                return Err(NotFoundError::item(item.as_str()).into());
            };
            slot.replace(state.to_string())
        };
        self.publish(ItemEvent::StateChanged {
            item: item.clone(),
            from,
            to: state.to_string(),
        });
        Ok(())
    }

    async fn send_command(&self, item: &ItemName, command: ShutterCommand) -> Result<(), LamellaError> {
        let position = command.position().to_string();
        let from = {
            let mut items = self.inner.items.write().map_err(|_| poisoned())?;
            let Some(slot) = items.get_mut(item) else {
                return Err(NotFoundError::item(item.as_str()).into());
            };
            slot.replace(position.clone())
        };
        {
            let mut commands = self.inner.commands.lock().map_err(|_| poisoned())?;
            commands.push_back((item.clone(), command));
            if commands.len() > COMMAND_JOURNAL_LIMIT {
                commands.pop_front();
            }
        }
        info!(item = %item, command = %command, position = %position, "device command applied");
        self.publish(ItemEvent::StateChanged {
            item: item.clone(),
            from,
            to: position,
        });
        Ok(())
    }
}
