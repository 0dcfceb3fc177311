//! Where poll values end up. Backends are looked up by name when chains are
//! built; an empty name binds the no-op backend.

use std::collections::HashMap;
use std::sync::Arc;

use rnms_common::{ConfigError, PollValue};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::trace;

pub const NO_BACKEND: &str = "No Backend";

pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    fn deliver(&self, attribute_id: u64, value: &PollValue);
}

/// Discards every value.
pub struct NullBackend;

impl Backend for NullBackend {
    fn name(&self) -> &str {
        NO_BACKEND
    }

    fn deliver(&self, attribute_id: u64, value: &PollValue) {
        trace!(attribute_id, %value, "value discarded");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub backend: String,
    pub attribute_id: u64,
    pub value: PollValue,
}

/// Forwards every value to a channel, for consumers living in another task.
pub struct ChannelBackend {
    name: String,
    tx: UnboundedSender<Delivery>,
}

impl ChannelBackend {
    pub fn new(name: &str) -> (Self, UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                name: name.to_string(),
                tx,
            },
            rx,
        )
    }
}

impl Backend for ChannelBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn deliver(&self, attribute_id: u64, value: &PollValue) {
        let _ = self.tx.send(Delivery {
            backend: self.name.clone(),
            attribute_id,
            value: value.clone(),
        });
    }
}

pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl Default for BackendRegistry {
    fn default() -> Self {
        let mut backends: HashMap<String, Arc<dyn Backend>> = HashMap::new();
        backends.insert(NO_BACKEND.to_string(), Arc::new(NullBackend));
        Self { backends }
    }
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a backend under its own name.
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        self.backends.insert(backend.name().to_string(), backend);
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Backend>, ConfigError> {
        let key = if name.is_empty() { NO_BACKEND } else { name };
        self.backends
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownBackend(name.to_string()))
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
