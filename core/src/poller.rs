//! # Poller
//!
//! A poller is a named plugin that reads one value for one attribute. Pollers
//! are chained per attribute type: each step runs a poller, hands its value
//! to a backend and leaves intermediate results in a [`PollBuffer`] that the
//! later steps of the same chain can read.

pub mod backend;
pub mod chain;
pub mod engine;
pub mod plugins;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rnms_common::{Attribute, ConfigError, MonitoredHost, PollValue};

use crate::client::Clients;

/// Scratch space shared by the steps of one chain run.
#[derive(Debug, Default, Clone)]
pub struct PollBuffer {
    entries: HashMap<String, String>,
}

impl PollBuffer {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Value(PollValue),
    /// The step ran but produced nothing usable: bad parameters, an agent
    /// error, a missing object.
    NoValue,
    /// The host did not answer. The rest of the chain is skipped.
    Unreachable,
}

impl PollOutcome {
    pub fn number(value: f64) -> Self {
        PollOutcome::Value(PollValue::Number(value))
    }

    pub fn tuple(values: Vec<f64>) -> Self {
        PollOutcome::Value(PollValue::Tuple(values))
    }

    /// What the backend receives for this outcome.
    pub fn value(&self) -> PollValue {
        match self {
            PollOutcome::Value(value) => value.clone(),
            PollOutcome::NoValue | PollOutcome::Unreachable => PollValue::Empty,
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, PollOutcome::Unreachable)
    }
}

/// Read-only view handed to each step.
pub struct PollContext<'a> {
    pub host: &'a MonitoredHost,
    pub attribute: &'a Attribute,
    pub clients: &'a Clients,
}

#[async_trait]
pub trait Poller: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs one step. `params` has already been expanded for the attribute.
    async fn poll(&self, buffer: &mut PollBuffer, params: &str, ctx: &PollContext<'_>) -> PollOutcome;
}

/// Name to plugin lookup, filled once at start-up.
#[derive(Default, Clone)]
pub struct PollerRegistry {
    pollers: HashMap<&'static str, Arc<dyn Poller>>,
}

impl PollerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, poller: Arc<dyn Poller>) -> Result<(), ConfigError> {
        let name = poller.name();
        if self.pollers.contains_key(name) {
            return Err(ConfigError::DuplicatePoller(name.to_string()));
        }
        self.pollers.insert(name, poller);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Poller>> {
        self.pollers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.pollers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.pollers.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Fills `<tag>` placeholders of a parameter template from the attribute.
///
/// `<index>` and `<name>` map to the attribute's index and display name,
/// any other tag to the attribute field of that name. `<<` stands for a
/// literal `<`.
pub fn expand_parameters(
    poller: &str,
    template: &str,
    attribute: &Attribute,
) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidParameter {
        poller: poller.to_string(),
        reason,
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        if let Some(stripped) = after.strip_prefix('<') {
            out.push('<');
            rest = stripped;
            continue;
        }

        let Some(end) = after.find('>') else {
            return Err(invalid(format!("unterminated placeholder in '{template}'")));
        };
        let tag = &after[..end];
        let value = match tag {
            "index" => attribute.index.as_str(),
            "name" => attribute.display_name.as_str(),
            other => attribute
                .field(other)
                .ok_or_else(|| invalid(format!("attribute has no field '{other}'")))?,
        };
        out.push_str(value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
