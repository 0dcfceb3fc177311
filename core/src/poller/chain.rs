//! # Poll Chains
//!
//! The ordered steps configured for one attribute type. Names are resolved
//! when the chain is built so a typo fails at start-up, not at dispatch.

use std::sync::Arc;

use rnms_common::ConfigError;
use tracing::{debug, error};

use super::backend::{Backend, BackendRegistry};
use super::{PollBuffer, PollContext, PollOutcome, Poller, PollerRegistry, expand_parameters};

/// One configured step, as the model layer stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerRow {
    pub position: u32,
    pub poller: String,
    /// Parameter template, see [`expand_parameters`].
    pub parameters: String,
    /// Empty means no backend.
    pub backend: String,
}

impl PollerRow {
    pub fn new(position: u32, poller: &str, parameters: &str, backend: &str) -> Self {
        Self {
            position,
            poller: poller.to_string(),
            parameters: parameters.to_string(),
            backend: backend.to_string(),
        }
    }
}

struct Step {
    row: PollerRow,
    poller: Arc<dyn Poller>,
    backend: Arc<dyn Backend>,
}

pub struct PollChain {
    steps: Vec<Step>,
}

/// What happened to one attribute during one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainReport {
    pub attribute_id: u64,
    /// `(poller name, outcome)` of every step that ran, in order.
    pub outcomes: Vec<(String, PollOutcome)>,
    pub skipped: usize,
    pub aborted: bool,
}

impl ChainReport {
    pub fn steps_run(&self) -> usize {
        self.outcomes.len()
    }
}

impl PollChain {
    /// Binds every row to its poller and backend, ordered by position.
    pub fn build(
        mut rows: Vec<PollerRow>,
        pollers: &PollerRegistry,
        backends: &BackendRegistry,
    ) -> Result<Self, ConfigError> {
        rows.sort_by_key(|row| row.position);

        let steps = rows
            .into_iter()
            .map(|row| {
                let poller = pollers
                    .get(&row.poller)
                    .ok_or_else(|| ConfigError::UnknownPoller(row.poller.clone()))?;
                let backend = backends.resolve(&row.backend)?;
                Ok(Step { row, poller, backend })
            })
            .collect::<Result<Vec<Step>, ConfigError>>()?;

        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn poller_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.row.poller.as_str()).collect()
    }

    /// Runs the steps in order. Every outcome is delivered to the step's
    /// backend; an unreachable outcome ends the run.
    pub async fn run(&self, ctx: &PollContext<'_>) -> ChainReport {
        let attribute_id = ctx.attribute.id;
        let mut buffer = PollBuffer::default();
        let mut report = ChainReport {
            attribute_id,
            outcomes: Vec::with_capacity(self.steps.len()),
            skipped: 0,
            aborted: false,
        };

        for (done, step) in self.steps.iter().enumerate() {
            let name = step.row.poller.as_str();

            let outcome = match expand_parameters(name, &step.row.parameters, ctx.attribute) {
                Ok(params) => step.poller.poll(&mut buffer, &params, ctx).await,
                Err(e) => {
                    error!(attribute = attribute_id, poller = name, error = %e, "bad poller parameters");
                    PollOutcome::NoValue
                }
            };

            step.backend.deliver(attribute_id, &outcome.value());
            let unreachable = outcome.is_unreachable();
            report.outcomes.push((name.to_string(), outcome));

            if unreachable {
                report.skipped = self.steps.len() - done - 1;
                report.aborted = true;
                debug!(
                    attribute = attribute_id,
                    poller = name,
                    skipped = report.skipped,
                    "attribute unreachable, chain stopped"
                );
                break;
            }
        }

        report
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
