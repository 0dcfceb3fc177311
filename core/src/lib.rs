//! Polling and discovery engine.
//!
//! [`network`] owns the sockets, [`client`] turns requests into awaitable
//! replies, [`poller`] runs poll chains per attribute and [`discovery`]
//! finds new attributes on hosts.

pub mod client;
pub mod discovery;
pub mod network;
pub mod poller;

use rnms_common::Config;
use tokio::task::JoinHandle;

pub use client::{Clients, QueryError};
pub use discovery::{DiscoveryEngine, DiscoveryReport, DiscoveryRule};
pub use network::event_loop::{EventLoop, PendingReply, TransportHandle};
pub use poller::engine::PollEngine;
pub use poller::{PollOutcome, Poller, PollerRegistry};

/// Starts the event loop on its own task and returns the clients bound to it.
pub async fn start(cfg: &Config) -> anyhow::Result<(Clients, JoinHandle<()>)> {
    let (handle, task) = EventLoop::spawn(cfg).await?;
    Ok((Clients::new(handle, cfg), task))
}
