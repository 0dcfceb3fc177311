//! # Event Loop
//!
//! A single task owns every dispatcher. Pollers and discovery never touch a
//! socket; they hand requests to the loop through a [`TransportHandle`] and
//! await a [`PendingReply`]. The loop stops once every handle is gone and no
//! job is left.

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::Context;
use rnms_common::{Config, TransportError};
use rnms_protocols::ntp::ControlMessage;
use rnms_protocols::snmp::Message;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, error::TryRecvError};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{debug, error, info};

use super::codec::{Codec, NtpCodec, SnmpCodec, SnmpReply};
use super::dispatcher::{Completion, Dispatcher};
use super::{AddressFamily, resolve};

enum Command {
    Ntp {
        peer: SocketAddr,
        request: ControlMessage,
        reply: oneshot::Sender<Option<ControlMessage>>,
    },
    Snmp {
        peer: SocketAddr,
        request: Message,
        reply: oneshot::Sender<Option<SnmpReply>>,
    },
}

/// A reply that has not arrived yet.
pub struct PendingReply<R> {
    rx: oneshot::Receiver<Option<R>>,
}

impl<R> PendingReply<R> {
    /// Resolves with the response, or `None` when the job timed out, the
    /// reply could not be decoded or the event loop went away.
    pub async fn wait(self) -> Option<R> {
        self.rx.await.ok().flatten()
    }
}

fn channel_completion<R: Send + 'static>(reply: oneshot::Sender<Option<R>>) -> Completion<R> {
    Box::new(move |_peer, response| {
        // the requester may have given up already
        let _ = reply.send(response);
    })
}

/// Cloneable entry point to the event loop.
#[derive(Clone)]
pub struct TransportHandle {
    tx: UnboundedSender<Command>,
    ntp_port: u16,
    snmp_port: u16,
    ipv6: bool,
}

impl TransportHandle {
    /// Sends an NTP control query to `address`. Returns `None` when the
    /// request could not be queued: unresolvable address, disabled address
    /// family or a stopped event loop.
    pub async fn ntp(
        &self,
        address: &str,
        request: ControlMessage,
    ) -> Option<PendingReply<ControlMessage>> {
        let peer = self.peer(address, self.ntp_port).await?;
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Ntp { peer, request, reply }).ok()?;
        Some(PendingReply { rx })
    }

    /// Sends an SNMP request to `address`. Same failure rules as [`Self::ntp`].
    pub async fn snmp(&self, address: &str, request: Message) -> Option<PendingReply<SnmpReply>> {
        let peer = self.peer(address, self.snmp_port).await?;
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Snmp { peer, request, reply }).ok()?;
        Some(PendingReply { rx })
    }

    async fn peer(&self, address: &str, port: u16) -> Option<SocketAddr> {
        let peer = resolve(address, port).await?;
        match AddressFamily::of(&peer) {
            AddressFamily::V6 if !self.ipv6 => {
                debug!(%peer, "no IPv6 dispatcher, request not issued");
                None
            }
            _ => Some(peer),
        }
    }
}

/// The IPv4 dispatcher of a protocol and, if enabled, its IPv6 twin.
struct DispatcherSet<C: Codec> {
    v4: Dispatcher<C>,
    v6: Option<Dispatcher<C>>,
}

impl<C: Codec> DispatcherSet<C> {
    async fn bind(cfg: &Config) -> anyhow::Result<Self> {
        let v4 = Dispatcher::bind(cfg.bind_v4, cfg.job_timeout)
            .await
            .with_context(|| format!("{} dispatcher on {}", C::NAME, cfg.bind_v4))?;

        let v6 = match cfg.bind_v6 {
            Some(addr) => match Dispatcher::bind(addr, cfg.job_timeout).await {
                Ok(dispatcher) => Some(dispatcher),
                Err(e) => {
                    info!(protocol = C::NAME, error = %e, "IPv6 unavailable, continuing without it");
                    None
                }
            },
            None => None,
        };

        Ok(Self { v4, v6 })
    }

    fn enqueue(&mut self, peer: SocketAddr, request: C::Request, on_complete: Completion<C::Response>) {
        let dispatcher = match AddressFamily::of(&peer) {
            AddressFamily::V4 => Some(&mut self.v4),
            AddressFamily::V6 => self.v6.as_mut(),
        };
        match dispatcher {
            Some(dispatcher) => {
                dispatcher.enqueue(peer, request, on_complete);
            }
            None => on_complete(peer, None),
        }
    }

    fn tick(&mut self, now: Instant) -> bool {
        let mut busy = log_failure(self.v4.tick(now));
        if let Some(v6) = self.v6.as_mut() {
            busy |= log_failure(v6.tick(now));
        }
        busy
    }

    fn has_ipv6(&self) -> bool {
        self.v6.is_some()
    }

    /// Resolves once either socket has a datagram waiting.
    async fn readable(&self) {
        match &self.v6 {
            Some(v6) => {
                tokio::select! {
                    _ = wait_readable(&self.v4) => {}
                    _ = wait_readable(v6) => {}
                }
            }
            None => wait_readable(&self.v4).await,
        }
    }
}

async fn wait_readable<C: Codec>(dispatcher: &Dispatcher<C>) {
    if let Err(e) = dispatcher.readable().await {
        debug!(protocol = C::NAME, error = %e, "readiness wait failed");
        // the ticker keeps driving this dispatcher
        std::future::pending::<()>().await;
    }
}

fn log_failure(result: Result<bool, TransportError>) -> bool {
    match result {
        Ok(busy) => busy,
        Err(e) => {
            error!(error = %e, "dispatcher tick failed");
            // the failed job is gone, the others are still tracked
            true
        }
    }
}

pub struct EventLoop {
    ntp: DispatcherSet<NtpCodec>,
    snmp: DispatcherSet<SnmpCodec>,
    commands: UnboundedReceiver<Command>,
    tick_interval: Duration,
    closed: bool,
}

impl EventLoop {
    /// Binds every dispatcher and returns the loop with its first handle.
    pub async fn new(cfg: &Config) -> anyhow::Result<(Self, TransportHandle)> {
        let ntp = DispatcherSet::bind(cfg).await?;
        let snmp = DispatcherSet::bind(cfg).await?;
        let (tx, commands) = mpsc::unbounded_channel();

        let handle = TransportHandle {
            tx,
            ntp_port: cfg.ntp_port,
            snmp_port: cfg.snmp_port,
            ipv6: ntp.has_ipv6() && snmp.has_ipv6(),
        };

        Ok((
            Self {
                ntp,
                snmp,
                commands,
                tick_interval: cfg.tick_interval,
                closed: false,
            },
            handle,
        ))
    }

    /// Binds the dispatchers and runs the loop on its own task.
    pub async fn spawn(cfg: &Config) -> anyhow::Result<(TransportHandle, JoinHandle<()>)> {
        let (event_loop, handle) = Self::new(cfg).await?;
        Ok((handle, tokio::spawn(event_loop.run())))
    }

    /// Accepts pending commands, then ticks every dispatcher once. Returns
    /// whether any dispatcher still has work.
    pub fn tick(&mut self, now: Instant) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.accept(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }

        let ntp_busy = self.ntp.tick(now);
        let snmp_busy = self.snmp.tick(now);
        ntp_busy || snmp_busy
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let busy = self.tick(Instant::now());
            if self.closed && !busy {
                break;
            }

            if busy {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = self.ntp.readable() => {}
                    _ = self.snmp.readable() => {}
                }
                continue;
            }

            match self.commands.recv().await {
                Some(command) => self.accept(command),
                None => self.closed = true,
            }
        }

        debug!("event loop finished");
    }

    /// Ticks until every queued and in-flight job has completed, for
    /// callers that schedule work in batches.
    pub async fn run_until_idle(&mut self) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        while self.tick(Instant::now()) {
            ticker.tick().await;
        }
    }

    fn accept(&mut self, command: Command) {
        match command {
            Command::Ntp { peer, request, reply } => {
                self.ntp.enqueue(peer, request, channel_completion(reply));
            }
            Command::Snmp { peer, request, reply } => {
                self.snmp.enqueue(peer, request, channel_completion(reply));
            }
        }
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
