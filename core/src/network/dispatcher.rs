//! # Dispatcher
//!
//! One UDP socket, one protocol, one address family. Requests wait in a FIFO
//! queue until their peer has nothing in flight; at most one request per peer
//! address is outstanding at any time, so replies are matched on the sender
//! address (plus the echoed request id where the codec provides one).
//!
//! The dispatcher never blocks. All progress happens in [`Dispatcher::tick`],
//! which sends at most one queued request, drains readable datagrams and
//! expires overdue jobs, in that order.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use rnms_common::TransportError;
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

use super::AddressFamily;
use super::codec::Codec;

/// Upper bound of datagrams handled in a single tick.
pub const MAX_READS_PER_TICK: usize = 64;

const RECV_BUFFER_LEN: usize = 65_535;

/// Invoked exactly once per job: with the accumulated response, or `None` on
/// timeout, undecodable reply, unencodable request or send failure.
pub type Completion<R> = Box<dyn FnOnce(SocketAddr, Option<R>) + Send + Sync>;

struct Job<C: Codec> {
    peer: SocketAddr,
    sequence: u32,
    request: C::Request,
    response: C::Response,
    on_complete: Completion<C::Response>,
    deadline: Option<Instant>,
}

impl<C: Codec> Job<C> {
    fn complete(self, response: Option<C::Response>) {
        (self.on_complete)(self.peer, response);
    }
}

pub struct Dispatcher<C: Codec> {
    socket: UdpSocket,
    family: AddressFamily,
    timeout: Duration,
    queue: VecDeque<Job<C>>,
    in_flight: HashMap<SocketAddr, Job<C>>,
    next_sequence: u32,
    buf: Vec<u8>,
}

impl<C: Codec> Dispatcher<C> {
    pub async fn bind(addr: SocketAddr, timeout: Duration) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| TransportError::Bind { addr, source })?;
        debug!(protocol = C::NAME, local = %addr, "dispatcher bound");

        Ok(Self {
            socket,
            family: AddressFamily::of(&addr),
            timeout,
            queue: VecDeque::new(),
            in_flight: HashMap::new(),
            next_sequence: rand::random::<u32>(),
            buf: vec![0u8; RECV_BUFFER_LEN],
        })
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn has_work(&self) -> bool {
        !self.queue.is_empty() || !self.in_flight.is_empty()
    }

    /// Queues `request` for `peer`. Returns `false` without queueing when the
    /// peer belongs to the other address family.
    pub fn enqueue(
        &mut self,
        peer: SocketAddr,
        mut request: C::Request,
        on_complete: Completion<C::Response>,
    ) -> bool {
        if AddressFamily::of(&peer) != self.family {
            return false;
        }

        let sequence = C::stamp(&mut request, self.next_sequence);
        self.next_sequence = self.next_sequence.wrapping_add(1);

        self.queue.push_back(Job {
            peer,
            sequence,
            request,
            response: C::Response::default(),
            on_complete,
            deadline: None,
        });
        trace!(protocol = C::NAME, %peer, sequence, "job queued");
        true
    }

    /// Runs one round of work. Returns whether jobs remain queued or in
    /// flight. A failed send is reported after the rest of the tick ran; the
    /// affected job has already been completed with `None`.
    pub fn tick(&mut self, now: Instant) -> Result<bool, TransportError> {
        let sent = self.send_next(now);
        self.read_replies();
        self.expire(now);
        sent?;
        Ok(self.has_work())
    }

    /// Resolves once the socket has a datagram waiting.
    pub async fn readable(&self) -> io::Result<()> {
        self.socket.readable().await
    }

    fn send_next(&mut self, now: Instant) -> Result<(), TransportError> {
        let Some(position) = self
            .queue
            .iter()
            .position(|job| !self.in_flight.contains_key(&job.peer))
        else {
            return Ok(());
        };
        let Some(mut job) = self.queue.remove(position) else {
            return Ok(());
        };

        let datagram = match C::encode(&job.request) {
            Ok(datagram) => datagram,
            Err(e) => {
                warn!(protocol = C::NAME, peer = %job.peer, error = %e, "request cannot be encoded, dropped");
                job.complete(None);
                return Ok(());
            }
        };
        match self.socket.try_send_to(&datagram, job.peer) {
            Ok(_) => {
                trace!(protocol = C::NAME, peer = %job.peer, sequence = job.sequence, "request sent");
                job.deadline = Some(now + self.timeout);
                self.in_flight.insert(job.peer, job);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                self.queue.insert(position, job);
                Ok(())
            }
            Err(source) => {
                let peer = job.peer;
                job.complete(None);
                Err(TransportError::Send { peer, source })
            }
        }
    }

    fn read_replies(&mut self) {
        for _ in 0..MAX_READS_PER_TICK {
            match self.socket.try_recv_from(&mut self.buf) {
                Ok((len, from)) => {
                    let datagram = self.buf[..len].to_vec();
                    self.handle_datagram(&datagram, from);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    // ICMP errors from earlier sends surface here on some platforms
                    debug!(protocol = C::NAME, error = %e, "receive failed");
                    break;
                }
            }
        }
    }

    fn handle_datagram(&mut self, datagram: &[u8], from: SocketAddr) {
        let Some(job) = self.in_flight.get_mut(&from) else {
            warn!(protocol = C::NAME, peer = %from, "reply from peer without a job, dropped");
            return;
        };

        let fragment = match C::decode(datagram) {
            Ok(fragment) => fragment,
            Err(e) => {
                debug!(protocol = C::NAME, peer = %from, error = %e, "undecodable reply");
                if let Some(job) = self.in_flight.remove(&from) {
                    job.complete(None);
                }
                return;
            }
        };

        if let Some(echoed) = C::correlation(&fragment)
            && echoed != job.sequence
        {
            warn!(
                protocol = C::NAME,
                peer = %from,
                expected = job.sequence,
                echoed,
                "reply for another request, dropped"
            );
            return;
        }

        let more = C::has_more(&fragment);
        C::merge(&mut job.response, fragment);
        if more {
            return;
        }

        if let Some(mut job) = self.in_flight.remove(&from) {
            let response = std::mem::take(&mut job.response);
            job.complete(Some(response));
        }
    }

    fn expire(&mut self, now: Instant) {
        let overdue: Vec<SocketAddr> = self
            .in_flight
            .iter()
            .filter(|(_, job)| job.deadline.is_some_and(|deadline| deadline <= now))
            .map(|(peer, _)| *peer)
            .collect();

        for peer in overdue {
            if let Some(job) = self.in_flight.remove(&peer) {
                debug!(protocol = C::NAME, %peer, sequence = job.sequence, "request timed out");
                job.complete(None);
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
