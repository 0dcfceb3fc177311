//! Fake NTP and SNMP agents. Each one answers on its own loopback port until
//! dropped.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rnms_common::{Community, Config, MonitoredHost};
use rnms_protocols::Oid;
use rnms_protocols::ntp::{AssociationRecord, ControlMessage};
use rnms_protocols::snmp::{Message, PduType, Value, VarBind};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub fn init() {
    rnms_common::logging::init_logging();
}

pub fn oid(text: &str) -> Oid {
    text.parse().expect("valid oid")
}

/// Loopback config with short timeouts, pointed at the given agent ports.
pub fn config(ntp_port: u16, snmp_port: u16) -> Config {
    Config::default()
        .loopback_only()
        .with_ports(ntp_port, snmp_port)
        .with_job_timeout(Duration::from_millis(300))
        .with_tcp_connect_timeout(Duration::from_millis(300))
}

pub fn snmp_host(id: u32) -> MonitoredHost {
    MonitoredHost::new(id, &format!("host{id}"), "127.0.0.1").with_community(Community::v2c("public"))
}

/// A UDP socket that never answers.
pub struct SilentAgent {
    pub addr: SocketAddr,
    _socket: UdpSocket,
}

impl SilentAgent {
    pub async fn start() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let addr = socket.local_addr().expect("local addr");
        Self { addr, _socket: socket }
    }
}

#[derive(Clone, Copy, Default)]
pub struct SnmpBehaviour {
    /// Send a reply with a wrong request id before every real one.
    pub stale_first: bool,
    /// Answer every request with this error status.
    pub error_status: Option<i64>,
}

pub struct FakeSnmpAgent {
    pub addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl FakeSnmpAgent {
    pub async fn start(objects: BTreeMap<Oid, Value>) -> Self {
        Self::with_behaviour(objects, SnmpBehaviour::default()).await
    }

    pub async fn with_behaviour(objects: BTreeMap<Oid, Value>, behaviour: SnmpBehaviour) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind");
        let addr = socket.local_addr().expect("local addr");
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 65_535];
            loop {
                let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let Ok(request) = Message::decode(&buf[..len]) else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut reply = Message::response_to(&request, answer(&objects, &request));
                if let Some(status) = behaviour.error_status {
                    reply.pdu.error_status = status;
                    reply.pdu.error_index = 1;
                }

                if behaviour.stale_first {
                    let mut stale = reply.clone();
                    stale.pdu.request_id = request.pdu.request_id.wrapping_add(1000);
                    if let Ok(bytes) = stale.encode() {
                        let _ = socket.send_to(&bytes, from).await;
                    }
                }
                if let Ok(bytes) = reply.encode() {
                    let _ = socket.send_to(&bytes, from).await;
                }
            }
        });

        Self { addr, requests, task }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for FakeSnmpAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn answer(objects: &BTreeMap<Oid, Value>, request: &Message) -> Vec<VarBind> {
    request
        .pdu
        .varbinds
        .iter()
        .map(|asked| match request.pdu.pdu_type {
            PduType::GetNext => match objects.range((std::ops::Bound::Excluded(asked.oid.clone()), std::ops::Bound::Unbounded)).next() {
                Some((oid, value)) => VarBind::new(oid.clone(), value.clone()),
                None => VarBind::new(asked.oid.clone(), Value::EndOfMibView),
            },
            _ => match objects.get(&asked.oid) {
                Some(value) => VarBind::new(asked.oid.clone(), value.clone()),
                None => VarBind::new(asked.oid.clone(), Value::NoSuchInstance),
            },
        })
        .collect()
}

/// An NTP server with a fixed set of associations. Peer listings with more
/// than one association are split over two datagrams.
pub struct FakeNtpAgent {
    pub addr: SocketAddr,
    task: JoinHandle<()>,
}

impl FakeNtpAgent {
    pub async fn start(
        peers: Vec<AssociationRecord>,
        variables: HashMap<u16, HashMap<String, String>>,
    ) -> Self {
        Self::start_on("127.0.0.1:0".parse().expect("addr"), peers, variables).await
    }

    pub async fn start_on(
        bind: SocketAddr,
        peers: Vec<AssociationRecord>,
        variables: HashMap<u16, HashMap<String, String>>,
    ) -> Self {
        let socket = UdpSocket::bind(bind).await.expect("bind");
        let addr = socket.local_addr().expect("local addr");

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 1024];
            loop {
                let Ok((len, from)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let Ok(request) = ControlMessage::from_wire(&buf[..len]) else {
                    continue;
                };

                let mut reply = request.clone();
                reply.header.flags.set_response(true);

                match request.opcode() {
                    1 => {
                        let half = peers.len().div_ceil(2);
                        let (first, rest) = peers.split_at(half);
                        if !rest.is_empty() {
                            let mut fragment = reply.clone();
                            fragment.header.flags.set_more(true);
                            fragment.peers = first.to_vec();
                            let _ = socket.send_to(&fragment.to_wire_with_payload(), from).await;
                            reply.peers = rest.to_vec();
                        } else {
                            reply.peers = first.to_vec();
                        }
                    }
                    2 => match variables.get(&request.header.assoc_id) {
                        Some(vars) => reply.assoc_data = vars.clone(),
                        None => reply.header.flags.set_error(true),
                    },
                    _ => continue,
                }
                let _ = socket.send_to(&reply.to_wire_with_payload(), from).await;
            }
        });

        Self { addr, task }
    }
}

impl Drop for FakeNtpAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
