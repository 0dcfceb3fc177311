use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(10);
pub const NTP_PORT: u16 = 123;
pub const SNMP_PORT: u16 = 161;

#[derive(Debug, Clone)]
pub struct Config {
    /// How long a dispatched request waits for its reply.
    pub job_timeout: Duration,
    /// Remote port for NTP control queries.
    pub ntp_port: u16,
    /// Remote port for SNMP requests.
    pub snmp_port: u16,
    /// Idle wait of the event loop between two ticks.
    pub tick_interval: Duration,
    /// Connect timeout of TCP reachability checks.
    pub tcp_connect_timeout: Duration,
    /// Average time between two discoveries of the same host.
    pub discover_interval: Duration,
    /// Spread applied around `discover_interval`.
    pub discover_variance: Duration,
    /// Runs discovery rules even when the host is not due yet.
    pub force_discovery: bool,
    /// Local address of the IPv4 dispatchers.
    pub bind_v4: SocketAddr,
    /// Local address of the IPv6 dispatchers; `None` disables them.
    pub bind_v6: Option<SocketAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            job_timeout: DEFAULT_JOB_TIMEOUT,
            ntp_port: NTP_PORT,
            snmp_port: SNMP_PORT,
            tick_interval: Duration::from_millis(10),
            tcp_connect_timeout: Duration::from_secs(3),
            discover_interval: Duration::from_secs(30 * 60),
            discover_variance: Duration::from_secs(10 * 60),
            force_discovery: false,
            bind_v4: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            bind_v6: Some(SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))),
        }
    }
}

impl Config {
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_ports(mut self, ntp_port: u16, snmp_port: u16) -> Self {
        self.ntp_port = ntp_port;
        self.snmp_port = snmp_port;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_tcp_connect_timeout(mut self, timeout: Duration) -> Self {
        self.tcp_connect_timeout = timeout;
        self
    }

    pub fn with_force_discovery(mut self, force: bool) -> Self {
        self.force_discovery = force;
        self
    }

    /// Binds only to the loopback interface. Used by tests and local agents.
    pub fn loopback_only(mut self) -> Self {
        self.bind_v4 = SocketAddr::from((Ipv4Addr::LOCALHOST, 0));
        self.bind_v6 = None;
        self
    }
}
