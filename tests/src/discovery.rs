#![cfg(test)]
//! Discovery sessions against fake agents.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use rnms_common::MonitoredHost;
use rnms_core::discovery::rules::{NtpPeersRule, SnmpTableRule, TcpPortsRule};
use rnms_core::{DiscoveryEngine, DiscoveryRule};
use rnms_protocols::ntp::AssociationRecord;
use rnms_protocols::snmp::Value;
use tokio::net::TcpListener;

use crate::support::{self, FakeNtpAgent, FakeSnmpAgent, oid, vars};

const IFACE: u32 = 3;
const SLA: u32 = 5;
const NTP_PEER: u32 = 6;
const SERVICE: u32 = 7;

fn cisco_router() -> BTreeMap<rnms_protocols::Oid, Value> {
    BTreeMap::from([
        (oid("1.3.6.1.2.1.1.2.0"), Value::ObjectId(oid("1.3.6.1.4.1.9.1.516"))),
        (oid("1.3.6.1.2.1.2.2.1.2.1"), Value::OctetString(b"Loopback0".to_vec())),
        (oid("1.3.6.1.2.1.2.2.1.2.4"), Value::OctetString(b"GigabitEthernet0/1".to_vec())),
        (oid("1.3.6.1.2.1.2.2.1.3.1"), Value::Integer(24)),
        (oid("1.3.6.1.4.1.9.9.42.1.2.1.1.2.12"), Value::OctetString(b"voice".to_vec())),
    ])
}

fn rules() -> Vec<Arc<dyn DiscoveryRule>> {
    vec![
        Arc::new(SnmpTableRule::new(IFACE, "interfaces", oid("1.3.6.1.2.1.2.2.1.2"))),
        Arc::new(SnmpTableRule::new(SLA, "sla", oid("1.3.6.1.4.1.9.9.42.1.2.1.1.2")).for_vendor("ent.9")),
        Arc::new(SnmpTableRule::new(99, "net-snmp only", oid("1.3.6.1.4.1.2021.2.1.2")).for_vendor("ent.2021")),
    ]
}

#[tokio::test]
async fn snmp_session_fetches_identity_then_tables() -> anyhow::Result<()> {
    support::init();
    let agent = FakeSnmpAgent::start(cisco_router()).await;
    let cfg = support::config(9, agent.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;
    let engine = DiscoveryEngine::new(clients, rules(), cfg.clone());

    let mut host = support::snmp_host(1);
    let before = SystemTime::now();
    let report = engine.discover_host(&mut host).await;

    assert_eq!(host.sysobjid.as_deref(), Some("ent.9.1.516"));
    assert!(host.next_discover >= before + Duration::from_secs(25 * 60));

    let interfaces = &report.discovered[&IFACE];
    let names: Vec<&str> = interfaces.values().map(|a| a.display_name.as_str()).collect();
    assert_eq!(names, vec!["Loopback0", "GigabitEthernet0/1"]);
    assert!(interfaces.contains_key("4"));

    assert_eq!(report.discovered[&SLA]["12"].display_name, "voice");
    assert!(!report.discovered.contains_key(&99), "vendor mismatch skipped");
    Ok(())
}

#[tokio::test]
async fn recently_discovered_host_is_left_alone_unless_forced() -> anyhow::Result<()> {
    support::init();
    let agent = FakeSnmpAgent::start(cisco_router()).await;
    let cfg = support::config(9, agent.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;

    let mut host = support::snmp_host(1);
    let scheduled = SystemTime::now() + Duration::from_secs(600);
    host.next_discover = scheduled;

    let lazy = DiscoveryEngine::new(clients.clone(), rules(), cfg.clone());
    for _ in 0..3 {
        let report = lazy.discover_host(&mut host).await;
        assert!(report.discovered.is_empty());
    }
    assert_eq!(agent.requests(), 0, "no identity query for a host that is not due");
    assert_eq!(host.next_discover, scheduled);
    assert_eq!(host.sysobjid, None);

    let eager = DiscoveryEngine::new(clients, rules(), cfg.clone().with_force_discovery(true));
    let report = eager.discover_host(&mut host).await;
    assert_eq!(report.discovered.len(), 2);
    assert_eq!(host.sysobjid.as_deref(), Some("ent.9.1.516"));
    assert!(host.next_discover > scheduled);
    Ok(())
}

#[tokio::test]
async fn many_hosts_at_once() -> anyhow::Result<()> {
    support::init();
    let agent = FakeSnmpAgent::start(cisco_router()).await;
    let cfg = support::config(9, agent.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;
    let engine = DiscoveryEngine::new(clients, rules(), cfg);

    let mut hosts = vec![
        support::snmp_host(1),
        MonitoredHost::new(2, "no credentials", "127.0.0.1"),
        support::snmp_host(3),
    ];
    let reports = engine.discover_hosts(&mut hosts).await;

    let ids: Vec<u32> = reports.iter().map(|r| r.host_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(reports[0].discovered.len(), 2);
    assert!(reports[1].discovered.is_empty());
    assert_eq!(reports[2].discovered, reports[0].discovered);
    assert_eq!(hosts[1].sysobjid, None);
    Ok(())
}

#[tokio::test]
async fn ntp_peers_and_tcp_ports() -> anyhow::Result<()> {
    support::init();
    let peers = vec![AssociationRecord::new(11, 0x96, 0), AssociationRecord::new(12, 0x94, 0)];
    let variables = HashMap::from([(11, vars(&[("srcadr", "192.0.2.10")]))]);
    let ntp = FakeNtpAgent::start(peers, variables).await;
    let snmp = FakeSnmpAgent::start(cisco_router()).await;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let open_port = listener.local_addr()?.port();
    let closed = TcpListener::bind("127.0.0.1:0").await?;
    let closed_port = closed.local_addr()?.port();
    drop(closed);

    let cfg = support::config(ntp.addr.port(), snmp.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;
    let rules: Vec<Arc<dyn DiscoveryRule>> = vec![
        Arc::new(NtpPeersRule::new(NTP_PEER)),
        Arc::new(TcpPortsRule::new(SERVICE, vec![closed_port, open_port])),
    ];
    let engine = DiscoveryEngine::new(clients, rules, cfg);

    let mut host = support::snmp_host(1).with_sysobjid("ent.8072");
    let report = engine.discover_host(&mut host).await;

    let peers = &report.discovered[&NTP_PEER];
    assert_eq!(peers["11"].display_name, "192.0.2.10");
    assert_eq!(peers["12"].display_name, "12", "peer without variables keeps its id");

    let ports: Vec<&String> = report.discovered[&SERVICE].keys().collect();
    assert_eq!(ports, vec![&open_port.to_string()]);
    Ok(())
}
