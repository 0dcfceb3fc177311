#![cfg(test)]
//! Poll chains with the built-in pollers against fake agents.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rnms_common::{Attribute, PollValue};
use rnms_core::PollEngine;
use rnms_core::poller::PollOutcome;
use rnms_core::poller::backend::{BackendRegistry, ChannelBackend};
use rnms_core::poller::chain::PollerRow;
use rnms_core::poller::plugins;
use rnms_protocols::ntp::AssociationRecord;
use rnms_protocols::snmp::Value;
use tokio::net::TcpListener;

use crate::support::{self, FakeNtpAgent, FakeSnmpAgent, SilentAgent, oid, vars};

const SLA: u32 = 1;
const NTP: u32 = 2;
const IFACE: u32 = 3;
const SERVICE: u32 = 4;

fn sla_objects() -> BTreeMap<rnms_protocols::Oid, Value> {
    let entry = "1.3.6.1.4.1.9.9.42.1.5.2.1";
    let column = |c: u32| oid(&format!("{entry}.{c}.12"));
    BTreeMap::from([
        (column(8), Value::Gauge32(8)),
        (column(9), Value::Gauge32(20)),
        (column(13), Value::Gauge32(3)),
        (column(14), Value::Gauge32(25)),
        (column(1), Value::Integer(0)),
        (column(2), Value::Integer(0)),
        (column(26), Value::Integer(4)),
        (column(27), Value::Integer(2)),
        (oid("1.3.6.1.2.1.2.2.1.10.2"), Value::Counter32(1234)),
        (oid("1.3.6.1.2.1.2.2.1.8.2"), Value::Integer(1)),
    ])
}

#[tokio::test]
async fn sla_and_interface_chains() -> anyhow::Result<()> {
    support::init();
    let agent = FakeSnmpAgent::start(sla_objects()).await;
    let cfg = support::config(9, agent.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;

    let (store, mut deliveries) = ChannelBackend::new("store");
    let mut backends = BackendRegistry::new();
    backends.register(Arc::new(store));

    let mut engine = PollEngine::new(clients, plugins::builtin()?, backends);
    engine.set_chain(
        SLA,
        vec![
            PollerRow::new(1, "cisco_saagent", "<index>|fwd_jitter", "store"),
            PollerRow::new(2, "cisco_saagent", "<index>|packetloss", "store"),
        ],
    )?;
    engine.set_chain(
        IFACE,
        vec![
            PollerRow::new(1, "snmp_counter", "1.3.6.1.2.1.2.2.1.10.<index>", ""),
            PollerRow::new(2, "buffer", "1.3.6.1.2.1.2.2.1.10.<index>", "store"),
            PollerRow::new(3, "snmp_status", "1.3.6.1.2.1.2.2.1.8.<index>|1", "store"),
        ],
    )?;

    let host = support::snmp_host(1);
    let sla = Attribute::new(100, 1, SLA, "12");
    let iface = Attribute::new(200, 1, IFACE, "2");
    let reports = engine.poll_attributes(&[(&host, &sla), (&host, &iface)]).await;

    let jitter = reports[0].outcomes[0].1.value().as_number().unwrap();
    assert!((jitter - 45.0 / 11.0).abs() < 1e-9);
    assert_eq!(reports[0].outcomes[1].1, PollOutcome::tuple(vec![0.0, 0.0, 0.0]));

    assert_eq!(reports[1].outcomes[0].1, PollOutcome::number(1234.0));
    assert_eq!(reports[1].outcomes[1].1, PollOutcome::number(1234.0));
    assert_eq!(reports[1].outcomes[2].1, PollOutcome::number(1.0));

    let mut delivered = HashMap::new();
    while let Ok(delivery) = deliveries.try_recv() {
        delivered.entry(delivery.attribute_id).or_insert_with(Vec::new).push(delivery.value);
    }
    assert_eq!(delivered[&100].len(), 2);
    assert_eq!(delivered[&200], vec![PollValue::Number(1234.0), PollValue::Number(1.0)]);
    Ok(())
}

#[tokio::test]
async fn ntp_client_reads_the_system_peer() -> anyhow::Result<()> {
    support::init();
    let peers = vec![AssociationRecord::new(7, 0x94, 0), AssociationRecord::new(8, 0x96, 0)];
    let variables = HashMap::from([(8, vars(&[("stratum", "3"), ("offset", "0.25"), ("srcadr", "192.0.2.1")]))]);
    let agent = FakeNtpAgent::start(peers, variables).await;
    let cfg = support::config(agent.addr.port(), 9);
    let (clients, _task) = rnms_core::start(&cfg).await?;

    let mut engine = PollEngine::new(clients, plugins::builtin()?, BackendRegistry::new());
    engine.set_chain(NTP, vec![PollerRow::new(1, "ntp_client", "", "")])?;

    let host = support::snmp_host(1);
    let report = engine.poll_attribute(&host, &Attribute::new(300, 1, NTP, "0")).await;
    assert_eq!(report.outcomes[0].1, PollOutcome::tuple(vec![1.0, 3.0, 0.25]));
    Ok(())
}

#[tokio::test]
async fn unreachable_host_stops_the_chain() -> anyhow::Result<()> {
    support::init();
    let silent = SilentAgent::start().await;
    let cfg = support::config(silent.addr.port(), silent.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;

    let mut engine = PollEngine::new(clients, plugins::builtin()?, BackendRegistry::new());
    engine.set_chain(
        IFACE,
        vec![
            PollerRow::new(1, "snmp_counter", "1.3.6.1.2.1.2.2.1.10.<index>", ""),
            PollerRow::new(2, "buffer", "1.3.6.1.2.1.2.2.1.10.<index>", ""),
            PollerRow::new(3, "snmp_status", "1.3.6.1.2.1.2.2.1.8.<index>|1", ""),
        ],
    )?;

    let host = support::snmp_host(1);
    let report = engine.poll_attribute(&host, &Attribute::new(200, 1, IFACE, "2")).await;
    assert!(report.aborted);
    assert_eq!(report.steps_run(), 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.outcomes[0].1, PollOutcome::Unreachable);
    Ok(())
}

#[tokio::test]
async fn malformed_parameters_do_not_stop_the_chain() -> anyhow::Result<()> {
    support::init();
    let agent = FakeSnmpAgent::start(sla_objects()).await;
    let cfg = support::config(9, agent.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;

    let mut engine = PollEngine::new(clients, plugins::builtin()?, BackendRegistry::new());
    engine.set_chain(
        SLA,
        vec![
            PollerRow::new(1, "cisco_saagent", "<index>|sideways", ""),
            PollerRow::new(2, "cisco_saagent", "<index>", ""),
            PollerRow::new(3, "cisco_saagent", "<index>|bwd_jitter", ""),
        ],
    )?;

    let host = support::snmp_host(1);
    let report = engine.poll_attribute(&host, &Attribute::new(100, 1, SLA, "12")).await;
    assert!(!report.aborted);
    assert_eq!(report.outcomes[0].1, PollOutcome::NoValue);
    assert_eq!(report.outcomes[1].1, PollOutcome::NoValue);
    // bwd columns are not served by the agent
    assert_eq!(report.outcomes[2].1, PollOutcome::NoValue);
    assert_eq!(agent.requests(), 1);
    Ok(())
}

#[tokio::test]
async fn tcp_status_open_and_refused() -> anyhow::Result<()> {
    support::init();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let open_port = listener.local_addr()?.port();
    let closed = TcpListener::bind("127.0.0.1:0").await?;
    let closed_port = closed.local_addr()?.port();
    drop(closed);

    let cfg = support::config(9, 9);
    let (clients, _task) = rnms_core::start(&cfg).await?;
    let mut engine = PollEngine::new(clients, plugins::builtin()?, BackendRegistry::new());
    engine.set_chain(SERVICE, vec![PollerRow::new(1, "tcp_status", "", "")])?;

    let host = support::snmp_host(1);
    let open = Attribute::new(1, 1, SERVICE, &open_port.to_string());
    let refused = Attribute::new(2, 1, SERVICE, &closed_port.to_string());
    let reports = engine.poll_attributes(&[(&host, &open), (&host, &refused)]).await;

    assert_eq!(reports[0].outcomes[0].1, PollOutcome::number(1.0));
    assert_eq!(reports[1].outcomes[0].1, PollOutcome::number(0.0));
    Ok(())
}

#[test]
fn chains_with_unknown_names_are_rejected() {
    let registry = plugins::builtin().unwrap();
    let result = rnms_core::poller::chain::PollChain::build(
        vec![PollerRow::new(1, "snmp_countr", "", "")],
        &registry,
        &BackendRegistry::new(),
    );
    assert!(result.is_err());
}
