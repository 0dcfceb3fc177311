#![cfg(test)]
//! Event loop and clients against fake agents.

use std::collections::{BTreeMap, HashMap};

use rnms_common::MonitoredHost;
use rnms_core::QueryError;
use rnms_protocols::ntp::AssociationRecord;
use rnms_protocols::snmp::Value;

use crate::support::{self, FakeNtpAgent, FakeSnmpAgent, SilentAgent, SnmpBehaviour, oid, vars};

fn interfaces() -> BTreeMap<rnms_protocols::Oid, Value> {
    BTreeMap::from([
        (oid("1.3.6.1.2.1.1.2.0"), Value::ObjectId(oid("1.3.6.1.4.1.9.1.516"))),
        (oid("1.3.6.1.2.1.2.2.1.2.1"), Value::OctetString(b"lo".to_vec())),
        (oid("1.3.6.1.2.1.2.2.1.2.2"), Value::OctetString(b"eth0".to_vec())),
        (oid("1.3.6.1.2.1.2.2.1.2.3"), Value::OctetString(b"eth1".to_vec())),
        (oid("1.3.6.1.2.1.2.2.1.3.1"), Value::Integer(24)),
    ])
}

#[tokio::test]
async fn snmp_get_walk_and_list() -> anyhow::Result<()> {
    support::init();
    let agent = FakeSnmpAgent::start(interfaces()).await;
    let cfg = support::config(9, agent.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;
    let host = support::snmp_host(1);

    let sysobjid = clients.snmp.get_str(&host, &oid("1.3.6.1.2.1.1.2.0")).await?;
    assert_eq!(sysobjid.as_deref(), Some("1.3.6.1.4.1.9.1.516"));

    let rows = clients.snmp.walk(&host, &oid("1.3.6.1.2.1.2.2.1.2")).await?;
    let names: Vec<String> = rows.iter().filter_map(|row| row.value.to_text()).collect();
    assert_eq!(names, vec!["lo", "eth0", "eth1"]);

    let list = clients
        .snmp
        .get_list(&host, &[oid("1.3.6.1.2.1.2.2.1.3.1"), oid("1.3.6.1.2.1.2.2.1.2.2")])
        .await?;
    assert_eq!(list[0].value, Value::Integer(24));
    assert_eq!(list[1].value.to_text().as_deref(), Some("eth0"));

    let missing = clients.snmp.get(&host, &oid("1.3.6.1.2.1.99.0")).await?;
    assert!(missing.is_absent());
    Ok(())
}

#[tokio::test]
async fn replies_with_wrong_request_id_are_dropped() -> anyhow::Result<()> {
    support::init();
    let behaviour = SnmpBehaviour { stale_first: true, ..SnmpBehaviour::default() };
    let agent = FakeSnmpAgent::with_behaviour(interfaces(), behaviour).await;
    let cfg = support::config(9, agent.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;
    let host = support::snmp_host(1);

    let value = clients.snmp.get(&host, &oid("1.3.6.1.2.1.2.2.1.3.1")).await?;
    assert_eq!(value, Value::Integer(24));
    Ok(())
}

#[tokio::test]
async fn agent_errors_and_missing_credentials() -> anyhow::Result<()> {
    support::init();
    let behaviour = SnmpBehaviour { error_status: Some(5), ..SnmpBehaviour::default() };
    let agent = FakeSnmpAgent::with_behaviour(interfaces(), behaviour).await;
    let cfg = support::config(9, agent.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;

    let err = clients.snmp.get(&support::snmp_host(1), &oid("1.3.6.1.2.1.1.2.0")).await.unwrap_err();
    assert_eq!(err, QueryError::Agent { status: 5, index: 1 });

    let anonymous = MonitoredHost::new(2, "anon", "127.0.0.1");
    let err = clients.snmp.get(&anonymous, &oid("1.3.6.1.2.1.1.2.0")).await.unwrap_err();
    assert_eq!(err, QueryError::NotIssued);
    assert_eq!(agent.requests(), 1);
    Ok(())
}

#[tokio::test]
async fn oid_without_wire_form_is_not_issued() -> anyhow::Result<()> {
    support::init();
    let agent = FakeSnmpAgent::start(interfaces()).await;
    let cfg = support::config(9, agent.addr.port());
    let (clients, task) = rnms_core::start(&cfg).await?;
    let host = support::snmp_host(1);

    let oversized = "2.4294967295".parse::<rnms_protocols::Oid>()?;
    let err = clients.snmp.get(&host, &oversized).await.unwrap_err();
    assert_eq!(err, QueryError::NotIssued);
    assert_eq!(agent.requests(), 0);

    let value = clients.snmp.get(&host, &oid("1.3.6.1.2.1.2.2.1.3.1")).await?;
    assert_eq!(value, Value::Integer(24));
    assert!(!task.is_finished());
    Ok(())
}

#[tokio::test]
async fn silent_host_times_out() -> anyhow::Result<()> {
    support::init();
    let silent = SilentAgent::start().await;
    let cfg = support::config(silent.addr.port(), silent.addr.port());
    let (clients, _task) = rnms_core::start(&cfg).await?;
    let host = support::snmp_host(1);

    let err = clients.ntp.get_peers(&host).await.unwrap_err();
    assert!(err.is_unreachable());
    let err = clients.snmp.get(&host, &oid("1.3.6.1.2.1.1.2.0")).await.unwrap_err();
    assert_eq!(err, QueryError::NoResponse);
    Ok(())
}

#[tokio::test]
async fn fragmented_peer_listing_is_reassembled() -> anyhow::Result<()> {
    support::init();
    let peers = vec![
        AssociationRecord::new(101, 0x96, 0x14),
        AssociationRecord::new(102, 0x94, 0x14),
        AssociationRecord::new(103, 0x91, 0x00),
    ];
    let variables = HashMap::from([(101, vars(&[("srcadr", "192.0.2.10"), ("stratum", "2")]))]);
    let agent = FakeNtpAgent::start(peers, variables).await;
    let cfg = support::config(agent.addr.port(), 9);
    let (clients, _task) = rnms_core::start(&cfg).await?;
    let host = support::snmp_host(1);

    let listing = clients.ntp.get_peers(&host).await?;
    let ids: Vec<u16> = listing.peers.iter().map(|peer| peer.assoc_id).collect();
    assert_eq!(ids, vec![101, 102, 103]);
    assert_eq!(listing.peers[0].selection(), 6);
    assert!(!listing.has_more());

    let peer = clients.ntp.get_peer_by_id(&host, 101).await?;
    assert_eq!(peer.assoc_data.get("srcadr").map(String::as_str), Some("192.0.2.10"));

    let err = clients.ntp.get_peer_by_id(&host, 999).await.unwrap_err();
    assert_eq!(err, QueryError::Rejected);
    Ok(())
}

#[tokio::test]
async fn concurrent_peers_get_their_own_replies() -> anyhow::Result<()> {
    support::init();
    let first = FakeNtpAgent::start(vec![AssociationRecord::new(1, 0x96, 0)], HashMap::new()).await;
    let port = first.addr.port();
    let second_addr = format!("127.0.0.2:{port}").parse::<std::net::SocketAddr>()?;
    let second = FakeNtpAgent::start_on(second_addr, vec![AssociationRecord::new(2, 0x94, 0)], HashMap::new()).await;

    let cfg = support::config(port, 9);
    let (clients, _task) = rnms_core::start(&cfg).await?;
    let host_a = support::snmp_host(1);
    let host_b = MonitoredHost::new(2, "host2", "127.0.0.2");

    let (a, b) = tokio::join!(clients.ntp.get_peers(&host_a), clients.ntp.get_peers(&host_b));
    assert_eq!(a?.peers[0].assoc_id, 1);
    assert_eq!(b?.peers[0].assoc_id, 2);
    drop(second);
    Ok(())
}
