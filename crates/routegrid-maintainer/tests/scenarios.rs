//! End-to-end maintenance scenarios against an in-memory store.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use routegrid_core::{
    AliasTarget, ApplicationId, ClusterId, DnsZone, Endpoint, HostName, LoadBalancer,
    NameServiceRequest, PolicyKey, RecordName, RecordOperation, RecordType, RotationName,
    RoutingPolicies, RoutingPolicy, SystemName, ZoneId,
};
use routegrid_dns::{
    ForwardError, ForwardResult, MemoryNameService, NameServiceDispatcher, NameServiceForwarder,
    QueueForwarder, Record,
};
use routegrid_lb::{MemoryLoadBalancerSource, ZoneRegistry};
use routegrid_maintainer::RoutingPolicyMaintainer;
use routegrid_state::StateStore;

// ── Fixtures ───────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingForwarder {
    requests: Mutex<Vec<NameServiceRequest>>,
    failing: Mutex<BTreeSet<RecordName>>,
}

impl RecordingForwarder {
    fn fail(&self, name: RecordName) {
        self.failing.lock().unwrap().insert(name);
    }

    fn take(&self) -> Vec<NameServiceRequest> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }
}

impl NameServiceForwarder for RecordingForwarder {
    fn forward(&self, request: NameServiceRequest) -> ForwardResult<()> {
        if self.failing.lock().unwrap().contains(&request.name) {
            return Err(ForwardError::Unavailable("injected failure".to_string()));
        }
        self.requests.lock().unwrap().push(request);
        Ok(())
    }
}

struct Harness {
    store: StateStore,
    forwarder: Arc<RecordingForwarder>,
    source: Arc<MemoryLoadBalancerSource>,
    maintainer: RoutingPolicyMaintainer,
}

fn harness() -> Harness {
    let store = StateStore::open_in_memory().unwrap();
    let forwarder = Arc::new(RecordingForwarder::default());
    let source = Arc::new(MemoryLoadBalancerSource::new());
    let maintainer = RoutingPolicyMaintainer::new(
        store.clone(),
        forwarder.clone(),
        source.clone(),
        ZoneRegistry::new(vec![z1(), z2()]),
        SystemName::Main,
    );
    Harness {
        store,
        forwarder,
        source,
        maintainer,
    }
}

fn z1() -> ZoneId {
    ZoneId::new("prod", "z1")
}

fn z2() -> ZoneId {
    ZoneId::new("prod", "z2")
}

fn app(name: &str) -> ApplicationId {
    ApplicationId::new("t1", name, "default")
}

fn r1() -> RotationName {
    RotationName::from("r1")
}

fn lb(app_name: &str, cluster: &str, host: &str) -> LoadBalancer {
    LoadBalancer::new(app(app_name), ClusterId::from(cluster), HostName::from(host))
}

fn cname_name(app_name: &str, cluster: &str, zone: &ZoneId) -> RecordName {
    Endpoint::of_deployment(&app(app_name), &ClusterId::from(cluster), zone, SystemName::Main).record_name()
}

fn alias_name(app_name: &str, rotation: &RotationName) -> RecordName {
    Endpoint::of_rotation(&app(app_name), rotation, SystemName::Main).record_name()
}

fn target(host: &str, dns_zone: &str, zone: ZoneId) -> AliasTarget {
    AliasTarget {
        canonical_name: HostName::from(host),
        dns_zone: DnsZone::from(dns_zone),
        zone,
    }
}

fn cname_creates(requests: &[NameServiceRequest]) -> Vec<(RecordName, HostName)> {
    requests
        .iter()
        .filter_map(|request| match &request.operation {
            RecordOperation::CreateCname { target } => Some((request.name.clone(), target.clone())),
            _ => None,
        })
        .collect()
}

fn alias_creates(requests: &[NameServiceRequest]) -> Vec<(RecordName, BTreeSet<AliasTarget>)> {
    requests
        .iter()
        .filter_map(|request| match &request.operation {
            RecordOperation::CreateAlias { targets } => Some((request.name.clone(), targets.clone())),
            _ => None,
        })
        .collect()
}

fn removals(requests: &[NameServiceRequest], record_type: RecordType) -> Vec<RecordName> {
    requests
        .iter()
        .filter(|request| request.operation == RecordOperation::RemoveRecords { record_type })
        .map(|request| request.name.clone())
        .collect()
}

fn stored_policy(app_name: &str, cluster: &str, zone: ZoneId, host: &str, dns_zone: Option<&str>) -> RoutingPolicy {
    RoutingPolicy {
        owner: app(app_name),
        cluster: ClusterId::from(cluster),
        zone,
        canonical_name: HostName::from(host),
        dns_zone: dns_zone.map(DnsZone::from),
        rotations: [r1()].into_iter().collect(),
    }
}

fn store_policies(store: &StateStore, app_name: &str, policies: Vec<RoutingPolicy>) {
    let policies: RoutingPolicies = policies.into_iter().collect();
    store.write_routing_policies(&app(app_name), &policies).unwrap();
}

// ── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn new_rotation_gets_cnames_and_alias() {
    let h = harness();
    h.source
        .set(z1(), vec![lb("a", "default", "h1").with_dns_zone(DnsZone::from("DZ1")).with_rotation(r1())])
        .await;
    h.source.set(z2(), vec![lb("a", "default", "h2").with_rotation(r1())]).await;

    let stats = h.maintainer.maintain().await;
    let requests = h.forwarder.take();

    assert_eq!(
        cname_creates(&requests),
        vec![
            (cname_name("a", "default", &z1()), HostName::from("h1")),
            (cname_name("a", "default", &z2()), HostName::from("h2")),
        ]
    );
    assert_eq!(
        alias_creates(&requests),
        vec![(alias_name("a", &r1()), [target("h1", "DZ1", z1())].into_iter().collect())]
    );
    assert!(removals(&requests, RecordType::Cname).is_empty());
    assert!(removals(&requests, RecordType::Alias).is_empty());
    assert_eq!(stats.cnames_registered, 2);
    assert_eq!(stats.aliases_registered, 1);
    assert!(stats.is_clean());

    assert_eq!(h.store.read_routing_policies(&app("a")).unwrap().len(), 2);
}

#[tokio::test]
async fn vanished_load_balancer_is_removed() {
    let h = harness();
    store_policies(
        &h.store,
        "a",
        vec![
            stored_policy("a", "default", z1(), "h1", Some("DZ1")),
            stored_policy("a", "default", z2(), "h2", Some("DZ2")),
        ],
    );
    h.source
        .set(z2(), vec![lb("a", "default", "h2").with_dns_zone(DnsZone::from("DZ2")).with_rotation(r1())])
        .await;

    let stats = h.maintainer.maintain().await;
    let requests = h.forwarder.take();

    assert_eq!(removals(&requests, RecordType::Cname), vec![cname_name("a", "default", &z1())]);
    assert!(removals(&requests, RecordType::Alias).is_empty());
    assert_eq!(
        alias_creates(&requests),
        vec![(alias_name("a", &r1()), [target("h2", "DZ2", z2())].into_iter().collect())]
    );
    assert_eq!(stats.cnames_removed, 1);

    let remaining = h.store.read_routing_policies(&app("a")).unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining.iter().all(|policy| policy.zone == z2()));
}

#[tokio::test]
async fn last_alias_target_vanishing_removes_alias() {
    let h = harness();
    store_policies(&h.store, "a", vec![stored_policy("a", "default", z1(), "h1", Some("DZ1"))]);
    h.source.set(z2(), vec![lb("a", "default", "h2").with_rotation(r1())]).await;

    let stats = h.maintainer.maintain().await;
    let requests = h.forwarder.take();

    assert_eq!(removals(&requests, RecordType::Cname), vec![cname_name("a", "default", &z1())]);
    assert_eq!(removals(&requests, RecordType::Alias), vec![alias_name("a", &r1())]);
    assert!(alias_creates(&requests).is_empty());
    assert_eq!(stats.aliases_removed, 1);
}

#[tokio::test]
async fn failed_cname_does_not_block_siblings() {
    let h = harness();
    h.source
        .set(
            z1(),
            vec![lb("b", "c1", "h1"), lb("b", "c2", "h2"), lb("b", "c3", "h3")],
        )
        .await;
    h.forwarder.fail(cname_name("b", "c2", &z1()));

    let stats = h.maintainer.maintain().await;

    assert_eq!(stats.cnames_registered, 2);
    assert_eq!(stats.forward_failures, 1);
    assert!(stats.failed_phases.is_empty());

    let clusters: Vec<String> = h
        .store
        .read_routing_policies(&app("b"))
        .unwrap()
        .iter()
        .map(|policy| policy.cluster.to_string())
        .collect();
    assert_eq!(clusters, vec!["c1", "c3"]);
}

// ── Properties ─────────────────────────────────────────────────────

#[tokio::test]
async fn repeated_ticks_converge_to_same_state() {
    let h = harness();
    store_policies(&h.store, "a", vec![stored_policy("a", "old", z1(), "h0", Some("DZ1"))]);
    h.source
        .set(z1(), vec![lb("a", "default", "h1").with_dns_zone(DnsZone::from("DZ1")).with_rotation(r1())])
        .await;

    h.maintainer.maintain().await;
    let after_first = h.store.read_all_routing_policies().unwrap();
    h.forwarder.take();

    h.maintainer.maintain().await;
    let second = h.forwarder.take();
    h.maintainer.maintain().await;
    let third = h.forwarder.take();

    assert_eq!(h.store.read_all_routing_policies().unwrap(), after_first);
    assert_eq!(second, third);
    assert!(removals(&second, RecordType::Cname).is_empty());
    assert!(removals(&second, RecordType::Alias).is_empty());
}

#[tokio::test]
async fn live_hostnames_are_never_removed() {
    let h = harness();
    store_policies(
        &h.store,
        "a",
        vec![
            stored_policy("a", "c1", z1(), "h1", None),
            stored_policy("a", "c2", z1(), "h2", None),
        ],
    );
    h.source.set(z1(), vec![lb("a", "c1", "h1").with_rotation(r1())]).await;
    h.source.set(z2(), vec![lb("x", "c9", "h2")]).await;

    h.maintainer.maintain().await;
    let requests = h.forwarder.take();

    assert!(removals(&requests, RecordType::Cname).is_empty());
    assert_eq!(h.store.read_routing_policies(&app("a")).unwrap().len(), 2);
}

#[tokio::test]
async fn rotation_without_dns_zone_gets_no_alias() {
    let h = harness();
    h.source.set(z1(), vec![lb("a", "default", "h1").with_rotation(r1())]).await;

    let stats = h.maintainer.maintain().await;
    let requests = h.forwarder.take();

    assert!(alias_creates(&requests).is_empty());
    assert!(removals(&requests, RecordType::Alias).is_empty());
    assert_eq!(stats.aliases_registered, 0);
}

#[tokio::test]
async fn changed_hostname_replaces_policy_in_place() {
    let h = harness();
    store_policies(&h.store, "a", vec![stored_policy("a", "default", z1(), "h-old", Some("DZ1"))]);
    h.source
        .set(z1(), vec![lb("a", "default", "h-new").with_dns_zone(DnsZone::from("DZ1")).with_rotation(r1())])
        .await;

    h.maintainer.maintain().await;
    let requests = h.forwarder.take();

    let policies = h.store.read_routing_policies(&app("a")).unwrap();
    assert_eq!(policies.len(), 1);
    let key = PolicyKey {
        owner: app("a"),
        cluster: ClusterId::from("default"),
        zone: z1(),
    };
    assert_eq!(policies.get(&key).unwrap().canonical_name, HostName::from("h-new"));
    assert!(removals(&requests, RecordType::Cname).is_empty());
    assert_eq!(
        alias_creates(&requests),
        vec![(alias_name("a", &r1()), [target("h-new", "DZ1", z1())].into_iter().collect())]
    );
}

#[tokio::test]
async fn failed_zone_keeps_its_records() {
    let h = harness();
    store_policies(
        &h.store,
        "a",
        vec![
            stored_policy("a", "default", z1(), "h1", Some("DZ1")),
            stored_policy("a", "default", z2(), "h2", Some("DZ2")),
        ],
    );
    h.source.fail(z1()).await;
    h.source
        .set(z2(), vec![lb("a", "default", "h2").with_dns_zone(DnsZone::from("DZ2")).with_rotation(r1())])
        .await;

    let stats = h.maintainer.maintain().await;
    let requests = h.forwarder.take();

    assert_eq!(stats.failed_zones, 1);
    assert!(removals(&requests, RecordType::Cname).is_empty());
    assert!(removals(&requests, RecordType::Alias).is_empty());
    assert_eq!(
        alias_creates(&requests),
        vec![(
            alias_name("a", &r1()),
            [target("h1", "DZ1", z1()), target("h2", "DZ2", z2())].into_iter().collect()
        )]
    );
    assert_eq!(h.store.read_routing_policies(&app("a")).unwrap().len(), 2);
}

#[tokio::test]
async fn refused_removal_keeps_policy_for_retry() {
    let h = harness();
    store_policies(&h.store, "a", vec![stored_policy("a", "default", z1(), "h1", None)]);
    h.forwarder.fail(cname_name("a", "default", &z1()));

    let stats = h.maintainer.maintain().await;

    assert_eq!(stats.forward_failures, 1);
    assert_eq!(stats.cnames_removed, 0);
    assert_eq!(h.store.read_routing_policies(&app("a")).unwrap().len(), 1);
}

#[tokio::test]
async fn unreadable_application_does_not_stall_others() {
    let h = harness();
    let bad = LoadBalancer::new(ApplicationId::new("t1", "bad", ""), ClusterId::from("default"), HostName::from("hx"))
        .with_dns_zone(DnsZone::from("DZ1"))
        .with_rotation(r1());
    h.source
        .set(z1(), vec![bad, lb("a", "default", "h1").with_dns_zone(DnsZone::from("DZ1")).with_rotation(r1())])
        .await;

    for _ in 0..2 {
        let stats = h.maintainer.maintain().await;
        assert!(stats.failed_phases.is_empty());
    }
    let requests = h.forwarder.take();

    assert!(alias_creates(&requests).contains(&(alias_name("a", &r1()), [target("h1", "DZ1", z1())].into_iter().collect())));
    assert!(removals(&requests, RecordType::Cname).is_empty());
    assert_eq!(h.store.read_all_routing_policies().unwrap().keys().collect::<Vec<_>>(), vec![&app("a")]);
}

// ── Through the queue ──────────────────────────────────────────────

#[tokio::test]
async fn queued_requests_reach_the_name_service() {
    let store = StateStore::open_in_memory().unwrap();
    let source = Arc::new(MemoryLoadBalancerSource::new());
    let dns = Arc::new(MemoryNameService::new());
    let maintainer = RoutingPolicyMaintainer::new(
        store.clone(),
        Arc::new(QueueForwarder::new(store.clone(), 100)),
        source.clone(),
        ZoneRegistry::new(vec![z1()]),
        SystemName::Main,
    );
    let dispatcher = NameServiceDispatcher::new(store.clone(), dns.clone(), 50);

    source
        .set(z1(), vec![lb("a", "default", "h1").with_dns_zone(DnsZone::from("DZ1")).with_rotation(r1())])
        .await;
    maintainer.maintain().await;
    maintainer.maintain().await;
    assert_eq!(store.name_service_queue_len().unwrap(), 2);
    dispatcher.dispatch_batch().await.unwrap();

    let cname = RecordName::from("default--a--t1.z1.prod.routegrid.net");
    let alias = RecordName::from("r1--a--t1.global.routegrid.net");
    assert_eq!(
        dns.record(&cname, RecordType::Cname).await,
        Some(Record::Cname(HostName::from("h1")))
    );
    assert_eq!(
        dns.record(&alias, RecordType::Alias).await,
        Some(Record::Alias([target("h1", "DZ1", z1())].into_iter().collect()))
    );

    source.set(z1(), vec![]).await;
    maintainer.maintain().await;
    dispatcher.dispatch_batch().await.unwrap();

    assert!(dns.records().await.is_empty());
    assert!(store.read_all_routing_policies().unwrap().is_empty());
}
