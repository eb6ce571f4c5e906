//! Integration tests wiring trust store, coordinator and evaluator together
//! with the nullable key store, system trust and decision providers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use trustgate_manager::{
    ChannelDecisionProvider, DecisionCoordinator, DecisionEvent, DecisionProvider, SystemTrust,
    TrustEvaluator, TrustStore,
};
use trustgate_nullables::{NullDecisionProvider, NullKeyStore, NullSystemTrust};
use trustgate_store_lmdb::environment::DEFAULT_MAP_SIZE;
use trustgate_store_lmdb::LmdbEnvironment;
use trustgate_types::{Certificate, DecisionSource, ForegroundHint, TrustError, TrustRecord};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const FG: Option<ForegroundHint> = Some(ForegroundHint::Foreground);

struct Harness {
    key_store: NullKeyStore,
    store: Arc<TrustStore>,
    coordinator: DecisionCoordinator,
    evaluator: Arc<TrustEvaluator>,
    system: Arc<NullSystemTrust>,
    provider: Arc<NullDecisionProvider>,
}

fn harness(provider: NullDecisionProvider) -> Harness {
    harness_with(provider, NullSystemTrust::rejecting(), Duration::from_secs(60))
}

fn harness_with(
    provider: NullDecisionProvider,
    system: NullSystemTrust,
    timeout: Duration,
) -> Harness {
    let key_store = NullKeyStore::new();
    let store = Arc::new(TrustStore::new(Arc::new(key_store.clone())));
    let coordinator = DecisionCoordinator::with_timeout(Arc::clone(&store), timeout);
    let system = Arc::new(system);
    let provider = Arc::new(provider);
    let system_dyn: Arc<dyn SystemTrust> = system.clone();
    let provider_dyn: Arc<dyn DecisionProvider> = provider.clone();
    let evaluator = Arc::new(TrustEvaluator::new(
        Arc::clone(&store),
        coordinator.clone(),
        system_dyn,
        provider_dyn,
    ));
    Harness {
        key_store,
        store,
        coordinator,
        evaluator,
        system,
        provider,
    }
}

fn cert(seed: u8) -> Certificate {
    Certificate::from_der(vec![0x30, 0x82, 0x01, seed, seed ^ 0x5a])
}

async fn wait_for_waiters(coordinator: &DecisionCoordinator, cert: &Certificate, n: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while coordinator.waiter_count(cert) != n {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("waiters did not show up");
}

fn spawn_evaluation(
    evaluator: &Arc<TrustEvaluator>,
    cert: Certificate,
) -> tokio::task::JoinHandle<Result<bool, TrustError>> {
    let evaluator = Arc::clone(evaluator);
    tokio::spawn(async move { evaluator.evaluate(&[cert], "RSA", true, FG).await })
}

/// System trust that parks the calling evaluation until released. The store
/// lookups have already happened by the time it is consulted.
struct HeldSystemTrust {
    entered: AtomicBool,
    release: Mutex<mpsc::Receiver<()>>,
}

impl HeldSystemTrust {
    fn new() -> (Arc<Self>, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let held = Arc::new(Self {
            entered: AtomicBool::new(false),
            release: Mutex::new(rx),
        });
        (held, tx)
    }

    async fn wait_entered(&self) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.entered.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("evaluation never reached the system trust");
    }
}

impl SystemTrust for HeldSystemTrust {
    fn accepts(&self, _chain: &[Certificate], _auth_type: &str) -> bool {
        self.entered.store(true, Ordering::SeqCst);
        let _ = self.release.lock().unwrap().recv();
        false
    }
}

fn spawn_held_evaluation(
    evaluator: &Arc<TrustEvaluator>,
    held: Arc<HeldSystemTrust>,
    cert: Certificate,
) -> tokio::task::JoinHandle<Result<bool, TrustError>> {
    let evaluator = Arc::clone(evaluator);
    tokio::spawn(async move {
        evaluator
            .evaluate_with(held.as_ref(), &[cert], "RSA", true, FG)
            .await
    })
}

// ---------------------------------------------------------------------------
// 1. Deduplication and fan-out
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_evaluations_issue_one_request() {
    let (provider, gate) = NullDecisionProvider::gated(true);
    let h = harness(provider);
    let c = cert(1);

    let tasks: Vec<_> = (0..10).map(|_| spawn_evaluation(&h.evaluator, c.clone())).collect();
    wait_for_waiters(&h.coordinator, &c, 10).await;
    assert_eq!(h.coordinator.pending_count(), 1);

    gate.open();
    for task in tasks {
        assert!(task.await.unwrap().unwrap());
    }
    assert_eq!(h.provider.calls(), 1);
    assert_eq!(h.coordinator.pending_count(), 0);
    assert_eq!(h.store.record(&c), TrustRecord::UserTrusted);
}

#[tokio::test]
async fn different_certificates_get_their_own_requests() {
    let (provider, gate) = NullDecisionProvider::gated(false);
    let h = harness(provider);

    let a = spawn_evaluation(&h.evaluator, cert(1));
    let b = spawn_evaluation(&h.evaluator, cert(2));
    wait_for_waiters(&h.coordinator, &cert(1), 1).await;
    wait_for_waiters(&h.coordinator, &cert(2), 1).await;
    assert_eq!(h.coordinator.pending_count(), 2);

    gate.open();
    assert!(!a.await.unwrap().unwrap());
    assert!(!b.await.unwrap().unwrap());
    assert_eq!(h.provider.calls(), 2);
    assert!(h.store.is_user_distrusted(&cert(1)));
    assert!(h.store.is_user_distrusted(&cert(2)));
}

// ---------------------------------------------------------------------------
// 2. Cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cancelled_waiter_does_not_affect_the_others() {
    let (provider, gate) = NullDecisionProvider::gated(true);
    let h = harness(provider);
    let c = cert(3);
    let mut events = h.coordinator.subscribe();

    let mut tasks: Vec<_> = (0..5).map(|_| spawn_evaluation(&h.evaluator, c.clone())).collect();
    wait_for_waiters(&h.coordinator, &c, 5).await;

    // Cancel the caller that issued the request.
    let cancelled = tasks.remove(0);
    cancelled.abort();
    assert!(cancelled.await.unwrap_err().is_cancelled());
    wait_for_waiters(&h.coordinator, &c, 4).await;

    gate.open();
    for task in tasks {
        assert!(task.await.unwrap().unwrap());
    }
    assert_eq!(h.provider.calls(), 1);

    let mut saw_cancel = false;
    let mut delivered = None;
    while let Ok(event) = events.try_recv() {
        match event {
            DecisionEvent::WaiterCancelled { remaining, .. } => {
                assert_eq!(remaining, 4);
                saw_cancel = true;
            }
            DecisionEvent::Resolved { waiters, .. } => delivered = Some(waiters),
            DecisionEvent::Requested { .. } => {}
        }
    }
    assert!(saw_cancel);
    assert_eq!(delivered, Some(4));
}

#[tokio::test]
async fn decision_is_persisted_when_every_waiter_left() {
    let (provider, gate) = NullDecisionProvider::gated(true);
    let h = harness(provider);
    let c = cert(4);

    let task = spawn_evaluation(&h.evaluator, c.clone());
    wait_for_waiters(&h.coordinator, &c, 1).await;
    task.abort();
    let _ = task.await;
    wait_for_waiters(&h.coordinator, &c, 0).await;
    assert_eq!(h.coordinator.pending_count(), 1);

    gate.open();
    tokio::time::timeout(Duration::from_secs(5), async {
        while h.coordinator.pending_count() != 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap();
    assert!(h.store.is_user_trusted(&c));
}

#[tokio::test]
async fn bounded_wait_gives_up_without_cancelling_request() {
    let (provider, gate) = NullDecisionProvider::gated(true);
    let h = harness(provider);
    let c = cert(5);

    let provider = Arc::clone(&h.provider);
    let outcome = h
        .coordinator
        .resolve_within(
            &c,
            move |cert| provider.request(cert, ForegroundHint::Foreground),
            Duration::from_millis(20),
        )
        .await;
    assert_eq!(outcome, None);
    assert!(h.coordinator.is_pending(&c));

    // A later caller joins the request that is still in flight.
    let late = spawn_evaluation(&h.evaluator, c.clone());
    wait_for_waiters(&h.coordinator, &c, 1).await;
    gate.open();
    assert!(late.await.unwrap().unwrap());
    assert_eq!(h.provider.calls(), 1);
}

// ---------------------------------------------------------------------------
// 3. Timeout and out-of-band decisions
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn provider_timeout_is_session_distrust() {
    let h = harness_with(
        NullDecisionProvider::silent(),
        NullSystemTrust::rejecting(),
        Duration::from_secs(60),
    );
    let c = cert(6);
    let mut events = h.coordinator.subscribe();

    let trusted = h.evaluator.evaluate(&[c.clone()], "RSA", true, FG).await.unwrap();
    assert!(!trusted);
    assert_eq!(h.store.record(&c), TrustRecord::UserDistrusted);
    assert_eq!(h.coordinator.pending_count(), 0);
    assert!(h.key_store.entries().is_empty());

    let mut source = None;
    while let Ok(event) = events.try_recv() {
        if let DecisionEvent::Resolved { source: s, .. } = event {
            source = Some(s);
        }
    }
    assert_eq!(source, Some(DecisionSource::Timeout));

    // Once distrusted, the provider is not asked again.
    assert!(!h.evaluator.evaluate(&[c], "RSA", true, FG).await.unwrap());
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn submitted_decision_resolves_all_waiters() {
    let h = harness(NullDecisionProvider::silent());
    let c = cert(7);

    let tasks: Vec<_> = (0..3).map(|_| spawn_evaluation(&h.evaluator, c.clone())).collect();
    wait_for_waiters(&h.coordinator, &c, 3).await;

    assert_eq!(h.coordinator.submit_decision(&c, true), 3);
    for task in tasks {
        assert!(task.await.unwrap().unwrap());
    }
    assert!(h.store.is_user_trusted(&c));
    assert_eq!(h.key_store.entries().len(), 1);
}

#[tokio::test]
async fn channel_provider_round_trip() {
    let (provider, mut requests) = ChannelDecisionProvider::new(8);
    let key_store = NullKeyStore::new();
    let store = Arc::new(TrustStore::new(Arc::new(key_store)));
    let coordinator = DecisionCoordinator::new(Arc::clone(&store));
    let evaluator = TrustEvaluator::new(
        Arc::clone(&store),
        coordinator,
        Arc::new(NullSystemTrust::rejecting()),
        Arc::new(provider),
    );

    let ui = tokio::spawn(async move {
        let request = requests.recv().await.expect("decision request");
        assert_eq!(request.hint, ForegroundHint::Background);
        request.respond(true);
    });

    let trusted = evaluator
        .evaluate(&[cert(8)], "RSA", true, Some(ForegroundHint::Background))
        .await
        .unwrap();
    assert!(trusted);
    ui.await.unwrap();
    assert!(store.is_user_trusted(&cert(8)));
}

// ---------------------------------------------------------------------------
// 3a. Evaluations racing a decision
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn evaluation_racing_a_trust_decision_does_not_ask_again() {
    let h = harness(NullDecisionProvider::sequence([true, false]));
    let c = cert(50);
    let (held, release) = HeldSystemTrust::new();

    // The late caller has seen an unknown certificate but not yet asked.
    let late = spawn_held_evaluation(&h.evaluator, Arc::clone(&held), c.clone());
    held.wait_entered().await;

    assert!(h.evaluator.evaluate(&[c.clone()], "RSA", true, FG).await.unwrap());
    release.send(()).unwrap();

    assert!(late.await.unwrap().unwrap());
    assert_eq!(h.provider.calls(), 1);
    assert_eq!(h.coordinator.pending_count(), 0);
    assert_eq!(h.store.record(&c), TrustRecord::UserTrusted);
    assert_eq!(h.key_store.entries().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn evaluation_racing_a_rejection_does_not_ask_again() {
    let h = harness(NullDecisionProvider::sequence([false, true]));
    let c = cert(51);
    let (held, release) = HeldSystemTrust::new();

    let late = spawn_held_evaluation(&h.evaluator, Arc::clone(&held), c.clone());
    held.wait_entered().await;

    assert!(!h.evaluator.evaluate(&[c.clone()], "RSA", true, FG).await.unwrap());
    release.send(()).unwrap();

    assert!(!late.await.unwrap().unwrap());
    assert_eq!(h.provider.calls(), 1);
    assert_eq!(h.store.record(&c), TrustRecord::UserDistrusted);
    assert!(h.key_store.entries().is_empty());
}

// ---------------------------------------------------------------------------
// 4. Precedence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_trust_beats_system_rejection() {
    let h = harness(NullDecisionProvider::answering(false));
    h.store.set_trusted(&cert(9));

    assert!(h.evaluator.evaluate(&[cert(9)], "RSA", true, None).await.unwrap());
    assert_eq!(h.system.calls(), 0);
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn system_trust_accepts_without_asking() {
    let h = harness_with(
        NullDecisionProvider::answering(false),
        NullSystemTrust::accepting(),
        Duration::from_secs(60),
    );
    assert!(h.evaluator.evaluate(&[cert(10)], "RSA", true, FG).await.unwrap());
    assert_eq!(h.system.calls(), 1);
    assert_eq!(h.provider.calls(), 0);
    assert_eq!(h.store.record(&cert(10)), TrustRecord::Unknown);

    // Without system roots the same chain needs a decision.
    assert!(!h.evaluator.evaluate(&[cert(10)], "RSA", false, FG).await.unwrap());
    assert_eq!(h.system.calls(), 1);
    assert_eq!(h.provider.calls(), 1);
}

#[tokio::test]
async fn non_interactive_unknown_is_rejected_without_provider() {
    let h = harness(NullDecisionProvider::answering(true));
    assert!(!h.evaluator.evaluate(&[cert(11)], "RSA", true, None).await.unwrap());
    assert_eq!(h.provider.calls(), 0);
    assert_eq!(h.coordinator.pending_count(), 0);
    assert_eq!(h.store.record(&cert(11)), TrustRecord::Unknown);
}

#[tokio::test]
async fn distrusted_then_trusted() {
    let h = harness(NullDecisionProvider::answering(true));
    let c = cert(12);
    h.store.set_distrusted(&c);

    assert!(!h.evaluator.evaluate(&[c.clone()], "RSA", true, FG).await.unwrap());
    assert_eq!(h.provider.calls(), 0);

    h.store.set_trusted(&c);
    assert!(h.evaluator.evaluate(&[c], "RSA", true, FG).await.unwrap());
    assert_eq!(h.provider.calls(), 0);
}

#[tokio::test]
async fn unreachable_provider_rejects_without_pending_request() {
    let h = harness(NullDecisionProvider::answering(true));
    h.provider.set_available(false);

    assert!(!h.evaluator.evaluate(&[cert(13)], "RSA", true, FG).await.unwrap());
    assert_eq!(h.provider.calls(), 0);
    assert_eq!(h.coordinator.pending_count(), 0);
}

#[tokio::test]
async fn empty_chain_is_rejected_as_input_error() {
    let h = harness(NullDecisionProvider::answering(true));
    let result = h.evaluator.evaluate(&[], "RSA", true, FG).await;
    assert!(matches!(result, Err(TrustError::EmptyChain)));
}

#[tokio::test]
async fn cleared_distrust_can_be_asked_again() {
    let h = harness(NullDecisionProvider::answering(false));
    let c = cert(14);

    assert!(!h.evaluator.evaluate(&[c.clone()], "RSA", true, FG).await.unwrap());
    assert!(!h.evaluator.evaluate(&[c.clone()], "RSA", true, FG).await.unwrap());
    assert_eq!(h.provider.calls(), 1);

    h.store.clear_all_decisions();
    assert!(!h.evaluator.evaluate(&[c], "RSA", true, FG).await.unwrap());
    assert_eq!(h.provider.calls(), 2);
}

#[tokio::test]
async fn provider_sees_foreground_hint() {
    let h = harness(NullDecisionProvider::answering(true));
    let c = cert(15);
    h.evaluator
        .evaluate(&[c.clone()], "RSA", true, Some(ForegroundHint::Background))
        .await
        .unwrap();
    let requests = h.provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, trustgate_crypto::fingerprint(&c));
    assert_eq!(requests[0].1, ForegroundHint::Background);
}

// ---------------------------------------------------------------------------
// 5. Persistence
// ---------------------------------------------------------------------------

#[test]
fn trust_survives_restart_but_distrust_does_not() {
    let key_store = NullKeyStore::new();
    {
        let store = TrustStore::new(Arc::new(key_store.clone()));
        store.set_trusted(&cert(20));
        store.set_distrusted(&cert(21));
    }

    let restarted = TrustStore::new(Arc::new(key_store));
    assert_eq!(restarted.record(&cert(20)), TrustRecord::UserTrusted);
    assert_eq!(restarted.record(&cert(21)), TrustRecord::Unknown);
}

#[test]
fn distrust_removes_persisted_trust() {
    let key_store = NullKeyStore::new();
    let store = TrustStore::new(Arc::new(key_store.clone()));
    store.set_trusted(&cert(22));
    assert_eq!(key_store.entries().len(), 1);

    store.set_distrusted(&cert(22));
    assert!(key_store.entries().is_empty());

    // Distrusting something that was never trusted writes nothing.
    let saves = key_store.save_count();
    store.set_distrusted(&cert(23));
    assert_eq!(key_store.save_count(), saves);
}

#[test]
fn persisted_keys_are_sha512_fingerprints() {
    let key_store = NullKeyStore::new();
    let store = TrustStore::new(Arc::new(key_store.clone()));
    store.set_trusted(&cert(24));

    let entries = key_store.entries();
    let (key, der) = entries.iter().next().unwrap();
    assert_eq!(key, &trustgate_crypto::fingerprint(&cert(24)).to_hex());
    assert_eq!(key.len(), 128);
    assert_eq!(der.as_slice(), cert(24).as_der());
}

#[test]
fn persistence_failure_keeps_in_memory_decision() {
    let key_store = NullKeyStore::new();
    let store = TrustStore::new(Arc::new(key_store.clone()));
    key_store.fail_saves(true);

    let result = store.try_set_trusted(&cert(25));
    assert!(matches!(result, Err(TrustError::StorePersistenceFailure(_))));
    assert!(store.is_user_trusted(&cert(25)));
    assert!(key_store.entries().is_empty());

    // Retrying once the backend recovers makes it durable.
    key_store.fail_saves(false);
    store.try_set_trusted(&cert(25)).unwrap();
    let restarted = TrustStore::new(Arc::new(key_store));
    assert!(restarted.is_user_trusted(&cert(25)));
}

#[test]
fn unreadable_key_store_starts_empty() {
    let key_store = NullKeyStore::new();
    key_store.fail_loads(true);
    let store = TrustStore::new(Arc::new(key_store));
    assert_eq!(store.trusted_count(), 0);
    store.set_trusted(&cert(26));
    assert!(store.is_user_trusted(&cert(26)));
}

#[test]
fn clear_all_decisions_persists_empty_set() {
    let key_store = NullKeyStore::new();
    let store = TrustStore::new(Arc::new(key_store.clone()));
    store.set_trusted(&cert(27));
    store.set_distrusted(&cert(28));

    store.try_clear_all_decisions().unwrap();
    assert_eq!(store.trusted_count(), 0);
    assert_eq!(store.distrusted_count(), 0);
    assert!(key_store.entries().is_empty());
}

#[test]
fn lmdb_round_trip_across_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    {
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).expect("open env");
        let store = TrustStore::new(Arc::new(env.key_store()));
        store.try_set_trusted(&cert(30)).unwrap();
        store.try_set_trusted(&cert(31)).unwrap();
        store.try_set_distrusted(&cert(31)).unwrap();
    }

    let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).expect("reopen env");
    let store = TrustStore::new(Arc::new(env.key_store()));
    assert_eq!(store.record(&cert(30)), TrustRecord::UserTrusted);
    assert_eq!(store.record(&cert(31)), TrustRecord::Unknown);
    assert_eq!(store.trusted_certificates(), vec![cert(30)]);
}

// ---------------------------------------------------------------------------
// 6. Blocking boundary
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blocking_callers_share_one_request() {
    let (provider, gate) = NullDecisionProvider::gated(true);
    let h = harness(provider);
    let c = cert(40);

    let callers: Vec<_> = (0..3)
        .map(|_| {
            let evaluator = Arc::clone(&h.evaluator);
            let c = c.clone();
            tokio::task::spawn_blocking(move || evaluator.evaluate_blocking(&[c], "RSA", true, FG))
        })
        .collect();
    wait_for_waiters(&h.coordinator, &c, 3).await;

    gate.open();
    for caller in callers {
        assert!(caller.await.unwrap().unwrap());
    }
    assert_eq!(h.provider.calls(), 1);
}
