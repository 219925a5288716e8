//! End-to-end tests for the alert engine against an in-memory database.
//!
//! Run with: cargo test -p alert-engine --test engine_tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use alert_engine::{
    AlertEngine, DangerClassifier, DangerModel, EngineConfig, EngineError, FeatureVector,
    SensorReading, SensorType, Sensitivity, TriggerReason,
};
use async_trait::async_trait;
use chrono::Utc;
use database::{alert, contact, device, location, training, user, Alert, AlertStatus, Database, User};
use notifier::{ChannelError, ChannelKind, Notifier, NotifyChannel, PushMessage, PushSender};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

type Outbox = Arc<Mutex<Vec<(String, String)>>>;

struct RecordingChannel {
    kind: ChannelKind,
    outbox: Outbox,
}

#[async_trait]
impl NotifyChannel for RecordingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, to: &str, body: &str) -> Result<(), ChannelError> {
        self.outbox
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

struct FailingChannel;

#[async_trait]
impl NotifyChannel for FailingChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn name(&self) -> &'static str {
        "failing"
    }

    async fn send(&self, _to: &str, _body: &str) -> Result<(), ChannelError> {
        Err(ChannelError::Rejected {
            status: 503,
            message: "provider down".to_string(),
        })
    }
}

struct SlowChannel;

#[async_trait]
impl NotifyChannel for SlowChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WhatsApp
    }

    fn name(&self) -> &'static str {
        "slow"
    }

    async fn send(&self, _to: &str, _body: &str) -> Result<(), ChannelError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingPush {
    tokens: Mutex<Vec<String>>,
}

#[async_trait]
impl PushSender for RecordingPush {
    fn name(&self) -> &'static str {
        "recording-push"
    }

    async fn send_push(&self, device_token: &str, _message: &PushMessage) -> Result<(), ChannelError> {
        self.tokens.lock().unwrap().push(device_token.to_string());
        Ok(())
    }
}

struct FixedModel(f64);

impl DangerModel for FixedModel {
    fn version(&self) -> &str {
        "fixed"
    }

    fn predict(&self, _features: &FeatureVector) -> f64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Harness {
    engine: AlertEngine,
    db: Database,
    sms: Outbox,
    whatsapp: Outbox,
    push: Arc<RecordingPush>,
}

async fn test_db() -> Database {
    let db = Database::connect_with_pool_size("sqlite::memory:", 1)
        .await
        .unwrap();
    db.migrate().await.unwrap();
    db
}

async fn harness_with(classifier: DangerClassifier, config: EngineConfig) -> Harness {
    let db = test_db().await;
    let sms = Outbox::default();
    let whatsapp = Outbox::default();
    let push = Arc::new(RecordingPush::default());

    let notifier = Notifier::with_channels(
        vec![
            Arc::new(RecordingChannel {
                kind: ChannelKind::Sms,
                outbox: Arc::clone(&sms),
            }),
            Arc::new(RecordingChannel {
                kind: ChannelKind::WhatsApp,
                outbox: Arc::clone(&whatsapp),
            }),
        ],
        push.clone(),
    );

    Harness {
        engine: AlertEngine::new(db.clone(), notifier, classifier, config),
        db,
        sms,
        whatsapp,
        push,
    }
}

async fn harness() -> Harness {
    harness_with(DangerClassifier::without_model(), EngineConfig::default()).await
}

async fn seed_user(db: &Database, id: &str, contacts: usize) {
    user::create_user(
        db.pool(),
        &User {
            id: id.to_string(),
            full_name: "Asha Rao".to_string(),
            sos_message: None,
            fcm_token: Some(format!("fcm-{}", id)),
        },
    )
    .await
    .unwrap();

    for i in 0..contacts {
        contact::add_contact(
            db.pool(),
            id,
            &format!("Contact {}", i),
            &format!("+1555000000{}", i),
            None,
        )
        .await
        .unwrap();
    }
}

fn countdown_alert(id: &str, user_id: &str, age: chrono::Duration) -> Alert {
    Alert {
        id: id.to_string(),
        user_id: user_id.to_string(),
        trigger_type: "manual".to_string(),
        latitude: 1.0,
        longitude: 2.0,
        address: None,
        status: AlertStatus::Countdown,
        sos_message: "Emergency!".to_string(),
        contacted: Vec::new(),
        triggered_at: Utc::now() - age,
        sent_at: None,
        resolved_at: None,
    }
}

fn window() -> Vec<SensorReading> {
    (0..4)
        .map(|i| SensorReading {
            x: 0.5 * i as f64,
            y: 9.8,
            z: -0.2,
            timestamp: 1_700_000_000_000 + i * 20,
        })
        .collect()
}

/// Wait for background training writes to land.
async fn wait_for_samples(db: &Database, expected: i64) -> i64 {
    for _ in 0..100 {
        let count = training::count_samples(db.pool()).await.unwrap();
        if count >= expected {
            return count;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    training::count_samples(db.pool()).await.unwrap()
}

// ---------------------------------------------------------------------------
// Manual trigger and lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_first_trigger_sends_to_every_contact() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 2).await;

    let outcome = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap();

    assert_eq!(outcome.reason, TriggerReason::Triggered);
    let sent = outcome.alert.unwrap();
    assert_eq!(sent.status, AlertStatus::Sent);
    assert_eq!(sent.trigger_type, "manual");
    assert_eq!(sent.contacted, vec!["+15550000000", "+15550000001"]);
    assert!(sent.sent_at.is_some());
    assert!(sent.sent_at.unwrap() >= sent.triggered_at);
    assert!(sent.resolved_at.is_none());
    assert_eq!(sent.sos_message, "Emergency!");

    let sms = h.sms.lock().unwrap().clone();
    let whatsapp = h.whatsapp.lock().unwrap().clone();
    assert_eq!(sms.len(), 2);
    assert_eq!(whatsapp.len(), 2);
    assert!(sms[0]
        .1
        .contains("Location: https://maps.google.com/?q=10.0,20.0\nSent by Asfalis for Asha Rao"));

    // Owner push runs in the background
    for _ in 0..100 {
        if !h.push.tokens.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*h.push.tokens.lock().unwrap(), vec!["fcm-user-1".to_string()]);
}

#[tokio::test]
async fn test_retrigger_within_cooldown_returns_same_alert() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 2).await;

    let first = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap();
    let second = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap();

    assert!(first.is_new());
    assert_eq!(second.reason, TriggerReason::OnCooldown);
    assert_eq!(second.alert.unwrap().id, first.alert.unwrap().id);
    assert_eq!(h.engine.history("user-1").await.unwrap().len(), 1);
    assert_eq!(h.sms.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_retrigger_after_cancel_within_cooldown_returns_no_alert() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 1).await;

    let first = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap()
        .alert
        .unwrap();
    h.engine.cancel(&first.id).await.unwrap();

    let again = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap();
    assert_eq!(again.reason, TriggerReason::OnCooldown);
    assert!(again.alert.is_none());
    assert_eq!(h.engine.history("user-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_other_sources_share_the_cooldown() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 1).await;
    h.engine
        .register_device("user-1", "Bracelet", "aa-bb-cc-dd-ee-ff", None)
        .await
        .unwrap();

    let manual = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap();
    let bracelet = h.engine.device_trigger("AA:BB:CC:DD:EE:FF").await.unwrap();

    assert_eq!(bracelet.reason, TriggerReason::OnCooldown);
    assert_eq!(bracelet.alert.unwrap().id, manual.alert.unwrap().id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_triggers_create_one_alert() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 2).await;

    let attempts = (0..8).map(|_| {
        let engine = h.engine.clone();
        tokio::spawn(async move { engine.manual_trigger("user-1", 10.0, 20.0, None).await })
    });
    let outcomes: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_new()).count(), 1);

    let ids: Vec<String> = outcomes
        .iter()
        .map(|o| o.alert.as_ref().unwrap().id.clone())
        .collect();
    assert!(ids.iter().all(|id| id == &ids[0]));

    assert_eq!(h.engine.history("user-1").await.unwrap().len(), 1);
    assert_eq!(
        alert::count_user_alerts_with_status(h.db.pool(), "user-1", AlertStatus::Countdown)
            .await
            .unwrap(),
        0
    );
    assert_eq!(h.sms.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_live_countdown_is_returned_unchanged() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 1).await;
    alert::create_alert(
        h.db.pool(),
        &countdown_alert("pending", "user-1", chrono::Duration::seconds(5)),
    )
    .await
    .unwrap();

    let outcome = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap();

    assert_eq!(outcome.reason, TriggerReason::AlreadyInCountdown);
    let existing = outcome.alert.unwrap();
    assert_eq!(existing.id, "pending");
    assert_eq!(existing.status, AlertStatus::Countdown);
    assert!(h.sms.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_countdown_is_cancelled_and_replaced() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 1).await;
    alert::create_alert(
        h.db.pool(),
        &countdown_alert("stale", "user-1", chrono::Duration::seconds(61)),
    )
    .await
    .unwrap();

    let outcome = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap();

    assert!(outcome.is_new());
    let fresh = outcome.alert.unwrap();
    assert_ne!(fresh.id, "stale");
    assert_eq!(fresh.status, AlertStatus::Sent);

    let stale = h.engine.get_alert("stale").await.unwrap();
    assert_eq!(stale.status, AlertStatus::Cancelled);
    assert!(stale.resolved_at.unwrap() >= stale.triggered_at);
    assert!(stale.contacted.is_empty());
}

#[tokio::test]
async fn test_trigger_after_cooldown_creates_new_alert() {
    let config = EngineConfig::default().with_cooldown(Duration::from_millis(100));
    let h = harness_with(DangerClassifier::without_model(), config).await;
    seed_user(&h.db, "user-1", 1).await;

    let first = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    let second = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap();

    assert!(second.is_new());
    assert_ne!(second.alert.unwrap().id, first.alert.unwrap().id);
    assert_eq!(h.engine.history("user-1").await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_message_priority_chain() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 0).await;
    let manager = h.engine.manager();

    assert_eq!(manager.resolve_message("user-1").await.unwrap(), "Emergency!");

    user::set_settings_message(h.db.pool(), "user-1", "Settings message")
        .await
        .unwrap();
    assert_eq!(
        manager.resolve_message("user-1").await.unwrap(),
        "Settings message"
    );

    user::set_sos_message(h.db.pool(), "user-1", Some("Personal message"))
        .await
        .unwrap();
    assert_eq!(
        manager.resolve_message("user-1").await.unwrap(),
        "Personal message"
    );
}

#[tokio::test]
async fn test_trigger_rejects_unknown_user_and_bad_input() {
    let h = harness().await;

    assert!(matches!(
        h.engine.manual_trigger("ghost", 10.0, 20.0, None).await,
        Err(EngineError::NotFound { entity: "User", .. })
    ));

    seed_user(&h.db, "user-1", 1).await;
    assert!(matches!(
        h.engine.manual_trigger("user-1", 95.0, 20.0, None).await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        h.engine.manual_trigger("user-1", 10.0, 20.0, Some("panic_button")).await,
        Err(EngineError::Validation(_))
    ));

    // A failed trigger does not arm the cooldown
    let outcome = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, Some("bracelet"))
        .await
        .unwrap();
    assert!(outcome.is_new());
    assert_eq!(outcome.alert.unwrap().trigger_type, "bracelet");
}

// ---------------------------------------------------------------------------
// Dispatch and closure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_dispatch_refuses_closed_and_sent_alerts() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 2).await;
    alert::create_alert(
        h.db.pool(),
        &countdown_alert("closed", "user-1", chrono::Duration::seconds(1)),
    )
    .await
    .unwrap();

    h.engine.cancel("closed").await.unwrap();
    let err = h.engine.dispatch("closed").await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::AlreadyTerminal {
            status: AlertStatus::Cancelled,
            ..
        }
    ));
    assert!(h.engine.get_alert("closed").await.unwrap().contacted.is_empty());

    let sent = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap()
        .alert
        .unwrap();
    assert!(matches!(
        h.engine.dispatch(&sent.id).await,
        Err(EngineError::AlreadyTerminal {
            status: AlertStatus::Sent,
            ..
        })
    ));
    assert_eq!(h.sms.lock().unwrap().len(), 2);

    assert!(matches!(
        h.engine.dispatch("missing").await,
        Err(EngineError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_dispatch_now_sends_countdown_alert() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 3).await;
    alert::create_alert(
        h.db.pool(),
        &countdown_alert("pending", "user-1", chrono::Duration::seconds(1)),
    )
    .await
    .unwrap();

    let report = h.engine.dispatch("pending").await.unwrap();
    assert_eq!(report.contacted.len(), 3);
    assert_eq!(report.attempted, 6);
    assert_eq!(report.failed, 0);
    assert!(report.push_attempted);

    let sent = h.engine.get_alert("pending").await.unwrap();
    assert_eq!(sent.status, AlertStatus::Sent);
    assert_eq!(sent.contacted, report.contacted);
}

#[tokio::test]
async fn test_channel_failures_do_not_stop_fan_out() {
    let db = test_db().await;
    seed_user(&db, "user-1", 2).await;
    let outbox = Outbox::default();

    let notifier = Notifier::with_channels(
        vec![
            Arc::new(FailingChannel),
            Arc::new(SlowChannel),
            Arc::new(RecordingChannel {
                kind: ChannelKind::Sms,
                outbox: Arc::clone(&outbox),
            }),
        ],
        Arc::new(RecordingPush::default()),
    );
    let config = EngineConfig::default().with_send_timeout(Duration::from_millis(50));
    let engine = AlertEngine::new(db.clone(), notifier, DangerClassifier::without_model(), config);

    alert::create_alert(
        db.pool(),
        &countdown_alert("pending", "user-1", chrono::Duration::seconds(1)),
    )
    .await
    .unwrap();

    let report = engine.dispatch("pending").await.unwrap();
    assert_eq!(report.attempted, 6);
    assert_eq!(report.failed, 4);
    assert_eq!(outbox.lock().unwrap().len(), 2);

    let sent = engine.get_alert("pending").await.unwrap();
    assert_eq!(sent.status, AlertStatus::Sent);
    assert_eq!(sent.contacted.len(), 2);
}

#[tokio::test]
async fn test_dispatch_without_contacts() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 0).await;

    let sent = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap()
        .alert
        .unwrap();
    assert_eq!(sent.status, AlertStatus::Sent);
    assert!(sent.contacted.is_empty());
}

#[tokio::test]
async fn test_cancel_and_resolve() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 1).await;

    assert!(matches!(
        h.engine.cancel("does-not-exist").await,
        Err(EngineError::NotFound { .. })
    ));

    let sent = h
        .engine
        .manual_trigger("user-1", 10.0, 20.0, None)
        .await
        .unwrap()
        .alert
        .unwrap();

    // Cancelling a sent alert closes the incident
    let cancelled = h.engine.cancel(&sent.id).await.unwrap();
    assert_eq!(cancelled.status, AlertStatus::Cancelled);
    assert!(cancelled.resolved_at.unwrap() >= cancelled.sent_at.unwrap());
    assert_eq!(cancelled.contacted, sent.contacted);

    assert!(matches!(
        h.engine.resolve(&sent.id).await,
        Err(EngineError::AlreadyTerminal { .. })
    ));
    let unchanged = h.engine.get_alert(&sent.id).await.unwrap();
    assert_eq!(unchanged.resolved_at, cancelled.resolved_at);

    alert::create_alert(
        h.db.pool(),
        &countdown_alert("to-resolve", "user-1", chrono::Duration::seconds(1)),
    )
    .await
    .unwrap();
    let resolved = h.engine.resolve("to-resolve").await.unwrap();
    assert_eq!(resolved.status, AlertStatus::Resolved);
    assert!(resolved.sent_at.is_none());
}

// ---------------------------------------------------------------------------
// Sensor auto-trigger
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_sensor_requires_protection() {
    let classifier = DangerClassifier::new(Arc::new(FixedModel(0.99)));
    let h = harness_with(classifier, EngineConfig::default()).await;
    seed_user(&h.db, "user-1", 1).await;

    let analysis = h
        .engine
        .analyze_sensor_data("user-1", SensorType::Accelerometer, &window(), Sensitivity::Medium)
        .await
        .unwrap();

    assert!(!analysis.alert_triggered);
    assert_eq!(analysis.confidence, 0.0);
    assert!(h.engine.history("user-1").await.unwrap().is_empty());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(training::count_samples(h.db.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_sensor_threshold_is_inclusive() {
    let classifier = DangerClassifier::new(Arc::new(FixedModel(0.60)));
    let h = harness_with(classifier, EngineConfig::default()).await;
    seed_user(&h.db, "user-1", 1).await;
    location::record_location(h.db.pool(), "user-1", 12.5, 77.25, Utc::now())
        .await
        .unwrap();
    h.engine.toggle_protection("user-1", true);

    let analysis = h
        .engine
        .analyze_sensor_data("user-1", SensorType::Accelerometer, &window(), Sensitivity::Medium)
        .await
        .unwrap();

    assert!(analysis.alert_triggered);
    assert_eq!(analysis.confidence, 0.60);
    let created = h.engine.get_alert(&analysis.alert_id.unwrap()).await.unwrap();
    assert_eq!(created.trigger_type, "auto_sensor:accelerometer");
    assert_eq!((created.latitude, created.longitude), (12.5, 77.25));

    assert_eq!(wait_for_samples(&h.db, 4).await, 4);
    let samples = training::list_user_samples(h.db.pool(), "user-1").await.unwrap();
    assert!(samples.iter().all(|s| s.label == 1 && !s.is_verified));
}

#[tokio::test]
async fn test_sensor_below_threshold_is_recorded_as_safe() {
    let classifier = DangerClassifier::new(Arc::new(FixedModel(0.59)));
    let h = harness_with(classifier, EngineConfig::default()).await;
    seed_user(&h.db, "user-1", 1).await;
    h.engine.toggle_protection("user-1", true);

    let analysis = h
        .engine
        .analyze_sensor_data("user-1", SensorType::Gyroscope, &window(), Sensitivity::Medium)
        .await
        .unwrap();

    assert!(!analysis.alert_triggered);
    assert!(analysis.alert_id.is_none());
    assert!(h.engine.history("user-1").await.unwrap().is_empty());

    assert_eq!(wait_for_samples(&h.db, 4).await, 4);
    let samples = training::list_user_samples(h.db.pool(), "user-1").await.unwrap();
    assert!(samples.iter().all(|s| s.label == 0 && s.sensor_type == "gyroscope"));
}

#[tokio::test]
async fn test_sensor_trigger_falls_back_to_origin_and_respects_cooldown() {
    let classifier = DangerClassifier::new(Arc::new(FixedModel(0.9)));
    let h = harness_with(classifier, EngineConfig::default()).await;
    seed_user(&h.db, "user-1", 1).await;
    h.engine.toggle_protection("user-1", true);

    let first = h
        .engine
        .analyze_sensor_data("user-1", SensorType::Gyroscope, &window(), Sensitivity::Low)
        .await
        .unwrap();
    assert!(first.alert_triggered);
    let created = h.engine.get_alert(first.alert_id.as_deref().unwrap()).await.unwrap();
    assert_eq!((created.latitude, created.longitude), (0.0, 0.0));

    let second = h
        .engine
        .analyze_sensor_data("user-1", SensorType::Gyroscope, &window(), Sensitivity::Low)
        .await
        .unwrap();
    assert!(!second.alert_triggered);
    assert_eq!(second.reason, Some(TriggerReason::OnCooldown));
    assert_eq!(second.alert_id, first.alert_id);
}

#[tokio::test]
async fn test_empty_sensor_window_rejected() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 0).await;
    h.engine.toggle_protection("user-1", true);

    assert!(matches!(
        h.engine
            .analyze_sensor_data("user-1", SensorType::Accelerometer, &[], Sensitivity::High)
            .await,
        Err(EngineError::Validation(_))
    ));
    assert!(matches!(
        h.engine
            .collect_training_data("user-1", SensorType::Accelerometer, &[], 1)
            .await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn test_collect_training_data_is_verified() {
    let h = harness().await;

    assert!(matches!(
        h.engine
            .collect_training_data("user-1", SensorType::Accelerometer, &window(), 2)
            .await,
        Err(EngineError::Validation(_))
    ));

    let written = h
        .engine
        .collect_training_data("user-1", SensorType::Accelerometer, &window(), 1)
        .await
        .unwrap();
    assert_eq!(written, 4);

    let samples = training::list_user_samples(h.db.pool(), "user-1").await.unwrap();
    assert!(samples.iter().all(|s| s.label == 1 && s.is_verified));
}

// ---------------------------------------------------------------------------
// Devices and protection status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_device_trigger() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 2).await;

    assert!(matches!(
        h.engine.device_trigger("11:22:33:44:55:66").await,
        Err(EngineError::NotFound { entity: "Device", .. })
    ));
    assert!(matches!(
        h.engine.device_trigger("not-a-mac").await,
        Err(EngineError::NotFound { entity: "Device", .. })
    ));

    h.engine
        .register_device("user-1", "Asfalis Band", "11:22:33:44:55:66", Some("1.0.2"))
        .await
        .unwrap();
    location::record_location(h.db.pool(), "user-1", -33.9, 18.4, Utc::now())
        .await
        .unwrap();

    let outcome = h.engine.device_trigger("11-22-33-44-55-66").await.unwrap();
    assert!(outcome.is_new());
    let created = outcome.alert.unwrap();
    assert_eq!(created.user_id, "user-1");
    assert_eq!(created.trigger_type, "bracelet");
    assert_eq!((created.latitude, created.longitude), (-33.9, 18.4));
    assert_eq!(created.contacted.len(), 2);
}

#[tokio::test]
async fn test_protection_status() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 0).await;
    seed_user(&h.db, "user-2", 0).await;

    let status = h.engine.protection_status("user-1").await.unwrap();
    assert!(!status.is_active);
    assert!(!status.bracelet_connected);

    h.engine.toggle_protection("user-1", true);
    h.engine
        .register_device("user-1", "Band", "AA:AA:AA:AA:AA:01", None)
        .await
        .unwrap();
    let status = h.engine.protection_status("user-1").await.unwrap();
    assert!(status.is_active);
    assert!(status.bracelet_connected);

    // Re-registering moves the device to the other user
    h.engine
        .register_device("user-2", "Band", "aa:aa:aa:aa:aa:01", None)
        .await
        .unwrap();
    assert!(!h.engine.protection_status("user-1").await.unwrap().bracelet_connected);
    let moved = device::find_by_mac(h.db.pool(), "AA:AA:AA:AA:AA:01")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(moved.user_id, "user-2");

    assert!(matches!(
        h.engine.register_device("ghost", "Band", "AA:AA:AA:AA:AA:02", None).await,
        Err(EngineError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_disconnected_bracelet_is_reported() {
    let h = harness().await;
    seed_user(&h.db, "user-1", 0).await;
    seed_user(&h.db, "user-2", 0).await;

    assert!(matches!(
        h.engine.device_status("user-1").await,
        Err(EngineError::NotFound { entity: "Device", .. })
    ));

    let paired = h
        .engine
        .register_device("user-1", "Band", "AA:AA:AA:AA:AA:03", None)
        .await
        .unwrap();
    assert!(h.engine.protection_status("user-1").await.unwrap().bracelet_connected);

    // Another user cannot flip the status
    assert!(matches!(
        h.engine.set_device_connected("user-2", &paired.id, false).await,
        Err(EngineError::NotFound { .. })
    ));

    let offline = h
        .engine
        .set_device_connected("user-1", &paired.id, false)
        .await
        .unwrap();
    assert!(!offline.is_connected);
    assert!(!h.engine.protection_status("user-1").await.unwrap().bracelet_connected);
    assert_eq!(h.engine.device_status("user-1").await.unwrap().id, paired.id);

    h.engine
        .set_device_connected("user-1", &paired.id, true)
        .await
        .unwrap();
    assert!(h.engine.protection_status("user-1").await.unwrap().bracelet_connected);

    h.engine.remove_device("user-1", &paired.id).await.unwrap();
    assert!(!h.engine.protection_status("user-1").await.unwrap().bracelet_connected);
    assert!(matches!(
        h.engine.device_trigger("AA:AA:AA:AA:AA:03").await,
        Err(EngineError::NotFound { entity: "Device", .. })
    ));
}

#[tokio::test]
async fn test_push_token_registration() {
    let config = EngineConfig::default().with_cooldown(Duration::from_millis(50));
    let h = harness_with(DangerClassifier::without_model(), config).await;
    seed_user(&h.db, "user-1", 1).await;

    assert!(matches!(
        h.engine.set_push_token("ghost", Some("token")).await,
        Err(EngineError::NotFound { entity: "User", .. })
    ));

    h.engine
        .set_push_token("user-1", Some("  fcm-new  "))
        .await
        .unwrap();
    let owner = user::get_user(h.db.pool(), "user-1").await.unwrap();
    assert_eq!(owner.fcm_token.as_deref(), Some("fcm-new"));

    let first = h.engine.manual_trigger("user-1", 1.0, 2.0, None).await.unwrap();
    assert!(first.is_new());
    for _ in 0..100 {
        if !h.push.tokens.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(*h.push.tokens.lock().unwrap(), vec!["fcm-new".to_string()]);

    // A blank token clears it, so the next dispatch has no owner push
    h.engine.set_push_token("user-1", Some("")).await.unwrap();
    let owner = user::get_user(h.db.pool(), "user-1").await.unwrap();
    assert!(owner.fcm_token.is_none());

    tokio::time::sleep(Duration::from_millis(80)).await;
    let second = h.engine.manual_trigger("user-1", 1.0, 2.0, None).await.unwrap();
    assert!(second.is_new());
    assert_eq!(second.alert.unwrap().contacted.len(), 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.push.tokens.lock().unwrap().len(), 1);
}
