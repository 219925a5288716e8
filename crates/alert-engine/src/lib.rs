//! Emergency alert engine for Asfalis.
//!
//! Decides when an emergency alert fires, keeps it to one per cooldown
//! window, drives it through its lifecycle and fans it out to the user's
//! trusted contacts.
//!
//! # Architecture
//!
//! ```text
//! manual ─┐
//! sensor ─┼─▶ AlertManager::trigger ──(user gate)──▶ sos_alerts
//! device ─┘            │
//!                      ▼
//!                 Dispatcher ──▶ JoinSet: contact x channel (timeout each)
//!                      │
//!                      └──▶ push to the owner's device
//! ```
//!
//! Cooldown and protection state are per-process stores handed to the
//! engine at construction.
//!
//! # Example
//!
//! ```no_run
//! use alert_engine::{AlertEngine, DangerClassifier, EngineConfig};
//! use database::Database;
//! use notifier::{Notifier, NotifierConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::connect("sqlite:asfalis.db?mode=rwc").await?;
//! db.migrate().await?;
//!
//! let engine = AlertEngine::new(
//!     db,
//!     Notifier::from_config(NotifierConfig::from_env()),
//!     DangerClassifier::without_model(),
//!     EngineConfig::default(),
//! );
//!
//! let outcome = engine.manual_trigger("user-1", 10.0, 20.0, None).await?;
//! println!("{:?}", outcome.reason);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod config;
pub mod cooldown;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod protection;
pub mod training;
pub mod triggers;

pub use classifier::{DangerClassifier, DangerModel, FeatureVector, LogisticModel};
pub use config::EngineConfig;
pub use cooldown::{CooldownGuard, UserGate};
pub use dispatch::{compose_message, Dispatcher};
pub use error::{EngineError, ModelLoadError, Result};
pub use lifecycle::AlertManager;
pub use model::{
    DispatchReport, ProtectionStatus, SensorAnalysis, SensorReading, SensorType, Sensitivity,
    TriggerOutcome, TriggerReason, TriggerSource,
};
pub use protection::ProtectionRegistry;
pub use training::TrainingRecorder;
pub use triggers::AlertEngine;
