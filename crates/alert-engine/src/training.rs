//! Training-sample writes for offline retraining.

use database::{training, Database, TrainingSample};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Result;
use crate::model::{SensorReading, SensorType};

/// Appends labelled reading windows to the training table.
#[derive(Debug, Clone)]
pub struct TrainingRecorder {
    db: Database,
}

impl TrainingRecorder {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Write one sample per reading and wait for the insert.
    pub async fn store(
        &self,
        user_id: &str,
        sensor: SensorType,
        readings: &[SensorReading],
        danger: bool,
        verified: bool,
    ) -> Result<u64> {
        let samples = samples(user_id, sensor, readings, danger, verified);
        Ok(training::insert_samples(self.db.pool(), &samples).await?)
    }

    /// Write samples in the background.
    ///
    /// Failures are logged and never reach the caller. The handle is only
    /// useful to tests that need to observe the write.
    pub fn record(
        &self,
        user_id: &str,
        sensor: SensorType,
        readings: &[SensorReading],
        danger: bool,
    ) -> JoinHandle<()> {
        let samples = samples(user_id, sensor, readings, danger, false);
        let db = self.db.clone();
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            match training::insert_samples(db.pool(), &samples).await {
                Ok(written) => debug!(user_id = %user_id, written, "Stored auto-labelled samples"),
                Err(e) => warn!(user_id = %user_id, error = %e, "Failed to store auto-labelled samples"),
            }
        })
    }
}

fn samples(
    user_id: &str,
    sensor: SensorType,
    readings: &[SensorReading],
    danger: bool,
    verified: bool,
) -> Vec<TrainingSample> {
    readings
        .iter()
        .map(|r| TrainingSample {
            user_id: user_id.to_string(),
            sensor_type: sensor.as_str().to_string(),
            x: r.x,
            y: r.y,
            z: r.z,
            timestamp: r.timestamp,
            label: i64::from(danger),
            is_verified: verified,
        })
        .collect()
}
