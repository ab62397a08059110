use anyhow::Result;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::inference::pipeline::InferenceResult;

/// Append-only CSV record of served predictions.
pub struct CsvLogger {
    log_path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvLogger {
    pub fn new(log_path: impl Into<PathBuf>) -> Result<Self> {
        let log_path = log_path.into();
        // Create CSV file with headers if it doesn't exist
        if !log_path.exists() {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .open(&log_path)?;

            writeln!(
                file,
                "timestamp,coin,prediction,confidence,predicted_price,last_price"
            )?;
        }

        Ok(Self {
            log_path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Log a served prediction
    pub fn log_prediction(&self, coin: &str, result: &InferenceResult) -> Result<()> {
        let line = format!(
            "{},{},{},{:.4},{:.2},{:.2}\n",
            Utc::now().to_rfc3339(),
            coin,
            result.direction,
            result.confidence,
            result.predicted_price,
            result.last_price
        );

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("prediction log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;
        file.write_all(line.as_bytes())?;

        Ok(())
    }
}
