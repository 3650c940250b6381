use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime parameters of the region-of-interest pipeline. Replaces hard-coded topic names and tuning
/// constants; every field has a default so a config file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoiConfig {
    pub node_name: String,
    /// Defaults to `<node_name>/get_state`
    pub get_state_topic: Option<String>,
    /// Defaults to `<node_name>/change_state`
    pub change_state_topic: Option<String>,
    /// Frame the extracted points are transformed into, if any
    pub target_frame: Option<String>,
    pub padding_adjustment: u32,
    pub remove_outliers: bool,
    pub outlier_mean_k: usize,
    pub outlier_std_dev_mul: f64,
    pub transform_timeout_secs: f64,
    pub transform_poll_interval_ms: u64,
    pub error_throttle_secs: f64,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            node_name: "multimodal_object_recognition".into(),
            get_state_topic: None,
            change_state_topic: None,
            target_frame: None,
            padding_adjustment: 0,
            remove_outliers: false,
            outlier_mean_k: 50,
            outlier_std_dev_mul: 3.0,
            transform_timeout_secs: 1.0,
            transform_poll_interval_ms: 10,
            error_throttle_secs: 2.0,
        }
    }
}

impl RoiConfig {
    /// Reads a JSON config file. Missing fields take their default value
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Could not open config file {}", path.display()))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Could not parse config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn get_state_topic(&self) -> String {
        self.get_state_topic
            .clone()
            .unwrap_or_else(|| format!("{}/get_state", self.node_name))
    }

    pub fn change_state_topic(&self) -> String {
        self.change_state_topic
            .clone()
            .unwrap_or_else(|| format!("{}/change_state", self.node_name))
    }

    /// Negative or non-finite values fall back to zero
    pub fn transform_timeout(&self) -> Duration {
        secs_to_duration(self.transform_timeout_secs)
    }

    pub fn transform_poll_interval(&self) -> Duration {
        Duration::from_millis(self.transform_poll_interval_ms)
    }

    pub fn error_throttle_period(&self) -> Duration {
        secs_to_duration(self.error_throttle_secs)
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
