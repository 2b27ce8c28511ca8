use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared::RepairCostRange;
use thiserror::Error;

use crate::detection::{DetectionParams, Shape};
use crate::inspection::cost::CostTable;

/// Class labels in model output order.
pub const DAMAGE_CLASSES: [&str; 8] = [
    "damaged door",
    "damaged window",
    "damaged headlight",
    "damaged mirror",
    "dent",
    "damaged hood",
    "damaged bumper",
    "damaged wind shield",
];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Model and pricing settings that may be overridden from a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub input_width: u32,
    pub input_height: u32,
    pub class_labels: Vec<String>,
    pub detection: DetectionParams,
    pub repair_costs: Option<HashMap<String, RepairCostRange>>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            input_width: 640,
            input_height: 640,
            class_labels: DAMAGE_CLASSES.iter().map(|s| s.to_string()).collect(),
            detection: DetectionParams::default(),
            repair_costs: None,
        }
    }
}

impl DetectionConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: DetectionConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn input_shape(&self) -> Shape {
        Shape::new(self.input_height, self.input_width)
    }

    pub fn cost_table(&self) -> CostTable {
        match &self.repair_costs {
            Some(entries) => CostTable::from_map(entries.clone()),
            None => CostTable::default(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.input_width == 0 || self.input_height == 0 {
            return Err(ConfigError::Invalid(
                "model input size must be non-zero".to_string(),
            ));
        }
        if self.class_labels.is_empty() {
            return Err(ConfigError::Invalid("class_labels is empty".to_string()));
        }
        if let Some(entries) = &self.repair_costs {
            if let Some((label, _)) = entries.iter().find(|(_, r)| r.min > r.max) {
                return Err(ConfigError::Invalid(format!(
                    "repair cost for '{}' has min above max",
                    label
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub detection: DetectionConfig,
    /// Sessions idle longer than this are dropped; `None` keeps them
    /// until completed.
    pub session_idle_timeout: Option<Duration>,
    pub session_sweep_interval: Duration,
    pub inference_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let detection = match lookup("DETECTION_CONFIG") {
            Some(path) => DetectionConfig::load(Path::new(&path))?,
            None => DetectionConfig::default(),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_var(&lookup, "PORT")?.unwrap_or(8000),
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("best.onnx")),
            detection,
            session_idle_timeout: parse_var(&lookup, "SESSION_IDLE_TIMEOUT_SECS")?
                .map(Duration::from_secs),
            session_sweep_interval: parse_secs(&lookup, "SESSION_SWEEP_INTERVAL_SECS", 60)?,
            inference_timeout: parse_secs(&lookup, "INFERENCE_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(format!("{} has invalid value '{}'", key, raw))),
        None => Ok(None),
    }
}

/// Non-zero duration in whole seconds.
fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match parse_var(lookup, key)?.unwrap_or(default) {
        0 => Err(ConfigError::Invalid(format!("{} must be greater than zero", key))),
        secs => Ok(Duration::from_secs(secs)),
    }
}
