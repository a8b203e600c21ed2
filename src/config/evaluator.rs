use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_CORRECTION_BATCH_SIZE};
use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning of the batched model evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Cells per batch for the reference model
    pub batch_size: usize,
    /// Cells per batch for the correction model, which is more expensive per call
    pub correction_batch_size: usize,
    /// Time allowed to a single batch before it is resubmitted
    pub batch_timeout: Duration,
    /// Resubmissions allowed per batch after the first attempt
    pub max_retries: u32,
    /// Log per-batch progress
    pub progress: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            correction_batch_size: DEFAULT_CORRECTION_BATCH_SIZE,
            batch_timeout: Duration::from_secs(300),
            max_retries: 2,
            progress: true,
        }
    }
}

impl EvaluatorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.correction_batch_size == 0 {
            return Err(Error::Configuration(
                "batch sizes must be positive".to_string(),
            ));
        }
        if self.batch_timeout.is_zero() {
            return Err(Error::Configuration(
                "batch timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_uses_defaults() {
        let config: EvaluatorConfig =
            serde_json::from_str(r#"{"batch_size": 50, "progress": false}"#).unwrap();
        assert_eq!(config.batch_size, 50);
        assert!(!config.progress);
        assert_eq!(config.correction_batch_size, 100);
        assert_eq!(config.max_retries, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = EvaluatorConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }
}
