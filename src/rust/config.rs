use crate::errors::{TransferError, TransferResult, TransferResultExt};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.8;
pub const DEFAULT_TARGET_MARKER: &str = "target/";

/// Annotation kinds whose `paired_position` names a partner residue
pub const DEFAULT_PAIRED_KINDS: [&str; 4] = ["DISULFID", "CROSSLNK", "SITE", "BINDING"];

/// Experimental, author-traceable and curator-inferred evidence. Opt in with
/// `EngineConfigBuilder::curated_evidence_only`.
pub const CURATED_ECO_CODES: [&str; 5] =
    ["ECO:0000269", "ECO:0000303", "ECO:0000305", "ECO:0000312", "ECO:0007744"];

/// Configuration for the TransferEngine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Conservation at or above this value marks a transfer as high confidence
    pub confidence_threshold: f64,
    /// ECO codes kept when filtering evidence; empty accepts everything
    pub accepted_eco_codes: Vec<String>,
    /// Exclude annotations left without evidence after filtering
    pub require_evidence: bool,
    /// Kinds whose paired positions are resolved through the column map
    pub paired_kinds: Vec<String>,
    /// Row-name marker that identifies novel hits in an alignment
    pub target_marker: String,
    /// Number of worker threads
    pub num_threads: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            accepted_eco_codes: Vec::new(),
            require_evidence: false,
            paired_kinds: DEFAULT_PAIRED_KINDS.iter().map(|k| k.to_string()).collect(),
            target_marker: DEFAULT_TARGET_MARKER.to_string(),
            num_threads: None, // Use system default
        }
    }
}

impl EngineConfig {
    /// Load and validate a configuration from a JSON file.
    /// Missing fields take their defaults.
    pub fn from_json_path<P: AsRef<Path>>(path: P) -> TransferResult<Self> {
        let path = path.as_ref();
        let reader = crate::io::open_maybe_compressed(path)
            .with_field_context("config", &format!("cannot open {}", path.display()))?;
        let config: EngineConfig = serde_json::from_reader(reader)
            .with_field_context("config", &format!("cannot parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> TransferResult<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(TransferError::ConfigurationError {
                field: "confidence_threshold".to_string(),
                message: format!(
                    "Threshold must lie in [0, 1], got {}",
                    self.confidence_threshold
                ),
            });
        }

        if self.target_marker.is_empty() {
            return Err(TransferError::ConfigurationError {
                field: "target_marker".to_string(),
                message: "Target marker must not be empty".to_string(),
            });
        }

        if let Some(0) = self.num_threads {
            return Err(TransferError::ConfigurationError {
                field: "num_threads".to_string(),
                message: "Number of threads must be greater than 0".to_string(),
            });
        }

        if let Some(code) = self.accepted_eco_codes.iter().find(|c| !c.starts_with("ECO:")) {
            return Err(TransferError::ConfigurationError {
                field: "accepted_eco_codes".to_string(),
                message: format!("Not an ECO code: {}", code),
            });
        }

        Ok(())
    }

    /// Get the number of threads to use
    pub fn effective_thread_count(&self) -> usize {
        self.num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    pub fn is_paired_kind(&self, kind: &str) -> bool {
        self.paired_kinds.iter().any(|k| k == kind)
    }

    pub fn accepts_eco_code(&self, code: &str) -> bool {
        self.accepted_eco_codes.is_empty() || self.accepted_eco_codes.iter().any(|c| c == code)
    }
}

/// Configuration builder for more complex setups
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self { config: EngineConfig::default() }
    }

    /// Set the confidence threshold
    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    /// Set the accepted ECO codes
    pub fn accepted_eco_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.accepted_eco_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Accept only `CURATED_ECO_CODES` and drop annotations left without evidence
    pub fn curated_evidence_only(self) -> Self {
        self.accepted_eco_codes(CURATED_ECO_CODES).require_evidence(true)
    }

    pub fn require_evidence(mut self, require: bool) -> Self {
        self.config.require_evidence = require;
        self
    }

    pub fn paired_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.paired_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn target_marker(mut self, marker: &str) -> Self {
        self.config.target_marker = marker.to_string();
        self
    }

    /// Set the number of threads
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = Some(threads);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> TransferResult<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
