//! Engine configuration with TOML file support.

use serde::{Deserialize, Serialize};
use tribunal_types::CaseParams;
use tribunal_utils::{LogFormat, LoggingError};

use crate::CaseError;

/// Configuration for a case engine.
///
/// Can be loaded from a TOML file via [`EngineConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every key is optional.
///
/// ```toml
/// log_format = "json"
/// log_level = "info,tribunal_case=debug"
///
/// [params]
/// quorum_bps = 6000
/// tie_break = "uphold"
/// weighting = { kind = "capped", cap = 10000 }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Case resolution parameters.
    #[serde(default)]
    pub params: CaseParams,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> Result<Self, CaseError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CaseError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, CaseError> {
        let config: Self = toml::from_str(s).map_err(|e| CaseError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CaseError> {
        self.params.validate().map_err(CaseError::Config)
    }

    /// Install the global subscriber described by `log_format` and `log_level`.
    pub fn init_logging(&self) -> Result<(), LoggingError> {
        tribunal_utils::init_logging(self.log_format, &self.log_level)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            params: CaseParams::default(),
        }
    }
}
