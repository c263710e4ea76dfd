use std::path::Path;

use flowcraft_sandbox::SandboxLimits;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

const DEFAULT_RECORDER_CAPACITY: usize = 100;
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_SANDBOX_INSTRUCTIONS: u64 = 10_000_000;
const DEFAULT_SANDBOX_MEMORY_BYTES: usize = 16 * 1024 * 1024;

/// Engine-wide configuration knobs, loaded from an optional TOML file next to the data directory
/// or defaulted when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub recorder_capacity: usize,
  pub http_default_timeout_ms: u64,
  pub sandbox_max_instructions: u64,
  pub sandbox_max_memory_bytes: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      recorder_capacity: DEFAULT_RECORDER_CAPACITY,
      http_default_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
      sandbox_max_instructions: DEFAULT_SANDBOX_INSTRUCTIONS,
      sandbox_max_memory_bytes: DEFAULT_SANDBOX_MEMORY_BYTES,
    }
  }
}

impl EngineConfig {
  pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
    toml::from_str(contents).map_err(EngineError::Config)
  }

  pub async fn load_or_default(path: &Path) -> Result<Self, EngineError> {
    match tokio::fs::read_to_string(path).await {
      Ok(contents) => Self::from_toml_str(&contents),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
      Err(e) => Err(EngineError::ConfigIo(e)),
    }
  }

  pub fn sandbox_limits(&self) -> SandboxLimits {
    SandboxLimits {
      max_instructions: self.sandbox_max_instructions,
      max_memory_bytes: self.sandbox_max_memory_bytes,
    }
  }
}
