use thiserror::Error;

/// Failures from running a Code node's script body ("Code").
#[derive(Debug, Error)]
pub enum SandboxError {
  #[error("script compilation failed: {0}")]
  Compile(String),

  #[error("script raised an error: {0}")]
  Runtime(String),

  #[error("script exceeded its instruction budget ({0} instructions)")]
  Timeout(u64),

  #[error("script output could not be converted to node items: {0}")]
  InvalidOutput(String),
}

impl From<mlua::Error> for SandboxError {
  fn from(err: mlua::Error) -> Self {
    SandboxError::Runtime(err.to_string())
  }
}
