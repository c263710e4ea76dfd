/// Resource bounds enforced on one Code node script run.
///
/// An instruction-count hook plus a memory cap enforced through mlua, the same shape of guard a
/// wasm host gets from an epoch deadline and a linear memory limit.
#[derive(Debug, Clone, Copy)]
pub struct SandboxLimits {
  pub max_instructions: u64,
  pub max_memory_bytes: usize,
}

impl Default for SandboxLimits {
  fn default() -> Self {
    Self {
      max_instructions: 10_000_000,
      max_memory_bytes: 16 * 1024 * 1024,
    }
  }
}
