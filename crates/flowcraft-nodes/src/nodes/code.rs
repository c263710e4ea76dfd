use async_trait::async_trait;
use flowcraft_model::{Node, NodeContext, NodeData, NodeError, NodeOutputs, Payload, DEFAULT_INPUT};
use flowcraft_sandbox::{CodeSandbox, SandboxError, SandboxLimits};
use serde_json::Value;

/// Runs a user-supplied Lua script against the input items ("Code"), inside
/// [`flowcraft_sandbox::CodeSandbox`]'s restricted Lua environment. The script sees only `items`
/// — no process environment, no filesystem, no network ("Code" node's isolation contract). The
/// blocking Lua call runs on a `spawn_blocking` thread so it never stalls the scheduler's async
/// executor.
pub struct CodeNode {
  limits: SandboxLimits,
}

impl CodeNode {
  pub fn new(limits: SandboxLimits) -> Self {
    Self { limits }
  }
}

impl Default for CodeNode {
  fn default() -> Self {
    Self::new(SandboxLimits::default())
  }
}

#[async_trait]
impl Node for CodeNode {
  async fn execute(
    &self,
    _ctx: &mut NodeContext<'_>,
    params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    let script = params
      .get("code")
      .and_then(Value::as_str)
      .ok_or_else(|| NodeError::InvalidInput("Code requires a 'code' parameter".to_string()))?
      .to_string();
    let items = input.to_vec();

    let sandbox = CodeSandbox::new(self.limits);
    let result = tokio::task::spawn_blocking(move || sandbox.run(&script, &items))
      .await
      .map_err(|e| NodeError::Execution(format!("sandbox task panicked: {e}")))?;

    let out_items = result.map_err(|e| match e {
      SandboxError::Timeout(n) => NodeError::Timeout(n),
      other => NodeError::Execution(other.to_string()),
    })?;

    let mut out = NodeOutputs::new();
    out.insert(DEFAULT_INPUT.to_string(), Payload::Items(out_items));
    Ok(out)
  }
}
