use std::time::Duration;

use async_trait::async_trait;
use flowcraft_model::{Node, NodeContext, NodeData, NodeError, NodeOutputs, Payload, DEFAULT_INPUT};
use serde_json::Value;

/// Suspends the node-run for a fixed duration, or until an external resume ("Wait"). `durationMs`
/// sleeps for that long; a `resumeHandle` string instead registers a resumption hook via
/// [`NodeContext::register_wait`] and blocks until some external caller resolves it (e.g. a webhook
/// callback resuming a paused execution), or the run is cancelled — whichever comes first. Forwards
/// its input unchanged once resumed (Wait `main -> main`).
pub struct WaitNode;

#[async_trait]
impl Node for WaitNode {
  async fn execute(
    &self,
    ctx: &mut NodeContext<'_>,
    params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    if let Some(handle_id) = params.get("resumeHandle").and_then(Value::as_str) {
      let rx = ctx.register_wait(handle_id.to_string());
      tokio::select! {
        _ = ctx.cancel.cancelled() => {
          return Err(NodeError::Execution("cancelled while waiting for resume".to_string()));
        }
        result = rx => {
          result.map_err(|_| NodeError::Execution("wait resume channel closed before firing".to_string()))?;
        }
      }
    } else {
      let duration_ms = params.get("durationMs").and_then(Value::as_u64).unwrap_or(0);
      tokio::select! {
        _ = ctx.cancel.cancelled() => {
          return Err(NodeError::Execution("cancelled while waiting".to_string()));
        }
        _ = tokio::time::sleep(Duration::from_millis(duration_ms)) => {}
      }
    }

    let mut out = NodeOutputs::new();
    out.insert(DEFAULT_INPUT.to_string(), Payload::Items(input.to_vec()));
    Ok(out)
  }
}
