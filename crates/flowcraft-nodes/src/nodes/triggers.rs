use async_trait::async_trait;
use flowcraft_model::{Node, NodeContext, NodeData, NodeError, NodeOutputs, Payload, DEFAULT_INPUT};
use serde_json::Value;

/// Manual run entry point. Emits whatever items the engine was invoked with, unchanged — the
/// scheduler seeds its input buffer directly with the run's initial items (`Engine::run`). Fails on
/// an empty initial item list (boundary behaviours).
pub struct StartNode;

#[async_trait]
impl Node for StartNode {
  async fn execute(
    &self,
    _ctx: &mut NodeContext<'_>,
    _params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    if input.is_empty() {
      return Err(NodeError::InvalidInput(
        "Start requires at least one initial item".to_string(),
      ));
    }
    let mut out = NodeOutputs::new();
    out.insert(DEFAULT_INPUT.to_string(), Payload::Items(input.to_vec()));
    Ok(out)
  }
}

/// HTTP-webhook entry point. Like `Start`, it simply re-emits the run's initial items — this crate
/// has no network listener of its own; an external HTTP front end is expected to call `Engine::run`
/// with `ExecutionMode::Webhook` and the parsed request body as the initial items ("External
/// interfaces").
pub struct WebhookNode;

#[async_trait]
impl Node for WebhookNode {
  async fn execute(
    &self,
    _ctx: &mut NodeContext<'_>,
    _params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    let mut out = NodeOutputs::new();
    out.insert(DEFAULT_INPUT.to_string(), Payload::Items(input.to_vec()));
    Ok(out)
  }
}

/// Schedule entry point ("Cron"). An external scheduler is expected to invoke `Engine::run` with
/// `ExecutionMode::Cron` on the configured cadence; this crate does not own a clock loop. Always
/// emits one `{triggeredAt, mode: "cron"}` item regardless of what initial items the caller
/// supplied.
pub struct CronNode;

#[async_trait]
impl Node for CronNode {
  async fn execute(
    &self,
    ctx: &mut NodeContext<'_>,
    _params: &Value,
    _input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    let item = NodeData::from_json(serde_json::json!({
      "triggeredAt": ctx.start_time().to_rfc3339(),
      "mode": "cron",
    }));
    let mut out = NodeOutputs::new();
    out.insert(DEFAULT_INPUT.to_string(), Payload::Items(vec![item]));
    Ok(out)
  }
}

/// Error-workflow entry point. Invoked by the engine (not the scheduler's normal BFS) when a
/// separate execution fails and this workflow is configured as its error handler; the failing
/// execution's id/node/message arrive as the initial items, re-emitted unchanged.
pub struct ErrorTriggerNode;

#[async_trait]
impl Node for ErrorTriggerNode {
  async fn execute(
    &self,
    _ctx: &mut NodeContext<'_>,
    _params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    let mut out = NodeOutputs::new();
    out.insert(DEFAULT_INPUT.to_string(), Payload::Items(input.to_vec()));
    Ok(out)
  }
}
