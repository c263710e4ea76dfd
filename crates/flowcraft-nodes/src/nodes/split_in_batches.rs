use async_trait::async_trait;
use flowcraft_model::{Node, NodeContext, NodeData, NodeError, NodeOutputs, Payload};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize, Deserialize)]
struct State {
  items: Vec<NodeData>,
  cursor: usize,
}

/// Batches the input collection and drives a loop back-edge ("SplitInBatches";, "Loops").
///
/// On its first invocation (no internal state yet) it captures `input` as the full collection.
/// Every invocation after that arrives via the `"loop"`-typed back-edge from the loop body —
/// `input` at that point is whatever the loop body forwards, not the original collection, so the
/// cursor and the original items are kept in `context.nodeInternalState[self.name]` instead. Emits
/// exactly one of `"loop"` (next batch, more remain) or `"done"` (the full original collection,
/// cursor exhausted) per call — never both.
pub struct SplitInBatchesNode;

#[async_trait]
impl Node for SplitInBatchesNode {
  async fn execute(
    &self,
    ctx: &mut NodeContext<'_>,
    params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    let batch_size = params
      .get("batchSize")
      .and_then(Value::as_u64)
      .unwrap_or(1)
      .max(1) as usize;

    let mut state: State = match ctx.internal_state() {
      Some(v) => serde_json::from_value(v.clone())
        .map_err(|e| NodeError::Execution(format!("corrupt SplitInBatches state: {e}")))?,
      None => State {
        items: input.to_vec(),
        cursor: 0,
      },
    };

    let mut out = NodeOutputs::new();
    if state.cursor < state.items.len() {
      let end = (state.cursor + batch_size).min(state.items.len());
      let batch = state.items[state.cursor..end].to_vec();
      state.cursor = end;
      ctx.set_internal_state(
        serde_json::to_value(&state).map_err(|e| NodeError::Execution(e.to_string()))?,
      );
      out.insert("loop".to_string(), Payload::Items(batch));
      out.insert("done".to_string(), Payload::DeadBranch);
    } else {
      out.insert("loop".to_string(), Payload::DeadBranch);
      out.insert("done".to_string(), Payload::Items(state.items.clone()));
    }
    Ok(out)
  }
}
