use async_trait::async_trait;
use flowcraft_model::{Node, NodeContext, NodeData, NodeError, NodeOutputs, Payload, DEFAULT_INPUT};
use serde_json::Value;

/// Joins items from every connected input into one stream ("Merge"). By the time the scheduler
/// invokes this node, dead branches on individual inputs have already been dropped from `input` —
/// if every input into this node was dead, the scheduler never runs the node at all and instead
/// marks its own outputs dead (the scheduler's join logic owns dead-branch propagation, not the
/// node body).
pub struct MergeNode;

#[async_trait]
impl Node for MergeNode {
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
