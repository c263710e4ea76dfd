use async_trait::async_trait;
use flowcraft_model::{Node, NodeContext, NodeData, NodeError, NodeOutputs, Payload};
use serde_json::Value;

use crate::nodes::condition::{evaluate, resolve_field_path};

/// Routes each input item to one of two outputs based on one condition `(field, operation, value)`.
/// `field` is a dot-notation path evaluated against the item's own `json`, not a shared
/// expression — this is what lets items with different values end up on different branches in the
/// same run. `value` is re-resolved per item through [`NodeContext::resolve_params`] so it may
/// still reference `$json`/`$itemIndex`.
///
/// A branch that receives no items emits [`Payload::DeadBranch`] instead of an empty list, so a
/// downstream join does not wait forever for a branch that produced nothing.
pub struct IfNode;

#[async_trait]
impl Node for IfNode {
  async fn execute(
    &self,
    ctx: &mut NodeContext<'_>,
    params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    let field_path = params.get("field").and_then(Value::as_str).unwrap_or("");
    let operation = params.get("operation").and_then(Value::as_str).unwrap_or("equals");

    let mut true_items = Vec::new();
    let mut false_items = Vec::new();

    for (item_index, item) in input.iter().enumerate() {
      let (resolved, _) = ctx.resolve_params(input, item_index);
      let value = resolved.get("value").cloned().unwrap_or(Value::Null);
      let field = resolve_field_path(&item.json, field_path);

      if evaluate(&field, operation, &value) {
        true_items.push(item.clone());
      } else {
        false_items.push(item.clone());
      }
    }

    let mut out = NodeOutputs::new();
    out.insert("true".to_string(), Payload::from_items(non_empty(true_items)));
    out.insert("false".to_string(), Payload::from_items(non_empty(false_items)));
    Ok(out)
  }
}

fn non_empty(items: Vec<NodeData>) -> Option<Vec<NodeData>> {
  if items.is_empty() {
    None
  } else {
    Some(items)
  }
}
