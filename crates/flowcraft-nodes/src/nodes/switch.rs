use async_trait::async_trait;
use flowcraft_model::{Node, NodeContext, NodeData, NodeError, NodeOutputs, Payload};
use serde_json::Value;

use crate::nodes::condition::{evaluate, resolve_field_path};

/// Routes each input item to the first matching rule's numbered output, or to `fallback` if no rule
/// matches and `addFallback` is set ("Switch"; scenario 2). Every output that received no items is
/// [`Payload::DeadBranch`].
pub struct SwitchNode;

#[async_trait]
impl Node for SwitchNode {
  async fn execute(
    &self,
    ctx: &mut NodeContext<'_>,
    params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    let rules = params
      .get("rules")
      .and_then(Value::as_array)
      .cloned()
      .unwrap_or_default();
    let add_fallback = params
      .get("addFallback")
      .and_then(Value::as_bool)
      .unwrap_or(false);

    let mut buckets: Vec<Vec<NodeData>> = vec![Vec::new(); rules.len()];
    let mut fallback_bucket: Vec<NodeData> = Vec::new();

    for (item_index, item) in input.iter().enumerate() {
      let (resolved, _) = ctx.resolve_params(input, item_index);
      let resolved_rules = resolved.get("rules").and_then(Value::as_array).cloned().unwrap_or_default();

      let mut matched: Option<usize> = None;
      for (i, rule) in rules.iter().enumerate() {
        let field_path = rule.get("field").and_then(Value::as_str).unwrap_or("");
        let operation = rule.get("operation").and_then(Value::as_str).unwrap_or("equals");
        let value = resolved_rules
          .get(i)
          .and_then(|r| r.get("value"))
          .cloned()
          .unwrap_or_else(|| rule.get("value").cloned().unwrap_or(Value::Null));
        let field = resolve_field_path(&item.json, field_path);
        if evaluate(&field, operation, &value) {
          matched = Some(i);
          break;
        }
      }

      match matched {
        Some(i) => buckets[i].push(item.clone()),
        None if add_fallback => fallback_bucket.push(item.clone()),
        None => {}
      }
    }

    let mut out = NodeOutputs::new();
    for (i, bucket) in buckets.into_iter().enumerate() {
      out.insert(format!("output{i}"), Payload::from_items(non_empty(bucket)));
    }
    if add_fallback {
      out.insert("fallback".to_string(), Payload::from_items(non_empty(fallback_bucket)));
    }
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
