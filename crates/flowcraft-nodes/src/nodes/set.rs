use async_trait::async_trait;
use flowcraft_model::{Node, NodeContext, NodeData, NodeError, NodeOutputs, Payload, DEFAULT_INPUT};
use serde_json::{Map, Value};

/// Sets or replaces fields on each item ("Set").
///
/// `mode: "manual"` (default) merges `values` (a map of field -> templated value) into each item's
/// json; `mode: "json"` replaces the entire item with the templated `json` parameter. `keepOnlySet:
/// true` drops the item's original fields, keeping only what this node just set.
///
/// Each item gets its own expression context (`$json` is that item, not item 0): this node
/// re-resolves its raw parameters per item through [`NodeContext::resolve_params`] rather than
/// relying on the kernel's single top-level resolution pass, which is bound to item 0.
pub struct SetNode;

#[async_trait]
impl Node for SetNode {
  async fn execute(
    &self,
    ctx: &mut NodeContext<'_>,
    params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    let mode = params.get("mode").and_then(Value::as_str).unwrap_or("manual").to_string();
    let keep_only_set = params
      .get("keepOnlySet")
      .and_then(Value::as_bool)
      .unwrap_or(false);

    let source_items: Vec<NodeData> = if input.is_empty() {
      vec![NodeData::from_json(Value::Object(Map::new()))]
    } else {
      input.to_vec()
    };

    let mut out_items = Vec::with_capacity(source_items.len());
    for (item_index, item) in source_items.iter().enumerate() {
      let (resolved, _) = ctx.resolve_params(&source_items, item_index);

      let new_fields = if mode == "json" {
        resolved.get("json").cloned().unwrap_or(Value::Null)
      } else {
        resolved.get("values").cloned().unwrap_or(Value::Object(Map::new()))
      };

      let merged = if keep_only_set {
        new_fields
      } else {
        let mut base = item.json.as_object().cloned().unwrap_or_default();
        if let Some(new_map) = new_fields.as_object() {
          for (k, v) in new_map {
            base.insert(k.clone(), v.clone());
          }
        }
        Value::Object(base)
      };

      out_items.push(NodeData {
        json: merged,
        binary: item.binary.clone(),
      });
    }

    let mut out = NodeOutputs::new();
    out.insert(DEFAULT_INPUT.to_string(), Payload::Items(out_items));
    Ok(out)
  }
}
