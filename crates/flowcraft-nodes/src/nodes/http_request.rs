use std::time::Duration;

use async_trait::async_trait;
use flowcraft_model::{Node, NodeContext, NodeData, NodeError, NodeOutputs, Payload, DEFAULT_INPUT};
use serde_json::{json, Value};

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Issues one HTTP request per input item (empty input still issues one request, "HttpRequest"). A
/// non-2xx response is not itself a node error — it becomes a normal output item carrying the
/// status, headers and body, so downstream `If`/`Switch` nodes can branch on it. Only transport
/// failures (DNS, connection refused, timeout) raise [`NodeError::Transport`]. Every templated
/// parameter (`url`, `headers`, `body`) is re-resolved per item, matching `If`/`Switch`/`Set`, since
/// the request for item *i* may depend on `$json`/`$itemIndex` of that item.
pub struct HttpRequestNode {
  client: reqwest::Client,
}

impl Default for HttpRequestNode {
  fn default() -> Self {
    Self {
      client: reqwest::Client::new(),
    }
  }
}

#[async_trait]
impl Node for HttpRequestNode {
  async fn execute(
    &self,
    ctx: &mut NodeContext<'_>,
    params: &Value,
    input: &[NodeData],
  ) -> Result<NodeOutputs, NodeError> {
    if params.get("url").and_then(Value::as_str).is_none() {
      return Err(NodeError::InvalidInput("HttpRequest requires a 'url' parameter".to_string()));
    }

    let runs = if input.is_empty() { 1 } else { input.len() };
    let mut out_items = Vec::with_capacity(runs);

    for item_index in 0..runs {
      if ctx.cancel.is_cancelled() {
        return Err(NodeError::Execution("cancelled".to_string()));
      }

      let (resolved, _) = ctx.resolve_params(input, item_index);
      let url = resolved
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| NodeError::InvalidInput("HttpRequest requires a 'url' parameter".to_string()))?
        .to_string();
      let method = resolved
        .get("method")
        .and_then(Value::as_str)
        .unwrap_or("GET")
        .to_uppercase();
      let timeout_ms = resolved.get("timeoutMs").and_then(Value::as_u64).unwrap_or(DEFAULT_TIMEOUT_MS);
      let response_type = resolved.get("responseType").and_then(Value::as_str).unwrap_or("json");
      let headers = resolved.get("headers").and_then(Value::as_object).cloned();
      let body = resolved.get("body").cloned();

      let method = reqwest::Method::from_bytes(method.as_bytes())
        .map_err(|e| NodeError::InvalidInput(format!("invalid HTTP method: {e}")))?;
      let mut req = self
        .client
        .request(method, &url)
        .timeout(Duration::from_millis(timeout_ms));
      if let Some(headers) = &headers {
        for (k, v) in headers {
          if let Some(v) = v.as_str() {
            req = req.header(k, v);
          }
        }
      }
      if let Some(body) = &body {
        req = req.json(body);
      }

      let response = req
        .send()
        .await
        .map_err(|e| NodeError::Transport(e.to_string()))?;
      let status = response.status().as_u16();
      let response_headers: serde_json::Map<String, Value> = response
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), Value::String(v.to_string()))))
        .collect();
      let text = response
        .text()
        .await
        .map_err(|e| NodeError::Transport(e.to_string()))?;
      let parsed_body: Value = if response_type == "text" {
        Value::String(text)
      } else {
        serde_json::from_str(&text).unwrap_or(Value::String(text))
      };

      out_items.push(NodeData::from_json(json!({
        "statusCode": status,
        "headers": Value::Object(response_headers),
        "body": parsed_body,
      })));
    }

    let mut out = NodeOutputs::new();
    out.insert(DEFAULT_INPUT.to_string(), Payload::Items(out_items));
    Ok(out)
  }
}
