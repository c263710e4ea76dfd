use std::sync::Arc;

use flowcraft_expression::{resolve_parameters, EvalContext, ResolutionMode, TemplateCache};
use flowcraft_model::{
  ExecutionContext, ExecutionError, Node, NodeContext, NodeData, NodeDefinition, NodeError,
  NodeOutputs, ParamResolver, Payload,
};
use flowcraft_registry::NodeRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::error::KernelError;
use crate::outcome::NodeRunOutcome;

/// Adapts the kernel's [`TemplateCache`] to the [`ParamResolver`] trait a node body uses to
/// re-resolve its raw parameters against a specific item (— expressions like `$json` are per-item,
/// not fixed once for the whole node-run).
struct ResolverAdapter<'t> {
  templates: &'t TemplateCache,
}

impl ParamResolver for ResolverAdapter<'_> {
  fn resolve(
    &self,
    template: &serde_json::Value,
    input_items: &[NodeData],
    item_index: usize,
    ctx: &NodeContext<'_>,
  ) -> (serde_json::Value, Vec<String>) {
    let env = ctx.env();
    let eval_ctx = EvalContext {
      input_items,
      item_index,
      node_states: ctx.all_node_outputs(),
      env: &env,
      execution_id: ctx.execution_id(),
      mode: ctx.mode(),
      start_time: ctx.start_time(),
      run_index: ctx.run_index,
    };
    match resolve_parameters(template, &eval_ctx, self.templates, ResolutionMode::Lenient) {
      Ok((resolved, warnings)) => (resolved, warnings),
      Err(e) => (serde_json::Value::String(String::new()), vec![e.to_string()]),
    }
  }
}

/// Runs the per-node execution lifecycle : disabled/pinned-data short-circuits, parameter
/// resolution, the node body with retries, and the state writes on success or failure.
pub struct NodeKernel {
  registry: Arc<NodeRegistry>,
  templates: TemplateCache,
}

impl NodeKernel {
  pub fn new(registry: Arc<NodeRegistry>) -> Self {
    Self {
      registry,
      templates: TemplateCache::default(),
    }
  }

  #[instrument(
    name = "kernel_run_node",
    skip(self, ctx, input_items, cancel),
    fields(node = %node_def.name, node_type = %node_def.node_type)
  )]
  pub async fn run_node(
    &self,
    ctx: &mut ExecutionContext,
    node_def: &NodeDefinition,
    input_items: &[NodeData],
    cancel: CancellationToken,
  ) -> Result<NodeRunOutcome, KernelError> {
    // Step 1: disabled short-circuit — forward input unchanged on `main`.
    if node_def.disabled {
      let mut outputs = NodeOutputs::new();
      outputs.insert(
        flowcraft_model::DEFAULT_INPUT.to_string(),
        Payload::Items(input_items.to_vec()),
      );
      self.record_success(ctx, node_def, &outputs);
      return Ok(NodeRunOutcome::Completed(outputs));
    }

    // Step 2: pinned-data short-circuit — test override, skip the body.
    if let Some(pinned) = &node_def.pinned_data {
      let mut outputs = NodeOutputs::new();
      outputs.insert(
        flowcraft_model::DEFAULT_INPUT.to_string(),
        Payload::Items(pinned.clone()),
      );
      self.record_success(ctx, node_def, &outputs);
      return Ok(NodeRunOutcome::Completed(outputs));
    }

    let node = self
      .registry
      .get(&node_def.node_type)
      .map_err(|_| KernelError::UnknownType(node_def.node_type.clone()))?;
    let descriptor = self
      .registry
      .describe(&node_def.node_type)
      .map_err(|_| KernelError::UnknownType(node_def.node_type.clone()))?;

    // Step 3: parameter resolution, evaluated against the first input item's context. Nodes that
    // need true per-item expression evaluation (Set, If, Switch) resolve their field templates
    // themselves with a fresh `EvalContext` per item instead of relying on this single pass (see
    // DESIGN.md, "Kernel: parameter resolution granularity").
    let env = std::env::vars().collect::<std::collections::HashMap<_, _>>();
    let run_index = ctx.run_index(&node_def.name);
    let eval_ctx = EvalContext {
      input_items,
      item_index: 0,
      node_states: &ctx.node_states,
      env: &env,
      execution_id: &ctx.execution_id,
      mode: ctx.mode,
      start_time: ctx.start_time,
      run_index,
    };
    let raw_params = serde_json::Value::Object(node_def.parameters.clone());
    let (resolved_params, warnings) = resolve_parameters(
      &raw_params,
      &eval_ctx,
      &self.templates,
      ResolutionMode::Lenient,
    )?;
    for w in warnings {
      ctx.warnings.push(ExecutionError {
        node_name: node_def.name.clone(),
        message: w,
        timestamp: chrono::Utc::now(),
      });
    }
    let resolver = ResolverAdapter {
      templates: &self.templates,
    };

    // Step 4: invoke the node body, retrying per its error policy.
    let max_attempts = node_def.error_policy.max_attempts();
    let mut last_error: Option<NodeError> = None;
    for attempt in 0..max_attempts {
      if cancel.is_cancelled() {
        return Ok(NodeRunOutcome::Failed(
          dead_outputs(descriptor, &resolved_params),
          "execution cancelled".to_string(),
        ));
      }
      let mut node_ctx = NodeContext::new(
        ctx,
        &node_def.name,
        run_index,
        cancel.clone(),
        &raw_params,
        &resolver,
      );
      match node.execute(&mut node_ctx, &resolved_params, input_items).await {
        Ok(outputs) => {
          self.record_success(ctx, node_def, &outputs);
          return Ok(NodeRunOutcome::Completed(outputs));
        }
        Err(e) => {
          warn!(attempt, error = %e, "node attempt failed");
          last_error = Some(e);
          if attempt + 1 < max_attempts && node_def.error_policy.retry_delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(
              node_def.error_policy.retry_delay_ms,
            ))
            .await;
          }
        }
      }
    }

    // Step 5/6: every attempt failed. The message names the total attempt count (1 + retryOnFail)
    // so callers can distinguish "failed on the first try" from "exhausted every retry".
    let message = last_error
      .map(|e| format!("{e} (after {max_attempts} attempts)"))
      .unwrap_or_default();
    if node_def.error_policy.continue_on_fail {
      let error_item = NodeData::from_json(serde_json::json!({ "error": message }));
      let mut outputs = NodeOutputs::new();
      outputs.insert(
        flowcraft_model::DEFAULT_INPUT.to_string(),
        Payload::Items(vec![error_item]),
      );
      // Recorded into `errors`, not `warnings`: §4.4 point 6 and invariant 5 both treat a
      // continue-on-fail exhaustion as a real error that marks the execution `failed`, even though
      // the node itself proceeds to DONE with a synthetic output item (scenario 6).
      ctx.errors.push(ExecutionError {
        node_name: node_def.name.clone(),
        message: message.clone(),
        timestamp: chrono::Utc::now(),
      });
      self.record_success(ctx, node_def, &outputs);
      Ok(NodeRunOutcome::ContinuedWithError(outputs, message))
    } else {
      ctx.errors.push(ExecutionError {
        node_name: node_def.name.clone(),
        message: message.clone(),
        timestamp: chrono::Utc::now(),
      });
      *ctx.node_run_counts.entry(node_def.name.clone()).or_insert(0) += 1;
      Ok(NodeRunOutcome::Failed(
        dead_outputs(descriptor, &resolved_params),
        message,
      ))
    }
  }

  fn record_success(
    &self,
    ctx: &mut ExecutionContext,
    node_def: &NodeDefinition,
    outputs: &NodeOutputs,
  ) {
    // node_states holds one representative item list per node (invariant
    // 2): the concatenation of every live output, in declaration order.
    let mut flattened = Vec::new();
    let mut names: Vec<&String> = outputs.keys().collect();
    names.sort();
    for name in names {
      if let Some(items) = outputs[name].items() {
        flattened.extend_from_slice(items);
      }
    }
    ctx.node_states.insert(node_def.name.clone(), flattened);
    *ctx.node_run_counts.entry(node_def.name.clone()).or_insert(0) += 1;
  }
}

fn dead_outputs(
  descriptor: &flowcraft_registry::NodeDescriptor,
  resolved_params: &serde_json::Value,
) -> NodeOutputs {
  let params_map = resolved_params
    .as_object()
    .cloned()
    .unwrap_or_default();
  let mut outputs = NodeOutputs::new();
  for name in descriptor.resolve_outputs(&params_map) {
    outputs.insert(name, Payload::DeadBranch);
  }
  outputs
}
