//! Per-node execution lifecycle.

mod error;
mod kernel;
mod outcome;

pub use error::KernelError;
pub use kernel::NodeKernel;
pub use outcome::NodeRunOutcome;

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  use async_trait::async_trait;
  use flowcraft_model::{
    ErrorPolicy, ExecutionContext, ExecutionMode, Node, NodeContext, NodeData, NodeDefinition,
    NodeError, NodeOutputs, Payload, Workflow, DEFAULT_INPUT,
  };
  use flowcraft_registry::{InputCardinality, NodeDescriptor, NodeRegistry, OutputSpec};
  use serde_json::{json, Value};
  use tokio_util::sync::CancellationToken;

  use super::*;

  struct EchoNode;

  #[async_trait]
  impl Node for EchoNode {
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

  struct AlwaysFailsNode {
    attempts: Arc<AtomicU32>,
  }

  #[async_trait]
  impl Node for AlwaysFailsNode {
    async fn execute(
      &self,
      _ctx: &mut NodeContext<'_>,
      _params: &Value,
      _input: &[NodeData],
    ) -> Result<NodeOutputs, NodeError> {
      self.attempts.fetch_add(1, Ordering::SeqCst);
      Err(NodeError::Execution("boom".to_string()))
    }
  }

  fn empty_workflow() -> Workflow {
    Workflow {
      id: "wf".to_string(),
      name: "test".to_string(),
      active: true,
      nodes: vec![],
      connections: vec![],
      settings: serde_json::Map::new(),
    }
  }

  fn node_def(name: &str, node_type: &str) -> NodeDefinition {
    NodeDefinition {
      name: name.to_string(),
      node_type: node_type.to_string(),
      parameters: serde_json::Map::new(),
      disabled: false,
      error_policy: ErrorPolicy::default(),
      pinned_data: None,
    }
  }

  #[tokio::test]
  async fn disabled_node_forwards_input_unchanged() {
    let registry = Arc::new(NodeRegistry::new());
    let kernel = NodeKernel::new(registry);
    let mut ctx = ExecutionContext::new(empty_workflow(), "exec-1".to_string(), ExecutionMode::Manual);
    let mut def = node_def("N1", "Echo");
    def.disabled = true;
    let input = vec![NodeData::from_json(json!({"a": 1}))];

    let outcome = kernel
      .run_node(&mut ctx, &def, &input, CancellationToken::new())
      .await
      .unwrap();

    match outcome {
      NodeRunOutcome::Completed(outputs) => {
        assert_eq!(outputs[DEFAULT_INPUT].items().unwrap(), &input[..]);
      }
      other => panic!("expected Completed, got {other:?}"),
    }
    assert_eq!(ctx.node_states["N1"], input);
  }

  #[tokio::test]
  async fn pinned_data_short_circuits_execution() {
    let registry = Arc::new(NodeRegistry::new());
    let kernel = NodeKernel::new(registry);
    let mut ctx = ExecutionContext::new(empty_workflow(), "exec-1".to_string(), ExecutionMode::Manual);
    let mut def = node_def("N1", "Echo");
    let pinned = vec![NodeData::from_json(json!({"pinned": true}))];
    def.pinned_data = Some(pinned.clone());

    let outcome = kernel
      .run_node(&mut ctx, &def, &[], CancellationToken::new())
      .await
      .unwrap();

    match outcome {
      NodeRunOutcome::Completed(outputs) => {
        assert_eq!(outputs[DEFAULT_INPUT].items().unwrap(), &pinned[..]);
      }
      other => panic!("expected Completed, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn retries_exhaust_then_fail() {
    let attempts = Arc::new(AtomicU32::new(0));
    let mut registry = NodeRegistry::new();
    let descriptor = NodeDescriptor {
      node_type: "Fails".to_string(),
      inputs: InputCardinality::Static(vec!["main".to_string()]),
      outputs: OutputSpec::Static(vec!["main".to_string()]),
      is_trigger: false,
      required_parameters: vec![],
      ui_schema: Value::Null,
    };
    let attempts_for_ctor = attempts.clone();
    registry
      .register("Fails", descriptor, move || {
        Arc::new(AlwaysFailsNode {
          attempts: attempts_for_ctor.clone(),
        })
      })
      .unwrap();
    let kernel = NodeKernel::new(Arc::new(registry));
    let mut ctx = ExecutionContext::new(empty_workflow(), "exec-1".to_string(), ExecutionMode::Manual);
    let mut def = node_def("N1", "Fails");
    def.error_policy.retry_on_fail = 2;

    let outcome = kernel
      .run_node(&mut ctx, &def, &[], CancellationToken::new())
      .await
      .unwrap();

    match outcome {
      NodeRunOutcome::Failed(_, message) => assert!(
        message.contains("3 attempts"),
        "expected message to mention the attempt count, got: {message}"
      ),
      other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(ctx.errors.len(), 1);
  }

  #[tokio::test]
  async fn continue_on_fail_emits_synthetic_error_item() {
    let mut registry = NodeRegistry::new();
    let descriptor = NodeDescriptor {
      node_type: "Fails".to_string(),
      inputs: InputCardinality::Static(vec!["main".to_string()]),
      outputs: OutputSpec::Static(vec!["main".to_string()]),
      is_trigger: false,
      required_parameters: vec![],
      ui_schema: Value::Null,
    };
    registry
      .register("Fails", descriptor, || {
        Arc::new(AlwaysFailsNode {
          attempts: Arc::new(AtomicU32::new(0)),
        })
      })
      .unwrap();
    let kernel = NodeKernel::new(Arc::new(registry));
    let mut ctx = ExecutionContext::new(empty_workflow(), "exec-1".to_string(), ExecutionMode::Manual);
    let mut def = node_def("N1", "Fails");
    def.error_policy.continue_on_fail = true;

    let outcome = kernel
      .run_node(&mut ctx, &def, &[], CancellationToken::new())
      .await
      .unwrap();

    match outcome {
      NodeRunOutcome::ContinuedWithError(outputs, _) => {
        let items = outputs[DEFAULT_INPUT].items().unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].json.get("error").is_some());
      }
      other => panic!("expected ContinuedWithError, got {other:?}"),
    }
    assert_eq!(ctx.errors.len(), 1);
    assert!(ctx.warnings.is_empty());
  }
}
