//! FIFO job queue scheduler.
//!
//! Walks a validated workflow graph one job at a time, joining multi-input nodes via a
//! dead-branch-aware buffer and permitting `"loop"`-typed back-edges to re-enter a loop controller.
//! See DESIGN.md for the reasoning behind a plain FIFO queue over a generation-barrier traversal.

mod error;
mod job;
mod scheduler;

pub use error::SchedulerError;
pub use job::Job;
pub use scheduler::Scheduler;

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use async_trait::async_trait;
  use flowcraft_kernel::NodeKernel;
  use flowcraft_model::{
    Connection, ErrorPolicy, ExecutionContext, ExecutionMode, Node, NodeContext, NodeData,
    NodeDefinition, NodeError, NodeOutputs, Payload, Workflow, DEFAULT_INPUT,
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

  /// Routes each item to `true` or `false` based on whether `json.route` equals `"a"`, emitting
  /// `DeadBranch` on the other output — mimics the If node's per-item contract without pulling in
  /// the expression engine.
  struct RouteNode;

  #[async_trait]
  impl Node for RouteNode {
    async fn execute(
      &self,
      _ctx: &mut NodeContext<'_>,
      _params: &Value,
      input: &[NodeData],
    ) -> Result<NodeOutputs, NodeError> {
      let mut true_items = Vec::new();
      let mut false_items = Vec::new();
      for item in input {
        if item.json.get("route").and_then(Value::as_str) == Some("a") {
          true_items.push(item.clone());
        } else {
          false_items.push(item.clone());
        }
      }
      let mut out = NodeOutputs::new();
      out.insert(
        "true".to_string(),
        if true_items.is_empty() {
          Payload::DeadBranch
        } else {
          Payload::Items(true_items)
        },
      );
      out.insert(
        "false".to_string(),
        if false_items.is_empty() {
          Payload::DeadBranch
        } else {
          Payload::Items(false_items)
        },
      );
      Ok(out)
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

  fn conn(from: &str, from_out: &str, to: &str) -> Connection {
    Connection {
      source_node: from.to_string(),
      source_output: from_out.to_string(),
      target_node: to.to_string(),
      target_input: "main".to_string(),
    }
  }

  fn registry_with(entries: &[(&str, bool, &[&str])]) -> NodeRegistry {
    let mut r = NodeRegistry::new();
    for (node_type, multi_output, outputs) in entries {
      let descriptor = NodeDescriptor {
        node_type: node_type.to_string(),
        inputs: InputCardinality::Static(vec!["main".to_string()]),
        outputs: OutputSpec::Static(outputs.iter().map(|s| s.to_string()).collect()),
        is_trigger: false,
        required_parameters: vec![],
        ui_schema: Value::Null,
      };
      if *multi_output {
        r.register(node_type.to_string(), descriptor, || Arc::new(RouteNode)).unwrap();
      } else {
        r.register(node_type.to_string(), descriptor, || Arc::new(EchoNode)).unwrap();
      }
    }
    r
  }

  fn scheduler(registry: NodeRegistry) -> Scheduler {
    let kernel = Arc::new(NodeKernel::new(Arc::new(registry)));
    Scheduler::new(kernel)
  }

  #[tokio::test]
  async fn if_routing_delivers_items_to_matching_branch_only() {
    let registry = registry_with(&[
      ("Start", false, &["main"]),
      ("If", true, &["true", "false"]),
      ("Setter", false, &["main"]),
    ]);
    let workflow = Workflow {
      id: "wf".to_string(),
      name: "t".to_string(),
      active: true,
      nodes: vec![
        node_def("Start1", "Start"),
        node_def("If1", "If"),
        node_def("TrueSetter", "Setter"),
        node_def("FalseSetter", "Setter"),
      ],
      connections: vec![
        conn("Start1", "main", "If1"),
        conn("If1", "true", "TrueSetter"),
        conn("If1", "false", "FalseSetter"),
      ],
      settings: serde_json::Map::new(),
    };
    let ctx = ExecutionContext::new(workflow, "exec-1".to_string(), ExecutionMode::Manual);
    let items = vec![NodeData::from_json(json!({"route": "a"}))];

    let result = scheduler(registry)
      .run(ctx, "Start1", items.clone(), CancellationToken::new())
      .await
      .unwrap();

    assert_eq!(result.node_states["TrueSetter"], items);
    assert!(!result.node_states.contains_key("FalseSetter"));
    assert!(result.errors.is_empty());
  }

  #[tokio::test]
  async fn merge_waits_for_every_live_input_and_concatenates_in_order() {
    let registry = registry_with(&[
      ("Start", false, &["main"]),
      ("If", true, &["true", "false"]),
      ("Merge", false, &["main"]),
    ]);
    let workflow = Workflow {
      id: "wf".to_string(),
      name: "t".to_string(),
      active: true,
      nodes: vec![node_def("Start1", "Start"), node_def("If1", "If"), node_def("Merge1", "Merge")],
      connections: vec![
        conn("Start1", "main", "If1"),
        conn("If1", "true", "Merge1"),
        conn("If1", "false", "Merge1"),
      ],
      settings: serde_json::Map::new(),
    };
    let ctx = ExecutionContext::new(workflow, "exec-1".to_string(), ExecutionMode::Manual);
    let items = vec![NodeData::from_json(json!({"route": "a"}))];

    let result = scheduler(registry)
      .run(ctx, "Start1", items, CancellationToken::new())
      .await
      .unwrap();

    // Only "true" carried data (route == "a"); "false" died, so Merge must
    // still fire once both edges have reported (invariant 3) and its
    // output is exactly the live input (testable property 4).
    assert_eq!(result.node_states["Merge1"].len(), 1);
    assert_eq!(result.node_states["Merge1"][0].json["route"], "a");
  }

  #[tokio::test]
  async fn merge_all_dead_never_executes() {
    let registry = registry_with(&[
      ("Start", false, &["main"]),
      ("If", true, &["true", "false"]),
      ("Merge", false, &["main"]),
    ]);
    let workflow = Workflow {
      id: "wf".to_string(),
      name: "t".to_string(),
      active: true,
      nodes: vec![node_def("Start1", "Start"), node_def("If1", "If"), node_def("Merge1", "Merge")],
      connections: vec![
        conn("Start1", "main", "If1"),
        conn("If1", "true", "Merge1"),
        conn("If1", "false", "Merge1"),
      ],
      settings: serde_json::Map::new(),
    };
    let ctx = ExecutionContext::new(workflow, "exec-1".to_string(), ExecutionMode::Manual);
    // An empty item list makes RouteNode mark both outputs dead.
    let result = scheduler(registry)
      .run(ctx, "Start1", vec![], CancellationToken::new())
      .await
      .unwrap();

    assert!(!result.node_states.contains_key("Merge1"));
  }

  #[tokio::test]
  async fn unknown_start_node_is_an_error() {
    let registry = registry_with(&[("Start", false, &["main"])]);
    let workflow = Workflow {
      id: "wf".to_string(),
      name: "t".to_string(),
      active: true,
      nodes: vec![node_def("Start1", "Start")],
      connections: vec![],
      settings: serde_json::Map::new(),
    };
    let ctx = ExecutionContext::new(workflow, "exec-1".to_string(), ExecutionMode::Manual);
    let err = scheduler(registry)
      .run(ctx, "Missing", vec![], CancellationToken::new())
      .await
      .unwrap_err();
    assert!(matches!(err, SchedulerError::UnknownStartNode(n) if n == "Missing"));
  }

  #[tokio::test]
  async fn cancellation_stops_the_queue_and_records_an_error() {
    let registry = registry_with(&[("Start", false, &["main"]), ("Setter", false, &["main"])]);
    let workflow = Workflow {
      id: "wf".to_string(),
      name: "t".to_string(),
      active: true,
      nodes: vec![node_def("Start1", "Start"), node_def("Setter1", "Setter")],
      connections: vec![conn("Start1", "main", "Setter1")],
      settings: serde_json::Map::new(),
    };
    let ctx = ExecutionContext::new(workflow, "exec-1".to_string(), ExecutionMode::Manual);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = scheduler(registry).run(ctx, "Start1", vec![], cancel).await.unwrap();

    assert!(!result.errors.is_empty());
    assert!(!result.node_states.contains_key("Start1"));
  }
}
