//! Workflow structural validator.

mod error;
mod graph;
mod report;
mod validator;

pub use error::ValidationIssue;
pub use report::ValidationReport;
pub use validator::validate;

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use flowcraft_model::{Connection, Node, NodeContext, NodeData, NodeDefinition, NodeError, NodeOutputs, Workflow};
  use flowcraft_registry::{InputCardinality, NodeDescriptor, NodeRegistry, OutputSpec};
  use serde_json::{json, Value};
  use std::sync::Arc;

  use super::*;

  struct NoopNode;

  #[async_trait]
  impl Node for NoopNode {
    async fn execute(
      &self,
      _ctx: &mut NodeContext<'_>,
      _params: &Value,
      _input: &[NodeData],
    ) -> Result<NodeOutputs, NodeError> {
      Ok(NodeOutputs::new())
    }
  }

  fn registry() -> NodeRegistry {
    let mut r = NodeRegistry::new();
    r.register(
      "Start",
      NodeDescriptor {
        node_type: "Start".to_string(),
        inputs: InputCardinality::Static(vec![]),
        outputs: OutputSpec::Static(vec!["main".to_string()]),
        is_trigger: true,
        required_parameters: vec![],
        ui_schema: Value::Null,
      },
      || Arc::new(NoopNode),
    )
    .unwrap();
    r.register(
      "Set",
      NodeDescriptor {
        node_type: "Set".to_string(),
        inputs: InputCardinality::Static(vec!["main".to_string()]),
        outputs: OutputSpec::Static(vec!["main".to_string()]),
        is_trigger: false,
        required_parameters: vec!["values".to_string()],
        ui_schema: Value::Null,
      },
      || Arc::new(NoopNode),
    )
    .unwrap();
    r.register(
      "Merge",
      NodeDescriptor {
        node_type: "Merge".to_string(),
        inputs: InputCardinality::Dynamic,
        outputs: OutputSpec::Static(vec!["main".to_string()]),
        is_trigger: false,
        required_parameters: vec![],
        ui_schema: Value::Null,
      },
      || Arc::new(NoopNode),
    )
    .unwrap();
    r.register(
      "If",
      NodeDescriptor {
        node_type: "If".to_string(),
        inputs: InputCardinality::Static(vec!["main".to_string()]),
        outputs: OutputSpec::Static(vec!["true".to_string(), "false".to_string()]),
        is_trigger: false,
        required_parameters: vec![],
        ui_schema: Value::Null,
      },
      || Arc::new(NoopNode),
    )
    .unwrap();
    r
  }

  fn node(name: &str, node_type: &str) -> NodeDefinition {
    NodeDefinition {
      name: name.to_string(),
      node_type: node_type.to_string(),
      parameters: serde_json::Map::new(),
      disabled: false,
      error_policy: Default::default(),
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

  fn wf(nodes: Vec<NodeDefinition>, connections: Vec<Connection>) -> Workflow {
    Workflow {
      id: "wf1".to_string(),
      name: "test".to_string(),
      active: true,
      nodes,
      connections,
      settings: serde_json::Map::new(),
    }
  }

  #[test]
  fn valid_linear_workflow_passes() {
    let mut set_node = node("Set1", "Set");
    set_node.parameters.insert("values".to_string(), json!({}));
    let workflow = wf(
      vec![node("Start1", "Start"), set_node],
      vec![conn("Start1", "main", "Set1")],
    );
    let report = validate(&workflow, &registry());
    assert!(report.is_valid(), "{:?}", report.errors);
  }

  #[test]
  fn missing_trigger_is_reported() {
    let mut set_node = node("Set1", "Set");
    set_node.parameters.insert("values".to_string(), json!({}));
    let workflow = wf(vec![set_node], vec![]);
    let report = validate(&workflow, &registry());
    assert!(report.errors.contains(&ValidationIssue::NoTriggerNode));
  }

  #[test]
  fn unreachable_node_is_reported() {
    let mut set_node = node("Set1", "Set");
    set_node.parameters.insert("values".to_string(), json!({}));
    let workflow = wf(vec![node("Start1", "Start"), set_node], vec![]);
    let report = validate(&workflow, &registry());
    assert!(report.is_valid());
    assert!(report
      .warnings
      .contains(&ValidationIssue::UnreachableNode("Set1".to_string())));
  }

  #[test]
  fn missing_required_parameter_is_reported() {
    let workflow = wf(
      vec![node("Start1", "Start"), node("Set1", "Set")],
      vec![conn("Start1", "main", "Set1")],
    );
    let report = validate(&workflow, &registry());
    assert!(report.errors.contains(&ValidationIssue::MissingRequiredParameter {
      node: "Set1".to_string(),
      parameter: "values".to_string(),
    }));
  }

  #[test]
  fn cycle_without_loop_edge_is_reported() {
    let mut a = node("A", "Set");
    a.parameters.insert("values".to_string(), json!({}));
    let mut b = node("B", "Set");
    b.parameters.insert("values".to_string(), json!({}));
    let workflow = wf(
      vec![node("Start1", "Start"), a, b],
      vec![
        conn("Start1", "main", "A"),
        conn("A", "main", "B"),
        conn("B", "main", "A"),
      ],
    );
    let report = validate(&workflow, &registry());
    assert!(report.is_valid());
    assert!(report.warnings.iter().any(|e| matches!(e, ValidationIssue::Cycle(_))));
  }

  #[test]
  fn loop_back_edge_is_not_a_cycle() {
    let mut a = node("A", "Set");
    a.parameters.insert("values".to_string(), json!({}));
    let mut b = node("B", "Set");
    b.parameters.insert("values".to_string(), json!({}));
    let workflow = wf(
      vec![node("Start1", "Start"), a, b],
      vec![
        conn("Start1", "main", "A"),
        conn("A", "main", "B"),
        conn("B", "loop", "A"),
      ],
    );
    let report = validate(&workflow, &registry());
    assert!(!report.errors.iter().any(|e| matches!(e, ValidationIssue::Cycle(_))));
  }

  #[test]
  fn unknown_node_type_is_reported() {
    let workflow = wf(vec![node("Mystery", "DoesNotExist")], vec![]);
    let report = validate(&workflow, &registry());
    assert!(report.errors.iter().any(|e| matches!(e, ValidationIssue::UnknownNodeType { .. })));
  }

  #[test]
  fn duplicate_node_names_are_reported() {
    let workflow = wf(
      vec![node("Start1", "Start"), node("Start1", "Start")],
      vec![],
    );
    let report = validate(&workflow, &registry());
    assert!(report
      .errors
      .contains(&ValidationIssue::DuplicateNodeName("Start1".to_string())));
  }

  #[test]
  fn empty_workflow_is_an_error() {
    let workflow = wf(vec![], vec![]);
    let report = validate(&workflow, &registry());
    assert!(report.errors.contains(&ValidationIssue::EmptyWorkflow));
  }

  #[test]
  fn trigger_with_incoming_connection_is_a_warning() {
    let workflow = wf(
      vec![node("Start1", "Start"), node("Start2", "Start")],
      vec![conn("Start1", "main", "Start2")],
    );
    let report = validate(&workflow, &registry());
    assert!(report
      .warnings
      .contains(&ValidationIssue::TriggerHasIncoming("Start2".to_string())));
  }

  #[test]
  fn merge_with_one_incoming_connection_is_a_warning() {
    let workflow = wf(
      vec![node("Start1", "Start"), node("Merge1", "Merge")],
      vec![conn("Start1", "main", "Merge1")],
    );
    let report = validate(&workflow, &registry());
    assert!(report.is_valid());
    assert!(report
      .warnings
      .contains(&ValidationIssue::MergeMissingInputs("Merge1".to_string())));
  }

  #[test]
  fn if_node_with_no_outgoing_connections_is_a_warning() {
    let workflow = wf(
      vec![node("Start1", "Start"), node("If1", "If")],
      vec![conn("Start1", "main", "If1")],
    );
    let report = validate(&workflow, &registry());
    assert!(report.is_valid());
    assert!(report
      .warnings
      .contains(&ValidationIssue::NoOutgoingConnections("If1".to_string())));
  }

  #[test]
  fn loop_back_self_connection_is_not_an_error() {
    let mut a = node("A", "Set");
    a.parameters.insert("values".to_string(), json!({}));
    let workflow = wf(
      vec![node("Start1", "Start"), a],
      vec![conn("Start1", "main", "A"), conn("A", "loop", "A")],
    );
    let report = validate(&workflow, &registry());
    assert!(!report
      .errors
      .iter()
      .any(|e| matches!(e, ValidationIssue::SelfConnection(_))));
  }
}
