use std::collections::HashSet;

use flowcraft_model::{Connection, Workflow};
use flowcraft_registry::NodeRegistry;

use crate::error::ValidationIssue;
use crate::graph::Graph;
use crate::report::ValidationReport;

/// Runs every structural check over `workflow` and returns the accumulated report. Never panics or
/// short-circuits on the first issue — every node and connection is checked.
pub fn validate(workflow: &Workflow, registry: &NodeRegistry) -> ValidationReport {
  let mut report = ValidationReport::default();

  if workflow.nodes.is_empty() {
    report.error(ValidationIssue::EmptyWorkflow);
    return report;
  }

  let back_edges = workflow.loop_back_edges();

  check_duplicate_names(workflow, &mut report);
  check_node_types(workflow, registry, &mut report);
  check_required_parameters(workflow, registry, &mut report);
  check_connections(workflow, registry, &back_edges, &mut report);
  check_trigger_incoming(workflow, registry, &mut report);
  check_fan_in_fan_out(workflow, &mut report);

  let graph = Graph::build(workflow);
  check_reachability(workflow, registry, &graph, &mut report);
  check_cycles(&graph, &mut report);

  report
}

fn check_duplicate_names(workflow: &Workflow, report: &mut ValidationReport) {
  let mut seen: HashSet<&str> = HashSet::new();
  for node in &workflow.nodes {
    if !seen.insert(node.name.as_str()) {
      report.error(ValidationIssue::DuplicateNodeName(node.name.clone()));
    }
  }
}

fn check_node_types(workflow: &Workflow, registry: &NodeRegistry, report: &mut ValidationReport) {
  for node in &workflow.nodes {
    if !registry.has(&node.node_type) {
      report.error(ValidationIssue::UnknownNodeType {
        node: node.name.clone(),
        node_type: node.node_type.clone(),
      });
    }
  }
}

fn check_required_parameters(
  workflow: &Workflow,
  registry: &NodeRegistry,
  report: &mut ValidationReport,
) {
  for node in &workflow.nodes {
    let Ok(descriptor) = registry.describe(&node.node_type) else {
      continue; // already reported by check_node_types
    };
    for required in &descriptor.required_parameters {
      if !node.parameters.contains_key(required) {
        report.error(ValidationIssue::MissingRequiredParameter {
          node: node.name.clone(),
          parameter: required.clone(),
        });
      }
    }
  }
}

fn check_connections(
  workflow: &Workflow,
  registry: &NodeRegistry,
  back_edges: &HashSet<Connection>,
  report: &mut ValidationReport,
) {
  for conn in &workflow.connections {
    if workflow.node(&conn.source_node).is_none() {
      report.error(ValidationIssue::UnknownSourceNode(conn.source_node.clone()));
    }
    let Some(target) = workflow.node(&conn.target_node) else {
      report.error(ValidationIssue::UnknownTargetNode(conn.target_node.clone()));
      continue;
    };
    if conn.source_node == conn.target_node && !back_edges.contains(conn) {
      report.error(ValidationIssue::SelfConnection(conn.source_node.clone()));
    }
    if let Ok(descriptor) = registry.describe(&target.node_type) {
      if !descriptor.accepts_input(&conn.target_input) {
        report.error(ValidationIssue::UnknownTargetInput {
          node: target.name.clone(),
          input: conn.target_input.clone(),
        });
      }
    }
  }
}

fn check_reachability(
  workflow: &Workflow,
  registry: &NodeRegistry,
  graph: &Graph<'_>,
  report: &mut ValidationReport,
) {
  let triggers: Vec<&str> = workflow
    .nodes
    .iter()
    .filter(|n| {
      registry
        .describe(&n.node_type)
        .map(|d| d.is_trigger)
        .unwrap_or(false)
    })
    .map(|n| n.name.as_str())
    .collect();

  if triggers.is_empty() {
    report.error(ValidationIssue::NoTriggerNode);
    return;
  }

  let reachable = graph.reachable_from(&triggers);
  for node in &workflow.nodes {
    if !reachable.contains(node.name.as_str()) {
      report.warning(ValidationIssue::UnreachableNode(node.name.clone()));
    }
  }
}

fn check_cycles(graph: &Graph<'_>, report: &mut ValidationReport) {
  if let Some(cycle_node) = graph.find_cycle() {
    report.warning(ValidationIssue::Cycle(cycle_node.to_string()));
  }
}

/// Trigger-typed nodes with an incoming connection (warning — triggers start a run, they do not
/// receive data from other nodes).
fn check_trigger_incoming(workflow: &Workflow, registry: &NodeRegistry, report: &mut ValidationReport) {
  for conn in &workflow.connections {
    let Some(target) = workflow.node(&conn.target_node) else {
      continue; // already reported by check_connections
    };
    if registry
      .describe(&target.node_type)
      .map(|d| d.is_trigger)
      .unwrap_or(false)
    {
      report.warning(ValidationIssue::TriggerHasIncoming(target.name.clone()));
    }
  }
}

/// Merge nodes with fewer than two incoming connections, and If/Switch nodes with no outgoing
/// connections (warnings — both are structurally legal but almost certainly unintended).
fn check_fan_in_fan_out(workflow: &Workflow, report: &mut ValidationReport) {
  for node in &workflow.nodes {
    let incoming = workflow
      .connections
      .iter()
      .filter(|c| c.target_node == node.name)
      .count();
    let outgoing = workflow
      .connections
      .iter()
      .filter(|c| c.source_node == node.name)
      .count();

    if node.node_type == "Merge" && incoming < 2 {
      report.warning(ValidationIssue::MergeMissingInputs(node.name.clone()));
    }
    if (node.node_type == "If" || node.node_type == "Switch") && outgoing == 0 {
      report.warning(ValidationIssue::NoOutgoingConnections(node.name.clone()));
    }
  }
}
