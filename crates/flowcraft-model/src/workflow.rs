use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::connection::Connection;
use crate::node::NodeDefinition;

/// A workflow definition: a DAG (with permitted loop back-edges) of nodes connected by named
/// output→input edges.
///
/// Immutable during an execution — editing a workflow creates a new definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  /// Opaque identifier.
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub active: bool,
  pub nodes: Vec<NodeDefinition>,
  #[serde(default)]
  pub connections: Vec<Connection>,
  #[serde(default)]
  pub settings: Map<String, Value>,
}

impl Workflow {
  /// Find a node definition by name.
  pub fn node(&self, name: &str) -> Option<&NodeDefinition> {
    self.nodes.iter().find(|n| n.name == name)
  }

  /// All connections whose `target_node` matches, in declaration order.
  ///
  /// Declaration order determines join tie-breaking ("Ordering guarantees").
  pub fn incoming(&self, target: &str) -> impl Iterator<Item = &Connection> {
    self.connections.iter().filter(move |c| c.target_node == target)
  }

  /// All connections leaving `(source, output)`, in declaration order — determines fan-out delivery
  /// order ("Tie-breaking").
  pub fn outgoing(&self, source: &str, output: &str) -> impl Iterator<Item = &Connection> {
    self
      .connections
      .iter()
      .filter(move |c| c.source_node == source && c.source_output == output)
  }

  /// All distinct `(output_name)` values a node has at least one outgoing connection on.
  pub fn declared_outputs(&self, node: &str) -> Vec<&str> {
    let mut outputs: Vec<&str> = Vec::new();
    for c in &self.connections {
      if c.source_node == node && !outputs.contains(&c.source_output.as_str()) {
        outputs.push(&c.source_output);
      }
    }
    outputs
  }

  /// The connections that are genuine loop re-entry edges: edges that close a cycle back into a
  /// node which itself has an outgoing `"loop"`-typed connection (a loop controller, typically
  /// SplitInBatches).
  ///
  /// A controller's own dispatch edge (`controller --loop--> body`) is deliberately NOT included
  /// here: it is the edge that *enters* the loop body and behaves like any other forward edge for
  /// reachability and join purposes. The back-edge is whichever connection re-enters the
  /// controller from somewhere downstream of that dispatch — directly, for a single-node loop body
  /// (including a controller that loops to itself), or through however many intermediate nodes the
  /// body has.
  pub fn loop_back_edges(&self) -> HashSet<Connection> {
    let mut back_edges = HashSet::new();

    for dispatch in self.connections.iter().filter(|c| c.source_output == "loop") {
      let controller = dispatch.source_node.as_str();

      let mut downstream: HashSet<&str> = HashSet::new();
      let mut queue = VecDeque::new();
      downstream.insert(dispatch.target_node.as_str());
      queue.push_back(dispatch.target_node.as_str());
      while let Some(node) = queue.pop_front() {
        for c in &self.connections {
          if c.source_node == node && downstream.insert(c.target_node.as_str()) {
            queue.push_back(c.target_node.as_str());
          }
        }
      }

      for c in &self.connections {
        if c.target_node == controller && downstream.contains(c.source_node.as_str()) {
          back_edges.insert(c.clone());
        }
      }
    }

    back_edges
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::connection::DEFAULT_INPUT;
  use crate::node::{ErrorPolicy, NodeDefinition};

  fn wf(connections: Vec<Connection>) -> Workflow {
    let names: HashSet<&str> = connections
      .iter()
      .flat_map(|c| [c.source_node.as_str(), c.target_node.as_str()])
      .collect();
    Workflow {
      id: "wf".to_string(),
      name: "test".to_string(),
      active: true,
      nodes: names
        .into_iter()
        .map(|n| NodeDefinition {
          name: n.to_string(),
          node_type: "Noop".to_string(),
          parameters: Map::new(),
          disabled: false,
          error_policy: ErrorPolicy::default(),
          pinned_data: None,
        })
        .collect(),
      connections,
      settings: Map::new(),
    }
  }

  fn conn(source: &str, output: &str, target: &str) -> Connection {
    Connection {
      source_node: source.to_string(),
      source_output: output.to_string(),
      target_node: target.to_string(),
      target_input: DEFAULT_INPUT.to_string(),
    }
  }

  #[test]
  fn dispatch_edge_is_not_a_back_edge() {
    let workflow = wf(vec![
      conn("Start1", "main", "Controller"),
      conn("Controller", "loop", "LoopBody"),
      conn("LoopBody", "main", "Controller"),
      conn("Controller", "done", "Done"),
    ]);
    let back_edges = workflow.loop_back_edges();
    assert!(!back_edges.contains(&conn("Controller", "loop", "LoopBody")));
    assert!(back_edges.contains(&conn("LoopBody", "main", "Controller")));
    assert!(!back_edges.contains(&conn("Start1", "main", "Controller")));
    assert!(!back_edges.contains(&conn("Controller", "done", "Done")));
  }

  #[test]
  fn multi_hop_loop_body_only_the_closing_edge_is_a_back_edge() {
    let workflow = wf(vec![
      conn("Start1", "main", "Controller"),
      conn("Controller", "loop", "A"),
      conn("A", "main", "B"),
      conn("B", "main", "Controller"),
    ]);
    let back_edges = workflow.loop_back_edges();
    assert!(!back_edges.contains(&conn("Controller", "loop", "A")));
    assert!(!back_edges.contains(&conn("A", "main", "B")));
    assert!(back_edges.contains(&conn("B", "main", "Controller")));
  }

  #[test]
  fn self_looping_controller_is_its_own_back_edge() {
    let workflow = wf(vec![
      conn("Start1", "main", "Controller"),
      conn("Controller", "loop", "Controller"),
    ]);
    let back_edges = workflow.loop_back_edges();
    assert!(back_edges.contains(&conn("Controller", "loop", "Controller")));
  }

  #[test]
  fn no_loop_dispatch_means_no_back_edges() {
    let workflow = wf(vec![conn("Start1", "main", "A"), conn("A", "main", "B")]);
    assert!(workflow.loop_back_edges().is_empty());
  }
}
