use std::collections::HashMap;

use flowcraft_model::Workflow;

/// Adjacency view of a workflow's connections, built once and reused by every structural check
/// (reachability, cycle detection).
///
/// Genuine loop back-edges ([`Workflow::loop_back_edges`]) are excluded from the forward adjacency
/// used for cycle detection — they are the one intentional cycle-closing edge a workflow may
/// contain. A loop controller's own `"loop"` dispatch edge is NOT one of these: it stays in the
/// forward adjacency like any other edge, so the loop body is reachable.
pub struct Graph<'a> {
  workflow: &'a Workflow,
  forward: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> Graph<'a> {
  pub fn build(workflow: &'a Workflow) -> Self {
    let back_edges = workflow.loop_back_edges();
    let mut forward: HashMap<&str, Vec<&str>> = HashMap::new();
    for node in &workflow.nodes {
      forward.entry(node.name.as_str()).or_default();
    }
    for conn in &workflow.connections {
      if back_edges.contains(conn) {
        continue;
      }
      forward
        .entry(conn.source_node.as_str())
        .or_default()
        .push(conn.target_node.as_str());
    }
    Self { workflow, forward }
  }

  pub fn successors(&self, node: &str) -> &[&'a str] {
    self.forward.get(node).map(|v| v.as_slice()).unwrap_or(&[])
  }

  /// BFS reachability set from the given start nodes, following only non-loop-back edges.
  pub fn reachable_from(&self, starts: &[&str]) -> std::collections::HashSet<&'a str> {
    let mut seen: std::collections::HashSet<&str> = std::collections::HashSet::new();
    let mut queue: Vec<&str> = Vec::new();
    for s in starts {
      if let Some(name) = self.workflow.node(s).map(|n| n.name.as_str()) {
        if seen.insert(name) {
          queue.push(name);
        }
      }
    }
    let mut i = 0;
    while i < queue.len() {
      let current = queue[i];
      i += 1;
      for next in self.successors(current) {
        if seen.insert(next) {
          queue.push(next);
        }
      }
    }
    seen
  }

  /// `Some(node)` naming a node on a cycle, found via DFS with a recursion stack, or `None` if the
  /// (loop-edge-excluded) graph is acyclic.
  pub fn find_cycle(&self) -> Option<&'a str> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
      Visiting,
      Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
      graph: &Graph<'a>,
      node: &'a str,
      marks: &mut HashMap<&'a str, Mark>,
    ) -> Option<&'a str> {
      match marks.get(node) {
        Some(Mark::Done) => return None,
        Some(Mark::Visiting) => return Some(node),
        None => {}
      }
      marks.insert(node, Mark::Visiting);
      for next in graph.successors(node) {
        if let Some(cycle_node) = visit(graph, next, marks) {
          return Some(cycle_node);
        }
      }
      marks.insert(node, Mark::Done);
      None
    }

    for node in &self.workflow.nodes {
      if let Some(cycle_node) = visit(self, node.name.as_str(), &mut marks) {
        return Some(cycle_node);
      }
    }
    None
  }
}
