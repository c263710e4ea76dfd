use flowcraft_model::NodeOutputs;

/// What happened when the kernel ran one node ("Failure path").
#[derive(Debug)]
pub enum NodeRunOutcome {
  /// The node produced its declared outputs. Includes the disabled/pinned short-circuits, which
  /// never invoke the node body.
  Completed(NodeOutputs),
  /// Every attempt failed, but the node's error policy has `continue_on_fail` set: a synthetic
  /// error item is emitted on `main` so downstream nodes still receive data, and the execution is
  /// not marked failed. Recorded as a warning, not an error (open question, resolved — see
  /// DESIGN.md, "Kernel: continue_on_fail disposition").
  ContinuedWithError(NodeOutputs, String),
  /// Every attempt failed and `continue_on_fail` is unset: the execution is marked failed and every
  /// declared output of this node becomes a dead branch ("reachable fan-in" — a downstream join
  /// must not wait forever on a node that will never produce data).
  Failed(NodeOutputs, String),
}
