use thiserror::Error;

/// A single structural problem found in a workflow ("Validation report"). Collected rather than
/// raised — `Workflow::validate` never returns `Err`, it returns a `ValidationReport`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationIssue {
  #[error("duplicate node name: {0}")]
  DuplicateNodeName(String),

  #[error("node '{node}' has unknown type '{node_type}'")]
  UnknownNodeType { node: String, node_type: String },

  #[error("connection references unknown source node: {0}")]
  UnknownSourceNode(String),

  #[error("connection references unknown target node: {0}")]
  UnknownTargetNode(String),

  #[error("node '{0}' is unreachable from any trigger")]
  UnreachableNode(String),

  #[error("workflow has no trigger node to start from")]
  NoTriggerNode,

  #[error("cycle detected through node '{0}' (not a declared loop edge)")]
  Cycle(String),

  #[error("node '{node}' is missing required parameter '{parameter}'")]
  MissingRequiredParameter { node: String, parameter: String },

  #[error("node '{0}' has a connection to itself")]
  SelfConnection(String),

  #[error("connection targets unknown input '{input}' on node '{node}'")]
  UnknownTargetInput { node: String, input: String },

  #[error("workflow has zero nodes")]
  EmptyWorkflow,

  #[error("trigger node '{0}' has an incoming connection")]
  TriggerHasIncoming(String),

  #[error("merge node '{0}' has fewer than two incoming connections")]
  MergeMissingInputs(String),

  #[error("node '{0}' has no outgoing connections")]
  NoOutgoingConnections(String),
}
