use std::collections::HashMap;
use std::sync::Arc;

use flowcraft_model::Node;

use crate::descriptor::NodeDescriptor;
use crate::error::RegistryError;

struct Entry {
  descriptor: NodeDescriptor,
  construct: Box<dyn Fn() -> Arc<dyn Node> + Send + Sync>,
}

/// Catalog of registered node types.
///
/// Built once per process and handed by reference into the engine — not a singleton/global, per the
/// re-architecture note in.
#[derive(Default)]
pub struct NodeRegistry {
  entries: HashMap<String, Entry>,
}

impl NodeRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a node type. Errors if `node_type` is already registered.
  pub fn register(
    &mut self,
    node_type: impl Into<String>,
    descriptor: NodeDescriptor,
    construct: impl Fn() -> Arc<dyn Node> + Send + Sync + 'static,
  ) -> Result<(), RegistryError> {
    let node_type = node_type.into();
    if self.entries.contains_key(&node_type) {
      return Err(RegistryError::DuplicateType(node_type));
    }
    self.entries.insert(
      node_type,
      Entry {
        descriptor,
        construct: Box::new(construct),
      },
    );
    Ok(())
  }

  /// Construct a fresh instance of a registered node type.
  pub fn get(&self, node_type: &str) -> Result<Arc<dyn Node>, RegistryError> {
    self
      .entries
      .get(node_type)
      .map(|e| (e.construct)())
      .ok_or_else(|| RegistryError::UnknownType(node_type.to_string()))
  }

  pub fn has(&self, node_type: &str) -> bool {
    self.entries.contains_key(node_type)
  }

  pub fn list(&self) -> Vec<&str> {
    self.entries.keys().map(String::as_str).collect()
  }

  pub fn describe(&self, node_type: &str) -> Result<&NodeDescriptor, RegistryError> {
    self
      .entries
      .get(node_type)
      .map(|e| &e.descriptor)
      .ok_or_else(|| RegistryError::UnknownType(node_type.to_string()))
  }

  /// All trigger-typed descriptors (reachability BFS seeds).
  pub fn trigger_types(&self) -> Vec<&str> {
    self
      .entries
      .iter()
      .filter(|(_, e)| e.descriptor.is_trigger)
      .map(|(name, _)| name.as_str())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use flowcraft_model::{NodeContext, NodeError, NodeOutputs};
  use serde_json::Value;

  use super::*;
  use crate::descriptor::{InputCardinality, OutputSpec};

  struct NoopNode;

  #[async_trait]
  impl Node for NoopNode {
    async fn execute(
      &self,
      _ctx: &mut NodeContext<'_>,
      _params: &Value,
      _input: &[flowcraft_model::NodeData],
    ) -> Result<NodeOutputs, NodeError> {
      Ok(NodeOutputs::new())
    }
  }

  fn descriptor(is_trigger: bool) -> NodeDescriptor {
    NodeDescriptor {
      node_type: "Noop".to_string(),
      inputs: InputCardinality::Static(vec!["main".to_string()]),
      outputs: OutputSpec::Static(vec!["main".to_string()]),
      is_trigger,
      required_parameters: Vec::new(),
      ui_schema: Value::Null,
    }
  }

  #[test]
  fn duplicate_registration_errors() {
    let mut registry = NodeRegistry::new();
    registry
      .register("Noop", descriptor(false), || Arc::new(NoopNode))
      .unwrap();
    let err = registry
      .register("Noop", descriptor(false), || Arc::new(NoopNode))
      .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateType(t) if t == "Noop"));
  }

  #[test]
  fn unknown_type_errors() {
    let registry = NodeRegistry::new();
    assert!(matches!(
      registry.get("Missing"),
      Err(RegistryError::UnknownType(_))
    ));
  }

  #[test]
  fn trigger_types_are_filtered() {
    let mut registry = NodeRegistry::new();
    registry
      .register("Start", descriptor(true), || Arc::new(NoopNode))
      .unwrap();
    registry
      .register("Set", descriptor(false), || Arc::new(NoopNode))
      .unwrap();
    assert_eq!(registry.trigger_types(), vec!["Start"]);
  }
}
