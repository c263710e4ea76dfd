//! Built-in node type implementations.
//!
//! [`register_builtins`] wires every built-in node type into a [`NodeRegistry`] with its descriptor
//! — the sole place that knows the full catalog. The engine calls it once at startup; nothing here
//! is a global or a singleton (re-architecture note).

pub mod nodes;

use std::sync::Arc;

use flowcraft_registry::{DynamicOutputStrategy, InputCardinality, NodeDescriptor, NodeRegistry, OutputSpec, RegistryError};
use flowcraft_sandbox::SandboxLimits;
use serde_json::Value;

use nodes::code::CodeNode;
use nodes::http_request::HttpRequestNode;
use nodes::if_node::IfNode;
use nodes::merge::MergeNode;
use nodes::set::SetNode;
use nodes::split_in_batches::SplitInBatchesNode;
use nodes::switch::SwitchNode;
use nodes::triggers::{CronNode, ErrorTriggerNode, StartNode, WebhookNode};
use nodes::wait::WaitNode;

const MAIN: &str = "main";

fn static_inputs(names: &[&str]) -> InputCardinality {
  InputCardinality::Static(names.iter().map(|s| s.to_string()).collect())
}

fn static_outputs(names: &[&str]) -> OutputSpec {
  OutputSpec::Static(names.iter().map(|s| s.to_string()).collect())
}

/// Registers every built-in node type into `registry`, using default Code-sandbox resource limits.
pub fn register_builtins(registry: &mut NodeRegistry) -> Result<(), RegistryError> {
  register_builtins_with_limits(registry, SandboxLimits::default())
}

/// Same as [`register_builtins`], but lets the caller supply the Code node's sandbox limits
/// (ambient configuration: sandbox deadline/memory).
pub fn register_builtins_with_limits(registry: &mut NodeRegistry, code_limits: SandboxLimits) -> Result<(), RegistryError> {
  registry.register(
    "Start",
    NodeDescriptor {
      node_type: "Start".to_string(),
      inputs: static_inputs(&[]),
      outputs: static_outputs(&[MAIN]),
      is_trigger: true,
      required_parameters: vec![],
      ui_schema: Value::Null,
    },
    || Arc::new(StartNode),
  )?;

  registry.register(
    "Webhook",
    NodeDescriptor {
      node_type: "Webhook".to_string(),
      inputs: static_inputs(&[]),
      outputs: static_outputs(&[MAIN]),
      is_trigger: true,
      required_parameters: vec![],
      ui_schema: Value::Null,
    },
    || Arc::new(WebhookNode),
  )?;

  registry.register(
    "Cron",
    NodeDescriptor {
      node_type: "Cron".to_string(),
      inputs: static_inputs(&[]),
      outputs: static_outputs(&[MAIN]),
      is_trigger: true,
      required_parameters: vec![],
      ui_schema: Value::Null,
    },
    || Arc::new(CronNode),
  )?;

  registry.register(
    "ErrorTrigger",
    NodeDescriptor {
      node_type: "ErrorTrigger".to_string(),
      inputs: static_inputs(&[]),
      outputs: static_outputs(&[MAIN]),
      is_trigger: true,
      required_parameters: vec![],
      ui_schema: Value::Null,
    },
    || Arc::new(ErrorTriggerNode),
  )?;

  registry.register(
    "Set",
    NodeDescriptor {
      node_type: "Set".to_string(),
      inputs: static_inputs(&[MAIN]),
      outputs: static_outputs(&[MAIN]),
      is_trigger: false,
      required_parameters: vec![],
      ui_schema: Value::Null,
    },
    || Arc::new(SetNode),
  )?;

  registry.register(
    "HttpRequest",
    NodeDescriptor {
      node_type: "HttpRequest".to_string(),
      inputs: static_inputs(&[MAIN]),
      outputs: static_outputs(&[MAIN]),
      is_trigger: false,
      required_parameters: vec!["url".to_string()],
      ui_schema: Value::Null,
    },
    || Arc::new(HttpRequestNode::default()),
  )?;

  registry.register(
    "Code",
    NodeDescriptor {
      node_type: "Code".to_string(),
      inputs: static_inputs(&[MAIN]),
      outputs: static_outputs(&[MAIN]),
      is_trigger: false,
      required_parameters: vec!["code".to_string()],
      ui_schema: Value::Null,
    },
    move || Arc::new(CodeNode::new(code_limits)),
  )?;

  registry.register(
    "If",
    NodeDescriptor {
      node_type: "If".to_string(),
      inputs: static_inputs(&[MAIN]),
      outputs: static_outputs(&["true", "false"]),
      is_trigger: false,
      required_parameters: vec!["field".to_string(), "operation".to_string()],
      ui_schema: Value::Null,
    },
    || Arc::new(IfNode),
  )?;

  registry.register(
    "Switch",
    NodeDescriptor {
      node_type: "Switch".to_string(),
      inputs: static_inputs(&[MAIN]),
      outputs: OutputSpec::Dynamic(DynamicOutputStrategy::FromCollectionParam {
        param: "rules".to_string(),
        add_fallback: true,
      }),
      is_trigger: false,
      required_parameters: vec!["rules".to_string()],
      ui_schema: Value::Null,
    },
    || Arc::new(SwitchNode),
  )?;

  registry.register(
    "Merge",
    NodeDescriptor {
      node_type: "Merge".to_string(),
      inputs: InputCardinality::Dynamic,
      outputs: static_outputs(&[MAIN]),
      is_trigger: false,
      required_parameters: vec![],
      ui_schema: Value::Null,
    },
    || Arc::new(MergeNode),
  )?;

  registry.register(
    "SplitInBatches",
    NodeDescriptor {
      node_type: "SplitInBatches".to_string(),
      inputs: static_inputs(&[MAIN]),
      outputs: static_outputs(&["loop", "done"]),
      is_trigger: false,
      required_parameters: vec![],
      ui_schema: Value::Null,
    },
    || Arc::new(SplitInBatchesNode),
  )?;

  registry.register(
    "Wait",
    NodeDescriptor {
      node_type: "Wait".to_string(),
      inputs: static_inputs(&[MAIN]),
      outputs: static_outputs(&[MAIN]),
      is_trigger: false,
      required_parameters: vec![],
      ui_schema: Value::Null,
    },
    || Arc::new(WaitNode),
  )?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn registers_every_builtin_type_exactly_once() {
    let mut registry = NodeRegistry::new();
    register_builtins(&mut registry).unwrap();
    let expected = [
      "Start",
      "Webhook",
      "Cron",
      "ErrorTrigger",
      "Set",
      "HttpRequest",
      "Code",
      "If",
      "Switch",
      "Merge",
      "SplitInBatches",
      "Wait",
    ];
    for t in expected {
      assert!(registry.has(t), "missing builtin registration for {t}");
    }
    assert_eq!(registry.list().len(), expected.len());
  }

  #[test]
  fn trigger_types_are_start_webhook_cron_and_error_trigger() {
    let mut registry = NodeRegistry::new();
    register_builtins(&mut registry).unwrap();
    let mut triggers = registry.trigger_types();
    triggers.sort_unstable();
    let mut expected = vec!["Cron", "ErrorTrigger", "Start", "Webhook"];
    expected.sort_unstable();
    assert_eq!(triggers, expected);
  }
}
