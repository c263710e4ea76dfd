use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How many inputs a node type accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputCardinality {
  /// A fixed, named set of inputs (most nodes: `["main"]`).
  Static(Vec<String>),
  /// Accepts an arbitrary number of incoming connections (Merge).
  Dynamic,
}

/// How a node type's outputs are determined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputSpec {
  /// A fixed, named set of outputs (e.g. If: `["true", "false"]`).
  Static(Vec<String>),
  /// Outputs are derived at validation/construction time from a parameter.
  Dynamic(DynamicOutputStrategy),
}

/// Strategies for deriving a dynamic output set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DynamicOutputStrategy {
  /// One output per entry of a collection-valued parameter (Switch rules), e.g. `output0..outputN`,
  /// optionally plus a fallback output.
  FromCollectionParam {
    param: String,
    add_fallback: bool,
  },
  /// Exactly `n` numbered outputs.
  Fixed(usize),
}

/// Static metadata about a registered node type, consumed by the kernel (for I/O shape) and by
/// external collaborators (UI form generation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDescriptor {
  pub node_type: String,
  pub inputs: InputCardinality,
  pub outputs: OutputSpec,
  /// `true` for Start/Webhook/Cron/ErrorTrigger-style entry points ("Trigger node"). Used by the
  /// validator's BFS reachability check.
  pub is_trigger: bool,
  /// Parameter keys the validator treats as required ("missing required parameter").
  #[serde(default)]
  pub required_parameters: Vec<String>,
  /// Opaque UI property schema; the engine never inspects this — it is forwarded verbatim to
  /// external collaborators ("node-type schema delivery for UI form generation").
  #[serde(default)]
  pub ui_schema: Value,
}

impl NodeDescriptor {
  /// Whether `input_name` is one this node type's input cardinality allows.
  pub fn accepts_input(&self, input_name: &str) -> bool {
    match &self.inputs {
      InputCardinality::Dynamic => true,
      InputCardinality::Static(names) => names.iter().any(|n| n == input_name),
    }
  }

  /// Resolve this descriptor's outputs against a node's resolved parameters, for the
  /// `FromCollectionParam` strategy.
  pub fn resolve_outputs(&self, parameters: &serde_json::Map<String, Value>) -> Vec<String> {
    match &self.outputs {
      OutputSpec::Static(names) => names.clone(),
      OutputSpec::Dynamic(DynamicOutputStrategy::Fixed(n)) => {
        (0..*n).map(|i| format!("output{i}")).collect()
      }
      OutputSpec::Dynamic(DynamicOutputStrategy::FromCollectionParam { param, add_fallback }) => {
        let count = parameters
          .get(param)
          .and_then(Value::as_array)
          .map(Vec::len)
          .unwrap_or(0);
        let mut names: Vec<String> = (0..count).map(|i| format!("output{i}")).collect();
        if *add_fallback {
          names.push("fallback".to_string());
        }
        names
      }
    }
  }
}
