//! Sandboxed Lua execution for the Code node.

mod error;
mod limits;
mod sandbox;

pub use error::SandboxError;
pub use limits::SandboxLimits;
pub use sandbox::CodeSandbox;

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use flowcraft_model::NodeData;
  use serde_json::json;

  use super::*;

  #[test]
  fn script_can_transform_items() {
    let sandbox = CodeSandbox::new(SandboxLimits::default());
    let items = vec![
      NodeData::from_json(json!({"n": 1})),
      NodeData::from_json(json!({"n": 2})),
    ];
    let script = r#"
      local out = {}
      for i, item in ipairs(items) do
        out[i] = { n = item.n * 2 }
      end
      return out
    "#;
    let result = sandbox.run(script, &items, &HashMap::new()).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].json, json!({"n": 2}));
    assert_eq!(result[1].json, json!({"n": 4}));
  }

  #[test]
  fn runtime_error_is_reported() {
    let sandbox = CodeSandbox::new(SandboxLimits::default());
    let err = sandbox.run("error('boom')", &[], &HashMap::new()).unwrap_err();
    assert!(matches!(err, SandboxError::Runtime(_)));
  }

  #[test]
  fn filesystem_access_is_unavailable() {
    let sandbox = CodeSandbox::new(SandboxLimits::default());
    let err = sandbox
      .run("return io.open('/etc/passwd')", &[], &HashMap::new())
      .unwrap_err();
    assert!(matches!(err, SandboxError::Runtime(_)));
  }

  #[test]
  fn runaway_loop_hits_instruction_budget() {
    let sandbox = CodeSandbox::new(SandboxLimits {
      max_instructions: 5_000,
      max_memory_bytes: 16 * 1024 * 1024,
    });
    let err = sandbox
      .run("local x = 0 while true do x = x + 1 end", &[], &HashMap::new())
      .unwrap_err();
    assert!(matches!(err, SandboxError::Timeout(_)));
  }

  #[test]
  fn env_table_is_readable() {
    let sandbox = CodeSandbox::new(SandboxLimits::default());
    let mut env = HashMap::new();
    env.insert("STAGE".to_string(), "prod".to_string());
    let result = sandbox
      .run("return { stage = env.STAGE }", &[], &env)
      .unwrap();
    assert_eq!(result[0].json, json!({"stage": "prod"}));
  }
}
