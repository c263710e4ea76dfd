use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use flowcraft_model::NodeData;
use mlua::{HookTriggers, Lua, LuaOptions, StdLib};
use serde_json::Value;

use crate::error::SandboxError;
use crate::limits::SandboxLimits;

/// Isolated Lua environment for the Code node.
///
/// Standard library is cut down to string/table/math — no `os`, `io`, or `package`, so a script
/// cannot touch the filesystem or spawn processes ("Code" node's isolation guarantee). A fresh
/// `Lua` instance is built per run: state never leaks between script executions.
pub struct CodeSandbox {
  limits: SandboxLimits,
}

impl CodeSandbox {
  pub fn new(limits: SandboxLimits) -> Self {
    Self { limits }
  }

  /// Runs `script` against `items`, exposed to the script as the global table `items` (each entry
  /// is one item's `json`). The script's return value becomes the node's output items: an array
  /// return yields one item per element, any other return yields a single item.
  ///
  /// Deliberately gives the script no `env` global and no other host-derived input: spec.md §4.7/§5
  /// require the Code sandbox have "no environment" and "no access to ... the host", so there is
  /// nothing here for a script to read process environment variables (secrets, credentials) from.
  ///
  /// This call blocks the calling thread on Lua execution — run it via
  /// `tokio::task::spawn_blocking` from async callers (the kernel does).
  pub fn run(&self, script: &str, items: &[NodeData]) -> Result<Vec<NodeData>, SandboxError> {
    let lua = Lua::new_with(
      StdLib::STRING | StdLib::TABLE | StdLib::MATH,
      LuaOptions::new(),
    )
    .map_err(|e| SandboxError::Compile(e.to_string()))?;

    lua
      .set_memory_limit(self.limits.max_memory_bytes)
      .map_err(|e| SandboxError::Compile(e.to_string()))?;

    let executed = Arc::new(AtomicU64::new(0));
    let limit = self.limits.max_instructions;
    let counter = executed.clone();
    lua.set_hook(
      HookTriggers::every_nth_instruction(1000),
      move |_lua, _debug| {
        let total = counter.fetch_add(1000, Ordering::Relaxed) + 1000;
        if total >= limit {
          return Err(mlua::Error::RuntimeError(
            "instruction budget exceeded".to_string(),
          ));
        }
        Ok(())
      },
    );

    let items_json: Vec<Value> = items.iter().map(|d| d.json.clone()).collect();
    let items_value = lua
      .to_value(&items_json)
      .map_err(|e| SandboxError::Compile(e.to_string()))?;
    lua
      .globals()
      .set("items", items_value)
      .map_err(|e| SandboxError::Compile(e.to_string()))?;

    let result: mlua::Value = lua.load(script).eval().map_err(|e| {
      if e.to_string().contains("instruction budget exceeded") {
        SandboxError::Timeout(limit)
      } else {
        SandboxError::Runtime(e.to_string())
      }
    })?;

    let output: Value = lua
      .from_value(result)
      .map_err(|e| SandboxError::InvalidOutput(e.to_string()))?;

    let out_items = match output {
      Value::Array(items) => items,
      Value::Null => Vec::new(),
      other => vec![other],
    };
    Ok(out_items.into_iter().map(NodeData::from_json).collect())
  }
}
