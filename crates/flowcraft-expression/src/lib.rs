//! Expression engine: resolves `{{ }}` templates against execution context. n8n-compatible dialect:
//! `$json`, `$input`, `$node`, `$env`, `$execution`, `$runIndex`, `$itemIndex`, plus a small helper
//! library (string/collection/conversion/time/reflection).

mod ast;
mod context;
mod error;
mod evaluator;
mod lexer;
mod parser;
mod template;
mod value;

pub use context::EvalContext;
pub use error::ExpressionError;
pub use template::{Template, TemplateCache};
pub use value::EValue;

use serde_json::{Map, Value};

/// How resolution reacts to a malformed or failing expression ("Edge policy"). Strict is opt-in per
/// node/workflow setting; lenient is the default so a single bad template doesn't crash the whole
/// run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
  Lenient,
  Strict,
}

/// Resolves every string template inside a parameter tree.
///
/// Walks `params` recursively: string leaves are parsed/evaluated as templates, other JSON types
/// pass through unchanged. In `Lenient` mode a parse/eval failure substitutes an empty string and
/// is reported as a warning string (not raised); in `Strict` mode it short-circuits with the first
/// `ExpressionError` encountered.
pub fn resolve_parameters(
  params: &Value,
  ctx: &EvalContext<'_>,
  cache: &TemplateCache,
  mode: ResolutionMode,
) -> Result<(Value, Vec<String>), ExpressionError> {
  let mut warnings = Vec::new();
  let resolved = resolve_value(params, ctx, cache, mode, &mut warnings)?;
  Ok((resolved, warnings))
}

fn resolve_value(
  value: &Value,
  ctx: &EvalContext<'_>,
  cache: &TemplateCache,
  mode: ResolutionMode,
  warnings: &mut Vec<String>,
) -> Result<Value, ExpressionError> {
  match value {
    Value::String(s) => resolve_string(s, ctx, cache, mode, warnings),
    Value::Array(items) => {
      let mut out = Vec::with_capacity(items.len());
      for item in items {
        out.push(resolve_value(item, ctx, cache, mode, warnings)?);
      }
      Ok(Value::Array(out))
    }
    Value::Object(map) => {
      let mut out = Map::with_capacity(map.len());
      for (k, v) in map {
        out.insert(k.clone(), resolve_value(v, ctx, cache, mode, warnings)?);
      }
      Ok(Value::Object(out))
    }
    other => Ok(other.clone()),
  }
}

fn resolve_string(
  source: &str,
  ctx: &EvalContext<'_>,
  cache: &TemplateCache,
  mode: ResolutionMode,
  warnings: &mut Vec<String>,
) -> Result<Value, ExpressionError> {
  if !source.contains("{{") {
    return Ok(Value::String(source.to_string()));
  }
  let outcome = cache.get_or_parse(source).and_then(|t| t.resolve(ctx));
  match outcome {
    Ok(v) => Ok(v),
    Err(e) if mode == ResolutionMode::Strict => Err(e),
    Err(e) => {
      warnings.push(format!("expression in '{source}' failed: {e}"));
      Ok(Value::String(String::new()))
    }
  }
}
