use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::ast::Expr;
use crate::context::EvalContext;
use crate::error::ExpressionError;
use crate::evaluator::eval;
use crate::parser::parse;

/// Upper bound on `{{ }}` occurrences in a single template, a DoS guard against pathological
/// parameter values (adapted from the same guard in the expression crate this engine's architecture
/// was modeled on).
const MAX_TEMPLATE_EXPRESSIONS: usize = 1000;

#[derive(Debug, Clone)]
enum Part {
  Static(String),
  Expression(Expr),
}

/// A parsed template: either a single `{{ expr }}` token (in which case resolution yields the
/// expression's typed value) or a mix of literal text and embedded expressions (resolution yields a
/// string).
#[derive(Debug, Clone)]
pub struct Template {
  parts: Vec<Part>,
  /// True when the entire (trimmed) source is exactly one `{{ }}` token.
  whole_value: bool,
}

impl Template {
  pub fn parse(source: &str) -> Result<Self, ExpressionError> {
    let trimmed = source.trim();
    if let Some(inner) = whole_token(trimmed) {
      let expr = parse(inner)?;
      return Ok(Template {
        parts: vec![Part::Expression(expr)],
        whole_value: true,
      });
    }

    let mut parts = Vec::new();
    let mut rest = source;
    let mut count = 0;
    while let Some(start) = rest.find("{{") {
      if start > 0 {
        parts.push(Part::Static(rest[..start].to_string()));
      }
      let after_open = &rest[start + 2..];
      let Some(end) = after_open.find("}}") else {
        // Unterminated `{{` — treat the rest as literal text.
        parts.push(Part::Static(rest[start..].to_string()));
        rest = "";
        break;
      };
      count += 1;
      if count > MAX_TEMPLATE_EXPRESSIONS {
        return Err(ExpressionError::TooManyExpressions(MAX_TEMPLATE_EXPRESSIONS));
      }
      let body = &after_open[..end];
      parts.push(Part::Expression(parse(body)?));
      rest = &after_open[end + 2..];
    }
    if !rest.is_empty() {
      parts.push(Part::Static(rest.to_string()));
    }
    Ok(Template {
      parts,
      whole_value: false,
    })
  }

  /// Whether this template contains no `{{ }}` tokens at all (pure literal).
  pub fn is_literal(&self) -> bool {
    self.parts.iter().all(|p| matches!(p, Part::Static(_)))
  }

  pub fn resolve(&self, ctx: &EvalContext<'_>) -> Result<Value, ExpressionError> {
    if self.whole_value {
      if let Some(Part::Expression(expr)) = self.parts.first() {
        return Ok(eval(expr, ctx)?.into_json());
      }
    }
    let mut out = String::new();
    for part in &self.parts {
      match part {
        Part::Static(s) => out.push_str(s),
        Part::Expression(expr) => out.push_str(&eval(expr, ctx)?.to_display_string()),
      }
    }
    Ok(Value::String(out))
  }
}

fn whole_token(trimmed: &str) -> Option<&str> {
  let inner = trimmed.strip_prefix("{{")?.strip_suffix("}}")?;
  // Reject if there's another `}}`/`{{` pair inside — that means multiple
  // tokens concatenated with no literal text between them, which still
  // resolves as a string join, not a single typed value.
  if inner.contains("}}") || inner.contains("{{") {
    return None;
  }
  Some(inner)
}

/// Small bounded cache of parsed templates, keyed by source text.
///
/// Workflows re-evaluate the same parameter template once per input item; caching the parse avoids
/// re-tokenizing/re-parsing on every item.
pub struct TemplateCache {
  entries: Mutex<HashMap<String, Template>>,
  capacity: usize,
}

impl TemplateCache {
  pub fn new(capacity: usize) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      capacity,
    }
  }

  pub fn get_or_parse(&self, source: &str) -> Result<Template, ExpressionError> {
    {
      let entries = self.entries.lock().expect("template cache poisoned");
      if let Some(t) = entries.get(source) {
        return Ok(t.clone());
      }
    }
    let template = Template::parse(source)?;
    let mut entries = self.entries.lock().expect("template cache poisoned");
    if entries.len() >= self.capacity {
      entries.clear();
    }
    entries.insert(source.to_string(), template.clone());
    Ok(template)
  }
}

impl Default for TemplateCache {
  fn default() -> Self {
    Self::new(512)
  }
}
