use serde_json::{json, Value};

use crate::error::ExpressionError;

/// Intermediate evaluation result.
///
/// `ItemList` is produced only by `$input` and by `$node["Name"].json` — it stands for "a list of
/// items, most naturally indexed, but collapsible to a single scalar when used directly". Indexing
/// (`[k]`) consumes it without collapsing; any other use collapses it to its first element (index
/// 0), matching the convention that a bare node/item reference means "the representative item" (see
/// DESIGN.md, expression engine entry).
#[derive(Debug, Clone)]
pub enum EValue {
  Undefined,
  Json(Value),
  ItemList(Vec<Value>),
  /// Intermediate-only: the result of `$node["Name"]`, before `.json` is applied. Any other use is
  /// an evaluation error.
  NodeRef(Vec<Value>),
}

impl EValue {
  pub fn collapse(self) -> EValue {
    match self {
      EValue::ItemList(items) => items
        .into_iter()
        .next()
        .map(EValue::Json)
        .unwrap_or(EValue::Undefined),
      EValue::NodeRef(_) => EValue::Undefined,
      other => other,
    }
  }

  pub fn into_json(self) -> Value {
    match self.collapse() {
      EValue::Json(v) => v,
      EValue::ItemList(items) => Value::Array(items),
      EValue::Undefined | EValue::NodeRef(_) => Value::Null,
    }
  }

  pub fn is_undefined(&self) -> bool {
    matches!(self, EValue::Undefined)
  }

  /// String form used for template interpolation (: non-whole substitutions stringify). Strings
  /// render unquoted; everything else is JSON-serialized.
  pub fn to_display_string(&self) -> String {
    match self {
      EValue::Undefined => String::new(),
      EValue::Json(Value::String(s)) => s.clone(),
      EValue::Json(v) => v.to_string(),
      EValue::ItemList(items) => match items.first() {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => String::new(),
      },
      EValue::NodeRef(_) => String::new(),
    }
  }

  fn as_f64(&self) -> Option<f64> {
    match self.clone().collapse() {
      EValue::Json(Value::Number(n)) => n.as_f64(),
      EValue::Json(Value::String(s)) => s.parse().ok(),
      EValue::Json(Value::Bool(b)) => Some(if b { 1.0 } else { 0.0 }),
      _ => None,
    }
  }

  fn as_bool(&self) -> bool {
    match self.clone().collapse() {
      EValue::Json(Value::Bool(b)) => b,
      EValue::Json(Value::Null) => false,
      EValue::Json(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
      EValue::Json(Value::String(s)) => !s.is_empty(),
      EValue::Json(Value::Array(a)) => !a.is_empty(),
      EValue::Json(Value::Object(o)) => !o.is_empty(),
      EValue::Undefined => false,
      _ => false,
    }
  }

  fn as_str(&self) -> Option<String> {
    match self.clone().collapse() {
      EValue::Json(Value::String(s)) => Some(s),
      _ => None,
    }
  }
}

pub fn eval_unary_not(v: EValue) -> EValue {
  EValue::Json(Value::Bool(!v.as_bool()))
}

pub fn eval_unary_neg(v: EValue) -> EValue {
  match v.as_f64() {
    Some(n) => EValue::Json(json!(-n)),
    None => EValue::Undefined,
  }
}

pub fn eval_index(base: EValue, index: EValue) -> EValue {
  match base {
    EValue::ItemList(items) | EValue::NodeRef(items) => match index.as_f64() {
      Some(n) if n >= 0.0 => items
        .get(n as usize)
        .cloned()
        .map(EValue::Json)
        .unwrap_or(EValue::Undefined),
      _ => EValue::Undefined,
    },
    EValue::Json(Value::Array(items)) => match index.as_f64() {
      Some(n) if n >= 0.0 => items
        .get(n as usize)
        .cloned()
        .map(EValue::Json)
        .unwrap_or(EValue::Undefined),
      _ => EValue::Undefined,
    },
    EValue::Json(Value::Object(map)) => {
      let key = index.as_str();
      key
        .and_then(|k| map.get(&k).cloned())
        .map(EValue::Json)
        .unwrap_or(EValue::Undefined)
    }
    _ => EValue::Undefined,
  }
}

pub fn eval_member(base: EValue, field: &str) -> EValue {
  match base {
    EValue::NodeRef(items) if field == "json" => EValue::ItemList(items),
    EValue::Json(Value::Object(map)) => map
      .get(field)
      .cloned()
      .map(EValue::Json)
      .unwrap_or(EValue::Undefined),
    _ => EValue::Undefined,
  }
}

/// String/collection helper dispatch for `receiver.method(args)`.
pub fn eval_method_call(
  receiver: EValue,
  method: &str,
  args: Vec<EValue>,
) -> Result<EValue, ExpressionError> {
  // $input.all() / $node["Name"].json.all() — explicit full-list escape
  // hatch from the default collapse-to-first-item behavior.
  if method == "all" {
    return Ok(match receiver {
      EValue::ItemList(items) | EValue::NodeRef(items) => EValue::Json(Value::Array(items)),
      other => EValue::Json(Value::Array(vec![other.into_json()])),
    });
  }

  let collapsed = receiver.collapse();
  match method {
    "trim" => Ok(str_helper(collapsed, |s| s.trim().to_string())),
    "length" => Ok(length_helper(collapsed)),
    "includes" => {
      let needle = args.first().map(|v| v.to_display_string()).unwrap_or_default();
      Ok(match collapsed {
        EValue::Json(Value::String(s)) => EValue::Json(Value::Bool(s.contains(&needle))),
        EValue::Json(Value::Array(items)) => EValue::Json(Value::Bool(
          items.iter().any(|i| i.to_string().trim_matches('"') == needle),
        )),
        _ => EValue::Undefined,
      })
    }
    "split" => {
      let sep = args.first().map(|v| v.to_display_string()).unwrap_or_default();
      Ok(match collapsed {
        EValue::Json(Value::String(s)) => EValue::Json(Value::Array(
          s.split(sep.as_str()).map(|p| json!(p)).collect(),
        )),
        _ => EValue::Undefined,
      })
    }
    "join" => {
      let sep = args.first().map(|v| v.to_display_string()).unwrap_or_default();
      Ok(match collapsed {
        EValue::Json(Value::Array(items)) => EValue::Json(json!(items
          .iter()
          .map(value_to_plain_string)
          .collect::<Vec<_>>()
          .join(&sep))),
        _ => EValue::Undefined,
      })
    }
    "replace" => {
      let from = args.first().map(|v| v.to_display_string()).unwrap_or_default();
      let to = args.get(1).map(|v| v.to_display_string()).unwrap_or_default();
      Ok(match collapsed {
        EValue::Json(Value::String(s)) => EValue::Json(json!(s.replace(&from, &to))),
        _ => EValue::Undefined,
      })
    }
    "substring" => {
      let start = args.first().and_then(|v| v.as_f64()).unwrap_or(0.0).max(0.0) as usize;
      let end = args.get(1).and_then(|v| v.as_f64()).map(|n| n.max(0.0) as usize);
      Ok(match collapsed {
        EValue::Json(Value::String(s)) => {
          let chars: Vec<char> = s.chars().collect();
          let end = end.unwrap_or(chars.len()).min(chars.len());
          let start = start.min(end);
          EValue::Json(json!(chars[start..end].iter().collect::<String>()))
        }
        _ => EValue::Undefined,
      })
    }
    "first" => Ok(match collapsed {
      EValue::Json(Value::Array(items)) => {
        items.into_iter().next().map(EValue::Json).unwrap_or(EValue::Undefined)
      }
      _ => EValue::Undefined,
    }),
    "last" => Ok(match collapsed {
      EValue::Json(Value::Array(items)) => {
        items.into_iter().last().map(EValue::Json).unwrap_or(EValue::Undefined)
      }
      _ => EValue::Undefined,
    }),
    "at" => {
      let idx = args.first().and_then(|v| v.as_f64()).unwrap_or(0.0);
      Ok(eval_index(collapsed, EValue::Json(json!(idx))))
    }
    "isArray" => Ok(EValue::Json(Value::Bool(matches!(
      collapsed,
      EValue::Json(Value::Array(_))
    )))),
    "isEmpty" => Ok(EValue::Json(Value::Bool(match collapsed {
      EValue::Json(Value::Array(items)) => items.is_empty(),
      EValue::Json(Value::String(s)) => s.is_empty(),
      EValue::Json(Value::Object(o)) => o.is_empty(),
      EValue::Undefined => true,
      _ => false,
    }))),
    other => Err(ExpressionError::Eval(format!("unknown helper method '{other}'"))),
  }
}

/// Conversion/reflection/time free functions: `String`, `Number`, `JSON_parse`, `typeof`, `now`.
pub fn eval_free_call(name: &str, args: Vec<EValue>) -> Result<EValue, ExpressionError> {
  match name {
    "String" => Ok(EValue::Json(json!(args
      .into_iter()
      .next()
      .map(|v| v.to_display_string())
      .unwrap_or_default()))),
    "Number" => Ok(match args.into_iter().next().and_then(|v| v.as_f64()) {
      Some(n) => EValue::Json(json!(n)),
      None => EValue::Undefined,
    }),
    "JSON_parse" => {
      let raw = args.first().map(|v| v.to_display_string()).unwrap_or_default();
      serde_json::from_str::<Value>(&raw)
        .map(EValue::Json)
        .map_err(|e| ExpressionError::Eval(format!("JSON_parse failed: {e}")))
    }
    "typeof" => Ok(EValue::Json(json!(match args.into_iter().next() {
      Some(EValue::Undefined) | None => "undefined",
      Some(EValue::Json(Value::Null)) => "null",
      Some(EValue::Json(Value::Bool(_))) => "boolean",
      Some(EValue::Json(Value::Number(_))) => "number",
      Some(EValue::Json(Value::String(_))) => "string",
      Some(EValue::Json(Value::Array(_))) => "array",
      Some(EValue::Json(Value::Object(_))) => "object",
      Some(EValue::ItemList(_)) | Some(EValue::NodeRef(_)) => "array",
    }))),
    "now" => Ok(EValue::Json(json!(chrono::Utc::now().to_rfc3339()))),
    other => Err(ExpressionError::Eval(format!("unknown function '{other}'"))),
  }
}

fn str_helper(v: EValue, f: impl Fn(&str) -> String) -> EValue {
  match v {
    EValue::Json(Value::String(s)) => EValue::Json(json!(f(&s))),
    _ => EValue::Undefined,
  }
}

fn length_helper(v: EValue) -> EValue {
  match v {
    EValue::Json(Value::String(s)) => EValue::Json(json!(s.chars().count())),
    EValue::Json(Value::Array(items)) => EValue::Json(json!(items.len())),
    EValue::Json(Value::Object(map)) => EValue::Json(json!(map.len())),
    _ => EValue::Undefined,
  }
}

fn value_to_plain_string(v: &Value) -> String {
  match v {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

pub fn eval_binary(
  op: crate::ast::BinOp,
  lhs: EValue,
  rhs: EValue,
) -> Result<EValue, ExpressionError> {
  use crate::ast::BinOp::*;

  // Any relational/equality comparison touching an undefined operand is
  // false, never an error.
  if matches!(op, Eq | NotEq | Gt | Gte | Lt | Lte) && (lhs.is_undefined() || rhs.is_undefined()) {
    return Ok(EValue::Json(Value::Bool(op == NotEq)));
  }

  Ok(match op {
    And => EValue::Json(Value::Bool(lhs.as_bool() && rhs.as_bool())),
    Or => EValue::Json(Value::Bool(lhs.as_bool() || rhs.as_bool())),
    Eq => EValue::Json(Value::Bool(values_equal(&lhs, &rhs))),
    NotEq => EValue::Json(Value::Bool(!values_equal(&lhs, &rhs))),
    Gt | Gte | Lt | Lte => match (lhs.as_f64(), rhs.as_f64()) {
      (Some(a), Some(b)) => EValue::Json(Value::Bool(match op {
        Gt => a > b,
        Gte => a >= b,
        Lt => a < b,
        Lte => a <= b,
        _ => unreachable!(),
      })),
      _ => {
        let (a, b) = (lhs.to_display_string(), rhs.to_display_string());
        EValue::Json(Value::Bool(match op {
          Gt => a > b,
          Gte => a >= b,
          Lt => a < b,
          Lte => a <= b,
          _ => unreachable!(),
        }))
      }
    },
    Add => match (lhs.clone().collapse(), rhs.clone().collapse()) {
      (EValue::Json(Value::String(_)), _) | (_, EValue::Json(Value::String(_))) => {
        EValue::Json(json!(format!(
          "{}{}",
          lhs.to_display_string(),
          rhs.to_display_string()
        )))
      }
      _ => match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => EValue::Json(json!(a + b)),
        _ => EValue::Undefined,
      },
    },
    Sub => arith(lhs, rhs, |a, b| a - b),
    Mul => arith(lhs, rhs, |a, b| a * b),
    Div => arith(lhs, rhs, |a, b| a / b),
    Mod => arith(lhs, rhs, |a, b| a % b),
  })
}

fn arith(lhs: EValue, rhs: EValue, f: impl Fn(f64, f64) -> f64) -> EValue {
  match (lhs.as_f64(), rhs.as_f64()) {
    (Some(a), Some(b)) => EValue::Json(json!(f(a, b))),
    _ => EValue::Undefined,
  }
}

fn values_equal(lhs: &EValue, rhs: &EValue) -> bool {
  match (lhs.clone().collapse(), rhs.clone().collapse()) {
    (EValue::Json(a), EValue::Json(b)) => a == b,
    (EValue::Undefined, EValue::Undefined) => true,
    _ => false,
  }
}
