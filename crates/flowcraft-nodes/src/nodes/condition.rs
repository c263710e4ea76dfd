use serde_json::Value;

/// Shared condition evaluation for `If` and `Switch` (operation set `{equals, notEquals, contains,
/// gt, gte, lt, lte, isEmpty, isNotEmpty, isTrue, isFalse, regex}`).
///
/// A condition is `{ field, operation, value }`, where `field` and `value` have already been
/// template-resolved to plain JSON by the caller.
pub fn evaluate(field: &Value, operation: &str, value: &Value) -> bool {
  match operation {
    "equals" => values_equal(field, value),
    "notEquals" => !values_equal(field, value),
    "contains" => match field {
      Value::String(s) => value.as_str().map(|v| s.contains(v)).unwrap_or(false),
      Value::Array(items) => items.contains(value),
      _ => false,
    },
    "gt" => compare(field, value).map(|o| o.is_gt()).unwrap_or(false),
    "gte" => compare(field, value).map(|o| o.is_ge()).unwrap_or(false),
    "lt" => compare(field, value).map(|o| o.is_lt()).unwrap_or(false),
    "lte" => compare(field, value).map(|o| o.is_le()).unwrap_or(false),
    "isEmpty" => is_empty(field),
    "isNotEmpty" => !is_empty(field),
    "isTrue" => matches!(field, Value::Bool(true)),
    "isFalse" => matches!(field, Value::Bool(false)),
    "regex" => match (field.as_str(), value.as_str()) {
      (Some(s), Some(pattern)) => regex::Regex::new(pattern).map(|re| re.is_match(s)).unwrap_or(false),
      _ => false,
    },
    _ => false,
  }
}

fn values_equal(a: &Value, b: &Value) -> bool {
  if a == b {
    return true;
  }
  // Loose string/number comparison, matching the expression engine's
  // lenient arithmetic coercion (flowcraft-expression::value::as_f64).
  match (a.as_str(), b.as_str()) {
    (Some(a), Some(b)) => a == b,
    _ => false,
  }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
  match (a.as_f64(), b.as_f64()) {
    (Some(a), Some(b)) => a.partial_cmp(&b),
    _ => match (a.as_str(), b.as_str()) {
      (Some(a), Some(b)) => Some(a.cmp(b)),
      _ => None,
    },
  }
}

/// Resolves a dot-notation field path (e.g. `"user.profile.age"`) against an item's JSON ("If":
/// "Field path supports dot-notation"). Array segments that parse as an index select that element;
/// a missing or unindexable segment yields `Value::Null` ("undefined", edge policy), never an
/// error.
pub fn resolve_field_path(json: &Value, path: &str) -> Value {
  if path.is_empty() {
    return json.clone();
  }
  let mut current = json;
  for segment in path.split('.') {
    current = match current {
      Value::Object(map) => match map.get(segment) {
        Some(v) => v,
        None => return Value::Null,
      },
      Value::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
        Some(v) => v,
        None => return Value::Null,
      },
      _ => return Value::Null,
    };
  }
  current.clone()
}

fn is_empty(v: &Value) -> bool {
  match v {
    Value::Null => true,
    Value::String(s) => s.is_empty(),
    Value::Array(a) => a.is_empty(),
    Value::Object(o) => o.is_empty(),
    _ => false,
  }
}
