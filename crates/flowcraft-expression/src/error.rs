use thiserror::Error;

/// Errors raised while parsing or evaluating a `{{ }}` expression.
///
/// In lenient mode (the default, "Edge policy") the resolver never propagates this — it substitutes
/// the empty string and records a warning. Strict mode escalates it to the kernel as a
/// `NodeExecutionError`.
#[derive(Debug, Error)]
pub enum ExpressionError {
  #[error("parse error at offset {offset}: {message}")]
  Parse { message: String, offset: usize },

  #[error("evaluation error: {0}")]
  Eval(String),

  #[error("too many expressions in one template (max {0})")]
  TooManyExpressions(usize),
}
