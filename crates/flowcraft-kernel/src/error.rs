use thiserror::Error;

#[derive(Debug, Error)]
pub enum KernelError {
  #[error("unknown node type '{0}'")]
  UnknownType(String),

  #[error("parameter resolution failed: {0}")]
  Expression(#[from] flowcraft_expression::ExpressionError),
}
