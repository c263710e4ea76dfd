use thiserror::Error;

/// Errors raised by the node registry.
#[derive(Debug, Error)]
pub enum RegistryError {
  /// A type was registered twice.
  #[error("node type '{0}' is already registered")]
  DuplicateType(String),
  /// A workflow referenced a type that was never registered.
  #[error("unknown node type: {0}")]
  UnknownType(String),
}
