use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecorderError {
  #[error("no execution record found for id '{0}'")]
  NotFound(String),
}
