use flowcraft_validator::ValidationIssue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("workflow has no trigger nodes to start from")]
  NoStartNode,

  #[error("workflow failed validation: {0:?}")]
  Validation(Vec<ValidationIssue>),

  #[error(transparent)]
  Scheduler(#[from] flowcraft_scheduler::SchedulerError),

  #[error(transparent)]
  Recorder(#[from] flowcraft_recorder::RecorderError),

  #[error("invalid configuration: {0}")]
  Config(#[from] toml::de::Error),

  #[error("failed to read configuration file: {0}")]
  ConfigIo(#[source] std::io::Error),
}
