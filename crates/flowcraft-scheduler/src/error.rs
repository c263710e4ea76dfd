use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
  #[error("start node '{0}' not found in workflow")]
  UnknownStartNode(String),

  #[error(transparent)]
  Kernel(#[from] flowcraft_kernel::KernelError),
}
