use std::collections::HashMap;
use std::sync::Arc;

use flowcraft_kernel::NodeKernel;
use flowcraft_model::{ExecutionContext, ExecutionMode, NodeData, NodeDefinition, Workflow};
use flowcraft_recorder::{ExecutionNotifier, Recorder};
use flowcraft_registry::NodeRegistry;
use flowcraft_scheduler::Scheduler;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Top-level facade wiring the node registry, validator, FIFO scheduler and execution recorder into
/// the single entry point the CLI (and, eventually, a REST layer) calls. Accepts an explicit
/// `(workflow, start_node, initial_items, mode)` tuple rather than deriving a single trigger
/// payload, so a run can start from any declared trigger.
pub struct Engine {
  registry: Arc<NodeRegistry>,
  scheduler: Scheduler,
  recorder: Arc<Recorder>,
  /// Cancellation handles for executions currently in flight, keyed by execution id, so `cancel`
  /// can reach a run from the outside.
  active: Mutex<HashMap<String, CancellationToken>>,
}

impl Engine {
  pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
    let mut registry = NodeRegistry::new();
    flowcraft_nodes::register_builtins_with_limits(&mut registry, config.sandbox_limits())
      .expect("built-in node registrations must not collide");
    let registry = Arc::new(registry);

    let kernel = Arc::new(NodeKernel::new(registry.clone()));
    let recorder = Arc::new(Recorder::new(config.recorder_capacity));
    let notifier: Arc<dyn ExecutionNotifier> = recorder.clone();
    let scheduler = Scheduler::with_notifier(kernel, notifier);

    Ok(Self {
      registry,
      scheduler,
      recorder,
      active: Mutex::new(HashMap::new()),
    })
  }

  /// Shared handle to the execution history and event stream, so a caller can subscribe to progress
  /// or list past executions.
  pub fn recorder(&self) -> &Arc<Recorder> {
    &self.recorder
  }

  /// The first trigger node in declaration order ("findStartNode").
  pub fn find_start_node(&self, workflow: &Workflow) -> Option<NodeDefinition> {
    workflow
      .nodes
      .iter()
      .find(|node| {
        self
          .registry
          .describe(&node.node_type)
          .map(|d| d.is_trigger)
          .unwrap_or(false)
      })
      .cloned()
  }

  /// Validates, then runs, a workflow to completion ("run"). Validation failures never reach the
  /// scheduler.
  #[instrument(name = "engine_run", skip(self, workflow, initial_items), fields(workflow_id = %workflow.id))]
  pub async fn run(
    &self,
    workflow: Workflow,
    start_node: &str,
    initial_items: Vec<NodeData>,
    mode: ExecutionMode,
  ) -> Result<ExecutionContext, EngineError> {
    let report = flowcraft_validator::validate(&workflow, &self.registry);
    if !report.is_valid() {
      return Err(EngineError::Validation(report.errors));
    }

    let execution_id = uuid::Uuid::new_v4().to_string();
    self.recorder.start(&execution_id, &workflow.id, &workflow.name, mode);

    let cancel = CancellationToken::new();
    self.active.lock().insert(execution_id.clone(), cancel.clone());

    let ctx = ExecutionContext::new(workflow, execution_id.clone(), mode);
    let result = self.scheduler.run(ctx, start_node, initial_items, cancel.clone()).await;
    self.active.lock().remove(&execution_id);

    match result {
      Ok(ctx) => {
        if ctx.succeeded() {
          let _ = self.recorder.complete(&execution_id);
        } else if cancel.is_cancelled() {
          let _ = self.recorder.cancel(&execution_id);
        } else {
          let _ = self.recorder.fail(&execution_id);
        }
        Ok(ctx)
      }
      Err(e) => {
        let _ = self.recorder.fail(&execution_id);
        Err(e.into())
      }
    }
  }

  /// Requests cancellation of an in-flight execution; the scheduler checks between jobs, never
  /// pre-empting a running node. Returns `false` if the execution is unknown or already finished.
  pub fn cancel(&self, execution_id: &str) -> bool {
    match self.active.lock().get(execution_id) {
      Some(token) => {
        token.cancel();
        true
      }
      None => false,
    }
  }
}
