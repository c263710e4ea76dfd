use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use flowcraft_kernel::{NodeKernel, NodeRunOutcome};
use flowcraft_model::{Connection, ExecutionContext, ExecutionError, NodeData, Payload, Workflow};
use flowcraft_recorder::{ExecutionNotifier, NoopNotifier};
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::error::SchedulerError;
use crate::job::Job;

/// Drives one execution's FIFO job queue to completion.
///
/// Holds no per-execution state itself — everything the step loop needs to resume (the queue, join
/// buffers, run counts) lives in the [`ExecutionContext`] passed to [`Scheduler::run`], so distinct
/// executions share nothing but this struct's `Arc<NodeKernel>` ("Cross-execution"). The notifier
/// is called around each node run so progress streams live rather than being reconstructed after
/// the fact from the final context ("Recorder event stream").
pub struct Scheduler {
  kernel: Arc<NodeKernel>,
  notifier: Arc<dyn ExecutionNotifier>,
}

impl Scheduler {
  pub fn new(kernel: Arc<NodeKernel>) -> Self {
    Self {
      kernel,
      notifier: Arc::new(NoopNotifier),
    }
  }

  pub fn with_notifier(kernel: Arc<NodeKernel>, notifier: Arc<dyn ExecutionNotifier>) -> Self {
    Self { kernel, notifier }
  }

  /// Runs `startNode(initialItems)` to completion ("Entry" / "Step loop" / "Termination").
  /// Cancellation is checked between jobs; the currently running node is never pre-empted.
  #[instrument(name = "scheduler_run", skip(self, ctx, initial_items, cancel), fields(execution_id = %ctx.execution_id))]
  pub async fn run(
    &self,
    mut ctx: ExecutionContext,
    start_node: &str,
    initial_items: Vec<NodeData>,
    cancel: CancellationToken,
  ) -> Result<ExecutionContext, SchedulerError> {
    if ctx.workflow.node(start_node).is_none() {
      return Err(SchedulerError::UnknownStartNode(start_node.to_string()));
    }

    let back_edges = ctx.workflow.loop_back_edges();
    let reachable = reachable_from(&ctx.workflow, &back_edges, start_node);

    let mut queue: VecDeque<Job> = VecDeque::new();
    queue.push_back(Job {
      node_name: start_node.to_string(),
      input_items: initial_items,
    });

    while let Some(job) = queue.pop_front() {
      if cancel.is_cancelled() {
        ctx.errors.push(ExecutionError {
          node_name: job.node_name.clone(),
          message: "execution cancelled".to_string(),
          timestamp: Utc::now(),
        });
        break;
      }

      let Some(node_def) = ctx.workflow.node(&job.node_name).cloned() else {
        warn!(node = %job.node_name, "dropping job for a node absent from the workflow");
        continue;
      };

      self.notifier.notify(flowcraft_recorder::ExecutionEvent::NodeStart {
        execution_id: ctx.execution_id.clone(),
        node_name: job.node_name.clone(),
        node_type: node_def.node_type.clone(),
        timestamp: Utc::now(),
      });
      let started_at = Instant::now();

      let outcome = self
        .kernel
        .run_node(&mut ctx, &node_def, &job.input_items, cancel.clone())
        .await?;
      let duration_ms = started_at.elapsed().as_millis() as u64;

      let outputs = match &outcome {
        NodeRunOutcome::Completed(outputs) => {
          self.notifier.notify(flowcraft_recorder::ExecutionEvent::NodeComplete {
            execution_id: ctx.execution_id.clone(),
            node_name: job.node_name.clone(),
            data: serde_json::to_value(outputs.values().flat_map(|p| p.items().unwrap_or(&[])).collect::<Vec<_>>())
              .unwrap_or(serde_json::Value::Null),
            duration_ms,
            timestamp: Utc::now(),
          });
          outputs.clone()
        }
        NodeRunOutcome::ContinuedWithError(outputs, message) => {
          self.notifier.notify(flowcraft_recorder::ExecutionEvent::NodeError {
            execution_id: ctx.execution_id.clone(),
            node_name: job.node_name.clone(),
            error: message.clone(),
            timestamp: Utc::now(),
          });
          outputs.clone()
        }
        // A failed node's outputs are already the dead-branch set the kernel built for every
        // declared output — delivering them below releases any waiting joins without this
        // scheduler needing its own failure branch.
        NodeRunOutcome::Failed(outputs, message) => {
          self.notifier.notify(flowcraft_recorder::ExecutionEvent::NodeError {
            execution_id: ctx.execution_id.clone(),
            node_name: job.node_name.clone(),
            error: message.clone(),
            timestamp: Utc::now(),
          });
          outputs.clone()
        }
      };

      let mut output_names: Vec<&String> = outputs.keys().collect();
      output_names.sort();
      for name in output_names {
        let payload = outputs[name].clone();
        let conns: Vec<Connection> = ctx.workflow.outgoing(&job.node_name, name).cloned().collect();
        for conn in conns {
          self.deliver(&mut ctx, &reachable, &back_edges, &conn, payload.clone(), &mut queue);
        }
      }
    }

    Ok(ctx)
  }

  /// `deliver(target, edgeKey, payload)`. Loop back-edges bypass the join buffer entirely and
  /// re-enqueue the controller directly with the loop items ("Loops"). A dead branch arriving on a
  /// back-edge means the loop body's own branch died on the final iteration (its "loop" input went
  /// dead) — the controller already did its last real work when it emitted `"done"`, so this does
  /// not re-enter it.
  fn deliver(
    &self,
    ctx: &mut ExecutionContext,
    reachable: &HashSet<String>,
    back_edges: &HashSet<Connection>,
    conn: &Connection,
    payload: Payload,
    queue: &mut VecDeque<Job>,
  ) {
    if back_edges.contains(conn) {
      if payload.is_dead() {
        return;
      }
      let items = payload.into_items().unwrap_or_default();
      queue.push_back(Job {
        node_name: conn.target_node.clone(),
        input_items: items,
      });
      return;
    }

    ctx
      .pending_inputs
      .entry(conn.target_node.clone())
      .or_default()
      .insert(conn.edge_key(), payload);

    let expected = expected_edges(&ctx.workflow, reachable, back_edges, &conn.target_node);
    let Some(buffer) = ctx.pending_inputs.get(&conn.target_node) else {
      return;
    };
    if !expected.iter().all(|key| buffer.contains_key(key)) {
      return; // still waiting on other edges (invariant 3)
    }

    let all_dead = expected
      .iter()
      .all(|key| buffer.get(key).map(Payload::is_dead).unwrap_or(false));
    let merged: Option<Vec<NodeData>> = if all_dead {
      None
    } else {
      let mut merged = Vec::new();
      for key in &expected {
        if let Some(items) = buffer.get(key).and_then(Payload::items) {
          merged.extend_from_slice(items);
        }
      }
      Some(merged)
    };

    ctx.pending_inputs.remove(&conn.target_node); // invariant 4

    match merged {
      Some(items) => queue.push_back(Job {
        node_name: conn.target_node.clone(),
        input_items: items,
      }),
      None => self.propagate_dead(ctx, reachable, back_edges, &conn.target_node, queue),
    }
  }

  /// A node whose every incoming edge died recursively kills its own outputs, so downstream joins
  /// waiting on it are released too ("Reachable fan-in"; state machine's `any -> DEAD` transition).
  fn propagate_dead(
    &self,
    ctx: &mut ExecutionContext,
    reachable: &HashSet<String>,
    back_edges: &HashSet<Connection>,
    node: &str,
    queue: &mut VecDeque<Job>,
  ) {
    let conns: Vec<Connection> = ctx
      .workflow
      .connections
      .iter()
      .filter(|c| c.source_node == node)
      .cloned()
      .collect();
    for conn in conns {
      self.deliver(ctx, reachable, back_edges, &conn, Payload::DeadBranch, queue);
    }
  }
}

/// Connections into `target` that a join must wait on: excludes genuine loop back-edges (handled
/// outside the join buffer, see [`Workflow::loop_back_edges`]) and edges whose source is not
/// structurally reachable from the run's start node, so a join never waits forever on a branch that
/// can never fire at all ("Reachable fan-in").
fn expected_edges(
  workflow: &Workflow,
  reachable: &HashSet<String>,
  back_edges: &HashSet<Connection>,
  target: &str,
) -> Vec<String> {
  let mut keys: Vec<String> = Vec::new();
  for conn in workflow.incoming(target) {
    if back_edges.contains(conn) {
      continue;
    }
    if !reachable.contains(conn.source_node.as_str()) {
      continue;
    }
    let key = conn.edge_key();
    if !keys.contains(&key) {
      keys.push(key);
    }
  }
  keys
}

/// BFS over non-back edges from `start`, computed once per run. A controller's own `"loop"`
/// dispatch edge is an ordinary forward edge here — only the genuine re-entry edge is excluded, so
/// the loop body stays reachable ("Reachable fan-in").
fn reachable_from(workflow: &Workflow, back_edges: &HashSet<Connection>, start: &str) -> HashSet<String> {
  let mut seen: HashSet<String> = HashSet::new();
  let mut queue: VecDeque<String> = VecDeque::new();
  if workflow.node(start).is_some() {
    seen.insert(start.to_string());
    queue.push_back(start.to_string());
  }
  while let Some(current) = queue.pop_front() {
    for conn in workflow
      .connections
      .iter()
      .filter(|c| c.source_node == current && !back_edges.contains(c))
    {
      if seen.insert(conn.target_node.clone()) {
        queue.push_back(conn.target_node.clone());
      }
    }
  }
  seen
}
