use flowcraft_model::NodeData;

/// One unit of work on the scheduler's FIFO queue ("Entry" / "Step loop"): a node to run and the
/// items it should see as its input.
#[derive(Debug)]
pub struct Job {
  pub node_name: String,
  pub input_items: Vec<NodeData>,
}
