use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use flowcraft_engine::{Engine, EngineConfig};
use flowcraft_model::{ExecutionMode, NodeData, Workflow};

/// flowcraft - a DAG-based workflow automation engine
#[derive(Parser)]
#[command(name = "flowcraft")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.flowcraft)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow or a single node from it
  Run {
    #[command(subcommand)]
    target: RunTarget,
  },
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run an entire workflow, starting from its first trigger node
  Workflow {
    /// Path to the workflow definition file (JSON)
    workflow_file: PathBuf,
  },

  /// Run a single node from a workflow, ignoring the rest of the graph
  Node {
    /// Path to the workflow definition file (JSON)
    workflow_file: PathBuf,

    /// The node name to execute
    #[arg(long)]
    node: String,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".flowcraft")
  });

  match cli.command {
    Some(Commands::Run { target }) => match target {
      RunTarget::Workflow { workflow_file } => {
        run_workflow(workflow_file, data_dir)?;
      }
      RunTarget::Node { workflow_file, node } => {
        run_node(workflow_file, node, data_dir)?;
      }
    },
    None => {
      println!("flowcraft - use --help to see available commands");
    }
  }

  Ok(())
}

fn run_workflow(workflow_file: PathBuf, data_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_workflow_async(workflow_file, data_dir).await })
}

async fn run_workflow_async(workflow_file: PathBuf, data_dir: PathBuf) -> Result<()> {
  let workflow = load_workflow(&workflow_file).await?;
  eprintln!("Loaded workflow: {} ({} nodes)", workflow.name, workflow.nodes.len());

  let payload = read_payload_from_stdin()?;
  eprintln!("Payload: {}", payload);

  let engine = build_engine(&data_dir).await?;
  let start = engine
    .find_start_node(&workflow)
    .with_context(|| format!("workflow '{}' has no trigger node to start from", workflow.name))?;
  eprintln!("Starting from trigger node: {}", start.name);

  let items = vec![NodeData::from_json(payload)];
  let ctx = engine
    .run(workflow, &start.name, items, ExecutionMode::Manual)
    .await
    .context("workflow execution failed")?;

  eprintln!("Execution completed: {}", ctx.execution_id);
  eprintln!("Nodes executed: {}", ctx.node_states.len());
  if !ctx.errors.is_empty() {
    eprintln!("Errors: {}", ctx.errors.len());
  }

  let output: serde_json::Map<String, serde_json::Value> = ctx
    .node_states
    .into_iter()
    .map(|(name, items)| (name, serde_json::to_value(items).unwrap_or(serde_json::Value::Null)))
    .collect();

  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

fn run_node(workflow_file: PathBuf, node: String, data_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_node_async(workflow_file, node, data_dir).await })
}

async fn run_node_async(workflow_file: PathBuf, node_name: String, data_dir: PathBuf) -> Result<()> {
  let workflow = load_workflow(&workflow_file).await?;
  let node_def = workflow
    .node(&node_name)
    .with_context(|| format!("node '{}' not found in workflow", node_name))?
    .clone();

  eprintln!("Running node: {} (type: {})", node_def.name, node_def.node_type);

  let payload = read_payload_from_stdin()?;
  eprintln!("Payload: {}", payload);

  // Bypass graph traversal: run this node alone, as if it were the sole
  // trigger, by substituting a single-node workflow around it.
  let isolated = Workflow {
    id: workflow.id.clone(),
    name: workflow.name.clone(),
    active: workflow.active,
    nodes: vec![node_def.clone()],
    connections: vec![],
    settings: workflow.settings.clone(),
  };

  let engine = build_engine(&data_dir).await?;
  let items = vec![NodeData::from_json(payload)];
  let ctx = engine
    .run(isolated, &node_def.name, items, ExecutionMode::Manual)
    .await
    .context("node execution failed")?;

  eprintln!("Node execution completed");
  let output = ctx.node_states.get(&node_def.name).cloned().unwrap_or_default();
  println!("{}", serde_json::to_string_pretty(&output)?);

  Ok(())
}

async fn build_engine(data_dir: &PathBuf) -> Result<Engine> {
  let config_path = data_dir.join("flowcraft.toml");
  let config = EngineConfig::load_or_default(&config_path)
    .await
    .context("failed to load engine configuration")?;
  Engine::new(config).context("failed to create engine")
}

async fn load_workflow(workflow_file: &PathBuf) -> Result<Workflow> {
  let content = tokio::fs::read_to_string(workflow_file)
    .await
    .with_context(|| format!("failed to read workflow file: {}", workflow_file.display()))?;
  serde_json::from_str(&content).with_context(|| format!("failed to parse workflow file: {}", workflow_file.display()))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input).context("failed to read payload from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
    }
  }
}
