use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use rillcore::{LogRepository, RunRepository, WorkflowEdge, WorkflowNode};
use rillengine::{Runner, WorkflowGraph};
use rillstore::MemoryStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "rill")]
#[command(about = "Workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file against the in-memory store
    Run {
        /// Path to a workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file without executing it
    Validate {
        /// Path to a workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow file
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

/// On-disk workflow definition. Node ids are free-form strings; they
/// are mapped to fresh uuids when the file is loaded.
#[derive(Debug, Serialize, Deserialize)]
struct WorkflowFile {
    #[serde(default)]
    name: String,
    nodes: Vec<FileNode>,
    #[serde(default)]
    edges: Vec<FileEdge>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileNode {
    id: String,
    #[serde(default)]
    data: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileEdge {
    source: String,
    target: String,
    #[serde(default = "default_source_handle")]
    source_handle: String,
    #[serde(default = "default_target_handle")]
    target_handle: String,
}

fn default_source_handle() -> String {
    "output".to_string()
}

fn default_target_handle() -> String {
    "input".to_string()
}

struct LoadedWorkflow {
    workflow_id: Uuid,
    nodes: Vec<WorkflowNode>,
    edges: Vec<WorkflowEdge>,
    names: HashMap<Uuid, String>,
}

fn load_workflow(path: &PathBuf) -> anyhow::Result<LoadedWorkflow> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: WorkflowFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    let workflow_id = Uuid::new_v4();
    let mut ids = HashMap::new();
    let mut names = HashMap::new();
    let mut nodes = Vec::with_capacity(file.nodes.len());

    for node in file.nodes {
        let id = Uuid::new_v4();
        if ids.insert(node.id.clone(), id).is_some() {
            bail!("duplicate node id: {}", node.id);
        }
        names.insert(id, node.id);
        nodes.push(WorkflowNode {
            id,
            workflow_id,
            template_id: Uuid::new_v4(),
            position_x: 0.0,
            position_y: 0.0,
            data: node.data,
        });
    }

    let mut edges = Vec::with_capacity(file.edges.len());
    for edge in file.edges {
        let source = *ids
            .get(&edge.source)
            .with_context(|| format!("edge references unknown node: {}", edge.source))?;
        let target = *ids
            .get(&edge.target)
            .with_context(|| format!("edge references unknown node: {}", edge.target))?;
        edges.push(WorkflowEdge {
            id: Uuid::new_v4(),
            workflow_id,
            source_node_id: source,
            target_node_id: target,
            source_handle: edge.source_handle,
            target_handle: edge.target_handle,
        });
    }

    Ok(LoadedWorkflow {
        workflow_id,
        nodes,
        edges,
        names,
    })
}

async fn run(file: PathBuf, verbose: bool) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .init();

    let workflow = load_workflow(&file)?;

    let store = Arc::new(MemoryStore::new());
    for node in &workflow.nodes {
        store.add_node(node.clone());
    }
    for edge in &workflow.edges {
        store.add_edge(edge.clone());
    }

    let registry = Arc::new(rillnodes::builtin_registry());
    let runner = Runner::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        registry,
    );

    let (run, engine) = runner.start_run(workflow.workflow_id).await?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let outcome = engine.execute(token).await;

    let finished = RunRepository::get(store.as_ref(), run.id).await?;
    println!("run {} {}", finished.id, finished.status);
    for log in store.list_by_run(run.id).await? {
        let name = workflow
            .names
            .get(&log.node_id)
            .map(String::as_str)
            .unwrap_or("<unknown>");
        println!("  {:<20} {}", name, log.status);
        if !log.log_output.is_empty() {
            println!("      {}", log.log_output.replace('\n', "\n      "));
        }
        if !log.error_msg.is_empty() {
            println!("      error: {}", log.error_msg);
        }
    }

    if let Err(err) = outcome {
        bail!("run aborted: {err}");
    }
    Ok(())
}

fn validate(file: PathBuf) -> anyhow::Result<()> {
    let workflow = load_workflow(&file)?;
    let registry = rillnodes::builtin_registry();
    let mut problems = Vec::new();

    for node in &workflow.nodes {
        let name = workflow.names.get(&node.id).map(String::as_str).unwrap_or("?");
        match node.type_key() {
            Some(key) => {
                if registry.get(key).is_err() {
                    problems.push(format!("node '{name}': unknown type '{key}'"));
                }
            }
            None => problems.push(format!("node '{name}': missing type in data")),
        }
    }

    let node_count = workflow.nodes.len();
    match WorkflowGraph::build(workflow.nodes, workflow.edges) {
        Ok(graph) => {
            if node_count > 0 && graph.start_nodes().is_empty() {
                problems.push("no start nodes: every node has an incoming edge".to_string());
            }
        }
        Err(err) => problems.push(err.to_string()),
    }

    if problems.is_empty() {
        println!("{} is valid ({node_count} nodes)", file.display());
        Ok(())
    } else {
        for problem in &problems {
            eprintln!("  {problem}");
        }
        bail!("{} problems found", problems.len());
    }
}

fn init(output: PathBuf) -> anyhow::Result<()> {
    let example = WorkflowFile {
        name: "example".to_string(),
        nodes: vec![
            FileNode {
                id: "seed".to_string(),
                data: as_map(json!({
                    "type": "set_data",
                    "data": { "score": 72 }
                })),
            },
            FileNode {
                id: "check".to_string(),
                data: as_map(json!({
                    "type": "condition",
                    "value1": 72,
                    "operator": ">",
                    "value2": 50
                })),
            },
            FileNode {
                id: "pass".to_string(),
                data: as_map(json!({
                    "type": "log",
                    "message": "score passed",
                    "level": "info"
                })),
            },
            FileNode {
                id: "fail".to_string(),
                data: as_map(json!({
                    "type": "log",
                    "message": "score failed",
                    "level": "warn"
                })),
            },
        ],
        edges: vec![
            FileEdge {
                source: "seed".to_string(),
                target: "check".to_string(),
                source_handle: "output".to_string(),
                target_handle: "input".to_string(),
            },
            FileEdge {
                source: "check".to_string(),
                target: "pass".to_string(),
                source_handle: "output_true".to_string(),
                target_handle: "input".to_string(),
            },
            FileEdge {
                source: "check".to_string(),
                target: "fail".to_string(),
                source_handle: "output_false".to_string(),
                target_handle: "input".to_string(),
            },
        ],
    };

    std::fs::write(&output, serde_json::to_string_pretty(&example)?)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("wrote example workflow to {}", output.display());
    Ok(())
}

fn as_map(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file, verbose } => run(file, verbose).await,
        Commands::Validate { file } => validate(file),
        Commands::Nodes => {
            for key in rillnodes::builtin_registry().type_keys() {
                println!("{key}");
            }
            Ok(())
        }
        Commands::Init { output } => init(output),
    }
}
