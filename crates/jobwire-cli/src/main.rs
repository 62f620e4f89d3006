use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use jobwire_core::app::{DispatchConfig, DispatcherBuilder, NodeService};
use jobwire_core::domain::{AggregatedResponse, JobId, NodeId, PersistJobRequest, TaskId};
use jobwire_core::impls::{InMemoryJobExecutor, InMemoryTaskResolver, InMemoryTransport};
use jobwire_core::observability::AggregationSummary;
use jobwire_core::wire;

#[derive(Parser)]
#[command(name = "jobwire")]
#[command(about = "Send task-scoped job actions through an in-memory cluster")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Persist a job on whichever node runs it
    Persist {
        #[arg(value_name = "JOB_ID")]
        job_id: String,

        /// Number of nodes in the cluster
        #[arg(long, default_value_t = 3)]
        nodes: usize,

        /// Index of the node that runs the job
        #[arg(long, default_value_t = 0)]
        owner: usize,

        /// Make the owner's persist call fail
        #[arg(long)]
        fail_owner: bool,

        /// Take the owner off the network
        #[arg(long)]
        down_owner: bool,

        /// Dispatch config file (JSON)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Overrides the config's timeout
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },

    /// Print the wire encoding of a persist request as hex
    Encode {
        #[arg(value_name = "JOB_ID")]
        job_id: String,
    },
}

#[derive(Serialize)]
struct Report<'a> {
    summary: AggregationSummary,
    response: &'a AggregatedResponse,
}

struct PersistArgs {
    job_id: String,
    nodes: usize,
    owner: usize,
    fail_owner: bool,
    down_owner: bool,
    config: DispatchConfig,
}

fn load_config(path: Option<PathBuf>, timeout_ms: Option<u64>) -> Result<DispatchConfig> {
    let mut config = match path {
        Some(path) => DispatchConfig::from_path(&path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DispatchConfig::default(),
    };
    if let Some(timeout_ms) = timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    Ok(config)
}

async fn persist(args: PersistArgs) -> Result<()> {
    anyhow::ensure!(args.nodes > 0, "--nodes must be at least 1");
    anyhow::ensure!(
        args.owner < args.nodes,
        "--owner {} is out of range for {} nodes",
        args.owner,
        args.nodes
    );

    let job_id = JobId::new(args.job_id);
    let resolver = Arc::new(InMemoryTaskResolver::new());
    let transport = Arc::new(InMemoryTransport::new());

    for i in 0..args.nodes {
        let node = NodeId::new(format!("node-{i}"));
        let executor = Arc::new(InMemoryJobExecutor::new());
        if i == args.owner {
            let task = TaskId::new(node.clone(), 1);
            executor.start(task.clone(), job_id.clone());
            if args.fail_owner {
                executor.fail_task(task.clone(), "injected failure");
            }
            resolver.assign(job_id.clone(), task).await;
            if args.down_owner {
                transport.set_down(&node, true).await;
            }
        }
        transport
            .join(NodeService::with_persist_handler(node, executor)?)
            .await;
    }
    info!(nodes = args.nodes, owner = args.owner, "cluster ready");

    let dispatcher = DispatcherBuilder::new()
        .resolver(resolver)
        .transport(transport)
        .config(args.config)
        .build()?;

    let response = dispatcher.persist_job(job_id).await?;
    let report = Report {
        summary: AggregationSummary::from(&response),
        response: &response,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn encode(job_id: String) -> Result<()> {
    let bytes = wire::encode(&PersistJobRequest::new(job_id))?;
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    println!("{hex}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jobwire=info,jobwire_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Persist {
            job_id,
            nodes,
            owner,
            fail_owner,
            down_owner,
            config,
            timeout_ms,
        } => {
            let config = load_config(config, timeout_ms)?;
            persist(PersistArgs {
                job_id,
                nodes,
                owner,
                fail_owner,
                down_owner,
                config,
            })
            .await
        }
        Commands::Encode { job_id } => encode(job_id),
    }
}
