use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `AgentFlow` - plan research tasks as agent DAGs and watch them run.
#[derive(Parser, Debug)]
#[command(name = "agentflow")]
#[command(version)]
#[command(about = "Plans multi-step research tasks and streams their execution.", long_about = None)]
pub struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP gateway for the web client
    Serve {
        /// Host to bind (defaults to gateway.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (use 0 for a random available port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Plan a request and execute it, printing events as NDJSON
    Run {
        /// The request to plan
        message: String,

        /// Ask on the terminal at each checkpoint instead of auto-approving
        #[arg(long)]
        manual: bool,
    },

    /// Execute a saved plan JSON file, printing events as NDJSON
    Execute {
        /// Path to the plan file
        plan: PathBuf,

        /// Ask on the terminal at each checkpoint instead of auto-approving
        #[arg(long)]
        manual: bool,
    },

    /// List the agent registry
    Agents,
}
