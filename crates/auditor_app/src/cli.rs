use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// WebLink Auditor: broken-link checks streamed from a link-checking server.
#[derive(Debug, Parser)]
#[command(name = "auditor", version)]
#[command(about = "Check a website for broken links and file follow-up tasks", long_about = None)]
pub struct Cli {
    /// RON settings file. Defaults to ./auditor.ron when present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Base URL of the link-checking server.
    #[arg(long, global = true, value_name = "URL")]
    pub stream_base_url: Option<String>,

    /// Directory that receives broken_links.csv.
    #[arg(long, global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check one website and print the broken links found.
    Check {
        /// Website to audit.
        url: String,
        /// Write broken_links.csv when the check completes.
        #[arg(long)]
        export: bool,
    },

    /// Read URLs from stdin, one check per line.
    ///
    /// `:export` saves the last results, `:dismiss` hides the current
    /// notification and `:quit` exits.
    Interactive,

    /// Talk to the task-management API.
    Task {
        #[command(subcommand)]
        command: TaskCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// List projects of the configured company.
    Projects,
    /// List employees of the configured company.
    Employees,
    /// Create a task, optionally with an attachment.
    Create(CreateTaskArgs),
}

#[derive(Debug, Args)]
pub struct CreateTaskArgs {
    /// Task title.
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Due date as YYYY-MM-DD. Defaults to today.
    #[arg(long, value_name = "DATE")]
    pub due: Option<String>,
    /// Employee id of the assignee; also added as collaborator.
    #[arg(long, value_name = "ID")]
    pub assignee: Option<String>,
    /// Project id.
    #[arg(long, value_name = "ID")]
    pub project: Option<String>,
    /// File uploaded after the task is created.
    #[arg(long, value_name = "PATH")]
    pub attachment: Option<PathBuf>,
}
