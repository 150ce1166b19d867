use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "invoice-approval")]
#[command(about = "Approval workflow for incoming invoices")]
#[command(long_about = "Registers incoming invoices and walks them through project manager or \
                       asset manager approval, country director and treasurer approval, and payment. \
                       Each step leaves a pending transition and a task for the responsible role.")]
pub struct Cli {
    /// Workspace file holding invoices and their transition history
    #[arg(long, global = true, help = "Workspace file (defaults to store.state_file from configuration)")]
    pub state_file: Option<PathBuf>,
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
    /// Configuration file to use instead of ./invoice-approval.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Register a new incoming invoice
    Register {
        /// Invoice reference
        reference: String,
        /// Project the invoice is booked against
        #[arg(long)]
        project: Option<String>,
        /// Fixed asset (property) the invoice is booked against
        #[arg(long)]
        fixed_asset: Option<String>,
    },
    /// Show an invoice's current state and pending transition
    Status {
        /// Invoice reference
        reference: String,
    },
    /// List the transitions that can be applied to an invoice right now
    Actions {
        /// Invoice reference
        reference: String,
    },
    /// Apply a transition, leaving it pending until its task is completed
    Apply {
        /// Invoice reference
        reference: String,
        /// Transition name, e.g. APPROVE_AS_PROJECT_MANAGER or approve-as-project-manager
        transition: String,
    },
    /// Complete a pending transition by invoice or by task
    Complete {
        /// Invoice whose pending transition should be completed
        #[arg(required_unless_present = "task", conflicts_with = "task")]
        reference: Option<String>,
        /// Task id to close out
        #[arg(long)]
        task: Option<String>,
    },
    /// List open tasks
    Tasks {
        /// Only tasks assigned to this role
        #[arg(long, help = "Role filter, e.g. TREASURER or country-director")]
        role: Option<String>,
    },
    /// Show the transition history of an invoice
    History {
        /// Invoice reference
        reference: String,
    },
    /// Describe every transition type of the workflow
    Types,
}
