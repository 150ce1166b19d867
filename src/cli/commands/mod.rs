use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::assignment::TaskAssigner;
use crate::invoice::{
    IncomingInvoice, IncomingInvoiceQueryService, IncomingInvoiceTransitionService,
    IncomingInvoiceTransitionType,
};
use crate::store::{InMemoryTransitionRepository, InvoiceWorkspace, WorkspaceGuard, WorkspaceLock};

pub mod actions;
pub mod apply;
pub mod complete;
pub mod history;
pub mod register;
pub mod status;
pub mod tasks;
pub mod types;

pub type WorkspaceRepository = InMemoryTransitionRepository<IncomingInvoiceTransitionType>;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}

/// Where commands read and write the workspace, and how they report
#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    pub state_file: PathBuf,
    pub json: bool,
    pub assigner: TaskAssigner,
}

impl WorkspaceOptions {
    pub fn new(state_file: PathBuf, json: bool, assigner: TaskAssigner) -> Self {
        Self {
            state_file,
            json,
            assigner,
        }
    }

    /// Lock file for commands that change the workspace
    pub fn lock(&self) -> Result<WorkspaceLock> {
        Ok(WorkspaceLock::open(&self.state_file)?)
    }

    pub async fn open(&self) -> Result<InvoiceWorkspace> {
        Ok(InvoiceWorkspace::load(&self.state_file, self.assigner.clone()).await?)
    }

    pub async fn save(&self, workspace: &InvoiceWorkspace, held: &WorkspaceGuard<'_>) -> Result<()> {
        Ok(workspace.save(&self.state_file, held).await?)
    }

    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

pub fn query_service(workspace: &InvoiceWorkspace) -> IncomingInvoiceQueryService<WorkspaceRepository> {
    IncomingInvoiceQueryService::new(workspace.repository())
}

pub fn transition_service(
    workspace: &InvoiceWorkspace,
) -> IncomingInvoiceTransitionService<WorkspaceRepository> {
    IncomingInvoiceTransitionService::new(workspace.repository())
}

pub fn describe_invoice(invoice: &IncomingInvoice) -> String {
    let mut links = Vec::new();
    if let Some(project) = &invoice.project {
        links.push(format!("project {project}"));
    }
    if let Some(asset) = &invoice.fixed_asset {
        links.push(format!("fixed asset {asset}"));
    }
    if links.is_empty() {
        invoice.reference.clone()
    } else {
        format!("{} ({})", invoice.reference, links.join(", "))
    }
}

pub async fn show_how_to_get_started() -> Result<()> {
    println!("🧾 invoice-approval - incoming invoice approval workflow");
    println!();
    println!("To get started:");
    println!("  📥 invoice-approval register INV-1 --project PRJ-1   # Register an invoice");
    println!("  📊 invoice-approval status INV-1                     # Current state");
    println!("  🧭 invoice-approval actions INV-1                    # What can happen next");
    println!("  ✍️  invoice-approval apply INV-1 approve-as-project-manager");
    println!("  ✅ invoice-approval complete INV-1                   # Finish the pending step");
    println!();
    println!("Other commands:");
    println!("  📋 invoice-approval tasks --role treasurer           # Open tasks");
    println!("  🕘 invoice-approval history INV-1                    # Transition history");
    println!("  📚 invoice-approval types                            # Transition catalog");
    Ok(())
}
