use anyhow::Result;
use serde_json::json;

use super::{describe_invoice, Command, WorkspaceOptions};
use crate::invoice::IncomingInvoice;

pub struct RegisterCommand {
    pub options: WorkspaceOptions,
    pub reference: String,
    pub project: Option<String>,
    pub fixed_asset: Option<String>,
}

impl RegisterCommand {
    pub fn new(
        options: WorkspaceOptions,
        reference: String,
        project: Option<String>,
        fixed_asset: Option<String>,
    ) -> Self {
        Self {
            options,
            reference,
            project,
            fixed_asset,
        }
    }
}

impl Command for RegisterCommand {
    async fn execute(&self) -> Result<()> {
        let mut lock = self.options.lock()?;
        let held = lock.try_acquire()?;
        let mut workspace = self.options.open().await?;

        let mut invoice = IncomingInvoice::new(self.reference.clone());
        if let Some(project) = &self.project {
            invoice = invoice.with_project(project.clone());
        }
        if let Some(asset) = &self.fixed_asset {
            invoice = invoice.with_fixed_asset(asset.clone());
        }
        workspace.register(invoice.clone())?;
        self.options.save(&workspace, &held).await?;

        if self.options.json {
            self.options.print_json(&json!({ "invoice": invoice, "state": "NEW" }))?;
        } else {
            println!("📥 Registered {}", describe_invoice(&invoice));
        }
        Ok(())
    }
}
