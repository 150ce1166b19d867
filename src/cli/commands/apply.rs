use anyhow::{Context, Result};

use super::{transition_service, Command, WorkspaceOptions};
use crate::invoice::{IncomingInvoiceTransitionType, LinkedRecords};
use crate::state::StateTransitionType;

pub struct ApplyCommand {
    pub options: WorkspaceOptions,
    pub reference: String,
    pub transition: String,
}

impl ApplyCommand {
    pub fn new(options: WorkspaceOptions, reference: String, transition: String) -> Self {
        Self {
            options,
            reference,
            transition,
        }
    }
}

impl Command for ApplyCommand {
    async fn execute(&self) -> Result<()> {
        let transition_type: IncomingInvoiceTransitionType = self
            .transition
            .parse()
            .with_context(|| format!("'{}' is not an invoice transition", self.transition))?;

        let mut lock = self.options.lock()?;
        let held = lock.try_acquire()?;
        let mut workspace = self.options.open().await?;
        let mut invoice = workspace.invoice(&self.reference)?.clone();
        let service = transition_service(&workspace);

        let transition = service
            .apply(&mut invoice, transition_type, &LinkedRecords)
            .await
            .with_context(|| format!("Failed to apply {} to {}", transition_type, self.reference))?;

        *workspace.invoice_mut(&self.reference)? = invoice;
        self.options.save(&workspace, &held).await?;

        if self.options.json {
            return self.options.print_json(&transition);
        }

        println!(
            "✍️  {} applied to {}",
            transition.transition_type.friendly_name(),
            transition.subject
        );
        println!("   ⏳ Pending until completed: {}", transition.to_state);
        if let (Some(role), Some(task)) = (transition.assigned_role, transition.task) {
            println!("   📋 Task {} assigned to {}", task, role);
        }
        Ok(())
    }
}
