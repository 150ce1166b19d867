use anyhow::{Context, Result};

use super::{transition_service, Command, WorkspaceOptions};
use crate::state::{StateTransitionType, TaskId};

pub struct CompleteCommand {
    pub options: WorkspaceOptions,
    pub reference: Option<String>,
    pub task: Option<String>,
}

impl CompleteCommand {
    pub fn new(options: WorkspaceOptions, reference: Option<String>, task: Option<String>) -> Self {
        Self {
            options,
            reference,
            task,
        }
    }
}

impl Command for CompleteCommand {
    async fn execute(&self) -> Result<()> {
        let mut lock = self.options.lock()?;
        let held = lock.try_acquire()?;
        let workspace = self.options.open().await?;
        let service = transition_service(&workspace);

        let completed = match (&self.task, &self.reference) {
            (Some(task), _) => {
                let task: TaskId = task.parse()?;
                service
                    .complete_task(&task)
                    .await
                    .with_context(|| format!("Failed to complete task {task}"))?
            }
            (None, Some(reference)) => {
                let invoice = workspace.invoice(reference)?;
                service
                    .complete_transition(invoice)
                    .await
                    .with_context(|| format!("Failed to complete the pending step of {reference}"))?
            }
            (None, None) => anyhow::bail!("Either an invoice reference or --task is required"),
        };

        self.options.save(&workspace, &held).await?;

        if self.options.json {
            return self.options.print_json(&completed);
        }

        println!(
            "✅ {} completed for {}",
            completed.transition_type.friendly_name(),
            completed.subject
        );
        println!("   📍 State: {}", completed.to_state);
        Ok(())
    }
}
