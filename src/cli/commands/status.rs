use anyhow::Result;
use serde_json::json;

use super::{describe_invoice, query_service, Command, WorkspaceOptions};
use crate::state::StateTransitionType;

pub struct StatusCommand {
    pub options: WorkspaceOptions,
    pub reference: String,
}

impl StatusCommand {
    pub fn new(options: WorkspaceOptions, reference: String) -> Self {
        Self { options, reference }
    }
}

impl Command for StatusCommand {
    async fn execute(&self) -> Result<()> {
        let workspace = self.options.open().await?;
        let invoice = workspace.invoice(&self.reference)?;
        let query = query_service(&workspace);

        let state = query.current_state_of(invoice).await?;
        let pending = query.current_transition_of(invoice).await?;

        if self.options.json {
            return self.options.print_json(&json!({
                "invoice": invoice,
                "state": state,
                "pending": pending,
            }));
        }

        println!("🧾 {}", describe_invoice(invoice));
        println!("   📍 State: {}", state);
        match pending {
            Some(transition) => {
                println!(
                    "   ⏳ Pending: {} ({} -> {})",
                    transition.transition_type.friendly_name(),
                    transition
                        .from_state
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    transition.to_state
                );
                if let Some(role) = transition.assigned_role {
                    println!("   👤 Waiting on: {}", role);
                }
                if let Some(task) = transition.task {
                    println!("   📋 Task: {}", task);
                }
            }
            None => println!("   ✅ Nothing pending"),
        }
        Ok(())
    }
}
