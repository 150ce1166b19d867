use anyhow::Result;
use serde_json::json;

use super::{query_service, transition_service, Command, WorkspaceOptions};
use crate::invoice::LinkedRecords;
use crate::state::StateTransitionType;

pub struct ActionsCommand {
    pub options: WorkspaceOptions,
    pub reference: String,
}

impl ActionsCommand {
    pub fn new(options: WorkspaceOptions, reference: String) -> Self {
        Self { options, reference }
    }
}

impl Command for ActionsCommand {
    async fn execute(&self) -> Result<()> {
        let workspace = self.options.open().await?;
        let invoice = workspace.invoice(&self.reference)?;
        let service = transition_service(&workspace);

        let state = query_service(&workspace).current_state_of(invoice).await?;
        let pending = service.query().find_incomplete(invoice).await?;
        let actions = service.applicable_transitions(invoice, &LinkedRecords).await?;

        if self.options.json {
            let names: Vec<_> = actions.iter().map(|t| t.name()).collect();
            return self.options.print_json(&json!({
                "invoice": invoice.reference,
                "state": state,
                "pending": pending.map(|p| p.transition_type),
                "actions": names,
            }));
        }

        println!("🧭 {} is {}", invoice.reference, state);
        if let Some(pending) = pending {
            println!(
                "   ⏳ {} is pending; complete it before applying anything else",
                pending.transition_type.friendly_name()
            );
            return Ok(());
        }
        if actions.is_empty() {
            println!("   🏁 No further transitions apply");
            return Ok(());
        }
        for action in actions {
            println!("   ▶️  {:<28} {}", action.name(), action.friendly_name());
        }
        Ok(())
    }
}
