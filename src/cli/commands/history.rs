use anyhow::Result;

use super::{query_service, Command, WorkspaceOptions};
use crate::state::StateTransitionType;

pub struct HistoryCommand {
    pub options: WorkspaceOptions,
    pub reference: String,
}

impl HistoryCommand {
    pub fn new(options: WorkspaceOptions, reference: String) -> Self {
        Self { options, reference }
    }
}

impl Command for HistoryCommand {
    async fn execute(&self) -> Result<()> {
        let workspace = self.options.open().await?;
        let invoice = workspace.invoice(&self.reference)?;
        let history = query_service(&workspace).history_of(invoice).await?;

        if self.options.json {
            return self.options.print_json(&history);
        }

        println!("🕘 HISTORY OF {}", invoice.reference);
        println!("──────────────────");
        if history.is_empty() {
            println!("   (no transitions yet, state NEW)");
            return Ok(());
        }
        for transition in history {
            let marker = if transition.completed { "✅" } else { "⏳" };
            let from = transition
                .from_state
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!(
                "   {} #{:<3} {:<28} {} -> {}  ({})",
                marker,
                transition.sequence,
                transition.transition_type.name(),
                from,
                transition.to_state,
                transition.created_at.format("%Y-%m-%d %H:%M:%S")
            );
        }
        Ok(())
    }
}
