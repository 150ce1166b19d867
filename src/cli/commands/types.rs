use anyhow::Result;
use serde::Serialize;

use super::{Command, WorkspaceOptions};
use crate::invoice::{IncomingInvoiceState, IncomingInvoiceTransitionType, LinkedRecords};
use crate::state::{Role, StateTransitionType};

pub struct TypesCommand {
    pub options: WorkspaceOptions,
}

#[derive(Debug, Serialize)]
struct TransitionTypeInfo {
    name: &'static str,
    friendly_name: String,
    from_states: Option<Vec<IncomingInvoiceState>>,
    to_state: IncomingInvoiceState,
    assigned_role: Option<Role>,
}

impl TypesCommand {
    pub fn new(options: WorkspaceOptions) -> Self {
        Self { options }
    }

    fn catalog() -> Vec<TransitionTypeInfo> {
        IncomingInvoiceTransitionType::all()
            .iter()
            .map(|t| TransitionTypeInfo {
                name: t.name(),
                friendly_name: t.friendly_name(),
                from_states: t.from_states().map(|states| states.to_vec()),
                to_state: t.to_state(),
                assigned_role: t.assign_task_to(&LinkedRecords),
            })
            .collect()
    }
}

impl Command for TypesCommand {
    async fn execute(&self) -> Result<()> {
        let catalog = Self::catalog();

        if self.options.json {
            return self.options.print_json(&catalog);
        }

        println!("📚 INCOMING INVOICE TRANSITIONS");
        println!("───────────────────────────────");
        for info in catalog {
            let from = info
                .from_states
                .map(|states| {
                    states
                        .iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                        .join(" | ")
                })
                .unwrap_or_else(|| "(entry)".to_string());
            let role = info
                .assigned_role
                .map(|r| format!("  [task: {r}]"))
                .unwrap_or_default();
            println!("   {:<28} {} -> {}{}", info.name, from, info.to_state, role);
        }
        Ok(())
    }
}
