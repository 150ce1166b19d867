use anyhow::Result;

use super::{query_service, Command, WorkspaceOptions};
use crate::state::Role;

pub struct TasksCommand {
    pub options: WorkspaceOptions,
    pub role: Option<String>,
}

impl TasksCommand {
    pub fn new(options: WorkspaceOptions, role: Option<String>) -> Self {
        Self { options, role }
    }
}

impl Command for TasksCommand {
    async fn execute(&self) -> Result<()> {
        let role = self.role.as_deref().map(str::parse::<Role>).transpose()?;

        let workspace = self.options.open().await?;
        let tasks = query_service(&workspace).open_tasks_for(role).await?;

        if self.options.json {
            return self.options.print_json(&tasks);
        }

        if tasks.is_empty() {
            match role {
                Some(role) => println!("📋 No open tasks for {}", role),
                None => println!("📋 No open tasks"),
            }
            return Ok(());
        }

        println!("📋 OPEN TASKS ({})", tasks.len());
        println!("────────────────");
        for task in tasks {
            let person = task
                .person_assigned_to
                .as_deref()
                .map(|p| format!(" → {p}"))
                .unwrap_or_default();
            println!(
                "   {} {:<20} {:<12} {}{}",
                task.id, task.assigned_to, task.subject, task.description, person
            );
        }
        Ok(())
    }
}
