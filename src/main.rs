use anyhow::Result;
use clap::Parser;

use invoice_approval::cli::commands::{
    actions::ActionsCommand, apply::ApplyCommand, complete::CompleteCommand,
    history::HistoryCommand, register::RegisterCommand, show_how_to_get_started,
    status::StatusCommand, tasks::TasksCommand, types::TypesCommand, Command, WorkspaceOptions,
};
use invoice_approval::cli::{Cli, Commands};
use invoice_approval::config::{config, ApprovalConfig};
use invoice_approval::observability::create_workflow_span;
use invoice_approval::telemetry::{generate_correlation_id, init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => {
            let _ = ApprovalConfig::load_env_file();
            ApprovalConfig::load_from(Some(path))?
        }
        None => config()?.clone(),
    };

    if let Err(e) = init_telemetry(&settings.observability) {
        eprintln!("Warning: failed to initialize telemetry: {e}");
    }

    let options = WorkspaceOptions::new(
        cli.state_file.clone().unwrap_or_else(|| settings.state_file()),
        cli.json,
        settings.task_assigner(),
    );

    let span = create_workflow_span("invoice-approval", &generate_correlation_id());
    let _entered = span.enter();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = match cli.command {
        None => runtime.block_on(show_how_to_get_started()),
        Some(Commands::Register {
            reference,
            project,
            fixed_asset,
        }) => runtime.block_on(async {
            RegisterCommand::new(options, reference, project, fixed_asset)
                .execute()
                .await
        }),
        Some(Commands::Status { reference }) => {
            runtime.block_on(async { StatusCommand::new(options, reference).execute().await })
        }
        Some(Commands::Actions { reference }) => {
            runtime.block_on(async { ActionsCommand::new(options, reference).execute().await })
        }
        Some(Commands::Apply {
            reference,
            transition,
        }) => runtime.block_on(async {
            ApplyCommand::new(options, reference, transition)
                .execute()
                .await
        }),
        Some(Commands::Complete { reference, task }) => runtime.block_on(async {
            CompleteCommand::new(options, reference, task).execute().await
        }),
        Some(Commands::Tasks { role }) => {
            runtime.block_on(async { TasksCommand::new(options, role).execute().await })
        }
        Some(Commands::History { reference }) => {
            runtime.block_on(async { HistoryCommand::new(options, reference).execute().await })
        }
        Some(Commands::Types) => {
            runtime.block_on(async { TypesCommand::new(options).execute().await })
        }
    };

    if settings.observability.metrics_enabled {
        shutdown_telemetry();
    }
    result
}
