//! Workflow commands.

use std::path::Path;
use std::time::Duration;

use console::style;

use crate::cli::helpers;
use crate::client::{AsyncDatalabClient, PollConfig};
use crate::error::DatalabError;
use crate::models::{InputConfig, Workflow, WorkflowStep};
use crate::settings::Settings;

/// Create a workflow from a JSON step list.
pub async fn cmd_create(settings: &Settings, name: &str, steps: &str) -> anyhow::Result<()> {
    let steps_value = helpers::read_json_arg(steps)?;
    let steps: Vec<WorkflowStep> = serde_json::from_value(steps_value)
        .map_err(|e| DatalabError::Validation(format!("Invalid workflow steps: {}", e)))?;

    let client = AsyncDatalabClient::from_settings(settings)?;
    let workflow = client.create_workflow(name, steps).await?;

    println!("{} Workflow created", style("✓").green());
    print_workflow(&workflow, true);
    Ok(())
}

/// List the team's workflows.
pub async fn cmd_list(settings: &Settings) -> anyhow::Result<()> {
    let client = AsyncDatalabClient::from_settings(settings)?;
    let workflows = client.list_workflows().await?;

    if workflows.is_empty() {
        println!("No workflows found.");
        return Ok(());
    }

    println!("Found {} workflow(s):\n", workflows.len());
    for workflow in &workflows {
        print_workflow(workflow, false);
        println!();
    }
    Ok(())
}

/// Show one workflow, including step settings.
pub async fn cmd_show(settings: &Settings, workflow_id: i64) -> anyhow::Result<()> {
    let client = AsyncDatalabClient::from_settings(settings)?;
    let workflow = client.get_workflow(workflow_id).await?;
    print_workflow(&workflow, true);
    Ok(())
}

/// Trigger an execution.
pub async fn cmd_execute(
    settings: &Settings,
    workflow_id: i64,
    input_config: &str,
) -> anyhow::Result<()> {
    let config_value = helpers::read_json_arg(input_config)?;
    let config: InputConfig = serde_json::from_value(config_value)
        .map_err(|e| DatalabError::Validation(format!("Invalid input config: {}", e)))?;

    let client = AsyncDatalabClient::from_settings(settings)?;
    let execution = client.execute_workflow(workflow_id, &config).await?;

    println!("{} Execution triggered", style("✓").green());
    println!("  Execution ID: {}", execution.id);
    println!("  Status: {}", execution.status);
    println!(
        "\nCheck progress with: datalab workflow status {} --wait",
        execution.id
    );
    Ok(())
}

/// Check (or wait for) an execution's status.
pub async fn cmd_status(
    settings: &Settings,
    execution_id: i64,
    wait: bool,
    max_polls: usize,
    poll_interval: u64,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let client = AsyncDatalabClient::from_settings(settings)?.with_poll_config(PollConfig {
        max_polls,
        poll_interval: Duration::from_secs(poll_interval),
    });

    let execution = if wait {
        client.wait_for_execution(execution_id).await?
    } else {
        client.get_execution_status(execution_id).await?
    };

    let marker = if execution.success {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!("{} Execution {}", marker, execution.id);
    println!("  Workflow: {}", execution.workflow_id);
    println!("  Status: {}", execution.status);
    if let Some(ref error) = execution.error {
        println!("  Error: {}", error);
    }
    if let Some(ref steps) = execution.steps {
        println!("  Steps: {}", serde_json::to_string_pretty(steps)?);
    }

    if let Some(path) = output {
        execution.save_output(path)?;
        println!("\n  Saved to {}", style(path.display()).cyan());
    }

    if execution.is_terminal() && !execution.success {
        std::process::exit(1);
    }
    Ok(())
}

fn print_workflow(workflow: &Workflow, detailed: bool) {
    println!("  ID: {}", workflow.id.map_or("-".to_string(), |id| id.to_string()));
    println!("  Name: {}", workflow.name);
    println!("  Team ID: {}", workflow.team_id);
    println!("  Steps: {}", workflow.steps.len());
    if let Some(ref created) = workflow.created {
        println!("  Created: {}", created);
    }

    if detailed {
        for (i, step) in workflow.steps.iter().enumerate() {
            println!("\n  Step {}: {}", i + 1, step.unique_name);
            println!("    Type: {}", step.step_key);
            if !step.depends_on.is_empty() {
                println!("    Depends on: {}", step.depends_on.join(", "));
            }
            if !step.settings.is_null() {
                println!(
                    "    Settings: {}",
                    serde_json::to_string(&step.settings).unwrap_or_default()
                );
            }
        }
    }
}
