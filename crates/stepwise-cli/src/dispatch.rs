use anyhow::{Context, Result};
use comfy_table::{Cell, ContentArrangement, Table};
use serde_json::{Value, json};
use stepwise_app::{
    App, CheckReport, FileSessionStore, StatusReport, StepRequest, StepResult, parse_assignment,
};
use stepwise_core::definition::WizardDefinition;
use stepwise_core::wizard::{Outcome, WizardState};

use crate::cli::{Cli, Command, StepArgs};

pub fn run_with_deps(cli: Cli, app: &App<'_>, store: &FileSessionStore) -> Result<()> {
    let definition = app.ensure_definition_ready(cli.definition.as_deref())?;

    match cli.command {
        Command::Step(args) => run_step_command(app, &definition, args),
        Command::Branch { name, skip } => {
            app.branch(&definition, &name, skip)?;
            let decision = if skip { "skipped" } else { "selected" };
            println!("branch {name} {decision}");
            Ok(())
        }
        Command::Unbranch { name } => {
            app.unbranch(&definition, &name)?;
            println!("branch {name} cleared");
            Ok(())
        }
        Command::Reset => {
            app.reset(&definition)?;
            println!("wizard {} reset", definition.spec.wizard_action);
            Ok(())
        }
        Command::Status => {
            let report = app.status(&definition)?;
            print_status_report(&report, store)
        }
        Command::Check => {
            print_check_report(&app.check(&definition));
            Ok(())
        }
    }
}

fn run_step_command(app: &App<'_>, definition: &WizardDefinition, args: StepArgs) -> Result<()> {
    let fields = args
        .fields
        .iter()
        .map(|raw| parse_assignment(raw))
        .collect::<Result<Vec<_>>>()?;

    let result = app.step(
        definition,
        StepRequest {
            step: args.step,
            fields,
            previous: args.previous,
            cancel: args.cancel,
        },
    )?;

    if args.json {
        let rendered = serde_json::to_string_pretty(&step_result_json(&result))
            .context("failed to render step outcome as JSON")?;
        println!("{rendered}");
        return Ok(());
    }

    print_step_result(&result)
}

fn print_step_result(result: &StepResult) -> Result<()> {
    for warning in &result.response.warnings {
        println!("warning: {warning}");
    }

    match &result.response.outcome {
        Outcome::Redirect(target) => println!("redirect {target}"),
        Outcome::Render { step, data } => {
            println!("render step {step}");
            if let Some(data) = data {
                let rendered = serde_json::to_string_pretty(data)
                    .with_context(|| format!("failed to render data for step '{step}'"))?;
                println!("{rendered}");
            }
            for field in &result.missing_fields {
                println!("missing: {field}");
            }
        }
    }

    Ok(())
}

fn step_result_json(result: &StepResult) -> Value {
    let warnings: Vec<String> = result
        .response
        .warnings
        .iter()
        .map(ToString::to_string)
        .collect();

    match &result.response.outcome {
        Outcome::Render { step, data } => json!({
            "outcome": "render",
            "step": step,
            "data": data,
            "missing_fields": result.missing_fields,
            "warnings": warnings,
        }),
        Outcome::Redirect(target) => json!({
            "outcome": "redirect",
            "target": target,
            "warnings": warnings,
        }),
    }
}

fn print_status_report(report: &StatusReport, store: &FileSessionStore) -> Result<()> {
    let state = match &report.state {
        WizardState::Idle => "idle".to_string(),
        WizardState::AwaitingStep(step) => format!("awaiting {step}"),
        WizardState::Complete => "complete".to_string(),
    };
    let updated_at = store
        .updated_at()
        .context("failed to read session file timestamp")?
        .unwrap_or_else(|| "never".to_string());

    println!("wizard: {}", report.scope);
    println!("session: {}", store.path().display());
    println!("state: {state}");
    println!("updated: {updated_at}");

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Step", "Status", "Active"]);
    for step in &report.steps {
        table.add_row(vec![
            Cell::new(step.step.as_str()),
            Cell::new(step.status.to_string()),
            Cell::new(if step.active { "*" } else { "" }),
        ]);
    }
    println!("{table}");

    if !report.branches.is_empty() {
        let mut branches = Table::new();
        branches.set_content_arrangement(ContentArrangement::Dynamic);
        branches.set_header(vec!["Branch", "Decision"]);
        for (name, state) in &report.branches {
            branches.add_row(vec![Cell::new(name.as_str()), Cell::new(state.to_string())]);
        }
        println!("{branches}");
    }

    Ok(())
}

fn print_check_report(report: &CheckReport) {
    println!("definition ok: {}", report.scope);
    println!("declared steps: {}", report.step_count);
    println!("default flow: {}", report.default_steps.join(" -> "));
    if report.branches.is_empty() {
        println!("branches: none");
    } else {
        println!("branches: {}", report.branches.join(", "));
    }
    if !report.data_owners.is_empty() {
        println!("data owners: {}", report.data_owners.join(", "));
    }
}
