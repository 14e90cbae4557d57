use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "stepwise")]
#[command(bin_name = "stepwise")]
#[command(version)]
#[command(about = "Session-persisted, branch-aware multi-step wizard runner")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Wizard definition file [default: ~/.config/stepwise/wizard.toml]"
    )]
    pub definition: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Directory holding session files [default: ~/.config/stepwise/sessions]"
    )]
    pub session_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "NAME",
        default_value = "default",
        help = "Session to read and write"
    )]
    pub session: String,
    #[arg(short, long, global = true, help = "Log engine decisions to stderr")]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(about = "Request a step, optionally submitting data for it")]
    Step(StepArgs),
    #[command(about = "Select a branch, or skip it with --skip")]
    Branch {
        name: String,
        #[arg(long, help = "Mark the branch as skipped instead of selected")]
        skip: bool,
    },
    #[command(about = "Clear the decision recorded for a branch")]
    Unbranch { name: String },
    #[command(about = "Discard all progress and branch decisions")]
    Reset,
    #[command(about = "Show progress through the wizard")]
    Status,
    #[command(about = "Validate the wizard definition")]
    Check,
}

#[derive(Debug, Args)]
pub struct StepArgs {
    #[arg(help = "Step to request; omit to continue at the expected step")]
    pub step: Option<String>,
    #[arg(
        long = "set",
        value_name = "OWNER.FIELD=VALUE",
        help = "Submit a field value for the step"
    )]
    pub fields: Vec<String>,
    #[arg(long, conflicts_with = "cancel", help = "Go back to the previous step")]
    pub previous: bool,
    #[arg(long, help = "Cancel the wizard and discard progress")]
    pub cancel: bool,
    #[arg(long, help = "Print the outcome as JSON")]
    pub json: bool,
}
