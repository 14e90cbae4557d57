use std::fs;
use std::path::{Path, PathBuf};

use stepwise_app::{FileSessionStore, StepRequest, parse_assignment};

pub const SIGNUP_DEFINITION: &str = r#"
version = 1
wizard_action = "signup"
complete_url = "/welcome"
cancel_url = "/bye"
auto_validate = true
data_owners = ["Account"]
steps = ["account", { personal = "profile", business = ["company", "billing"] }, "confirm"]

[rules.Account]
required = ["email"]
"#;

pub fn write_definition(dir: &Path, raw: &str) -> PathBuf {
    let path = dir.join("wizard.toml");
    fs::write(&path, raw).expect("write definition");
    path
}

pub fn open_store(dir: &Path) -> FileSessionStore {
    FileSessionStore::open(&dir.join("sessions"), "default")
}

pub fn visit(step: &str) -> StepRequest {
    StepRequest {
        step: Some(step.to_string()),
        ..StepRequest::default()
    }
}

pub fn submit(step: &str, fields: &[&str]) -> StepRequest {
    StepRequest {
        step: Some(step.to_string()),
        fields: fields
            .iter()
            .map(|raw| parse_assignment(raw).expect("assignment"))
            .collect(),
        ..StepRequest::default()
    }
}
