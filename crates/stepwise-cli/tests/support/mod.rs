use assert_cmd::Command;
use std::fs;
use std::path::Path;

pub const SIGNUP_DEFINITION: &str = r#"
version = 1
wizard_action = "signup"
complete_url = "/welcome"
auto_validate = true
data_owners = ["Account"]
steps = ["account", { personal = "profile", business = ["company", "billing"] }, "confirm"]

[rules.Account]
required = ["email"]
"#;

pub fn new_command_with_temp_home() -> (Command, tempfile::TempDir) {
    let temp_home = tempfile::tempdir().expect("temp home");
    let command = command_in_home(temp_home.path());
    (command, temp_home)
}

pub fn command_in_home(home: &Path) -> Command {
    let binary = assert_cmd::cargo::cargo_bin!("stepwise");
    let mut command = Command::new(binary);
    command.env("HOME", home);
    command.env("XDG_CONFIG_HOME", home.join(".config"));
    command.env_remove("STEPWISE_LOG");
    command
}

pub fn write_definition(home: &Path, raw: &str) {
    let config_dir = home.join(".config").join("stepwise");
    fs::create_dir_all(&config_dir).expect("create config dir");
    fs::write(config_dir.join("wizard.toml"), raw).expect("write definition");
}
