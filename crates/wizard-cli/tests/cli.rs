use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::Value;

const PROJECT_WIZARD: &str = include_str!("../../wizard-spec/tests/fixtures/project_wizard.json");
const REGISTRATION_FORM: &str =
    include_str!("../../wizard-spec/tests/fixtures/registration_form.json");

fn wizard() -> Command {
    let mut cmd = Command::cargo_bin("wizard").expect("binary");
    cmd.env_remove("WIZARD_STATE_DIR");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("run");
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn schema_describes_wizard_and_form_configs() {
    let wizard_schema = stdout_of(wizard().arg("schema"));
    assert!(wizard_schema.contains("navigation_mode"));
    let form_schema = stdout_of(wizard().args(["schema", "--form"]));
    assert!(form_schema.contains("sections"));
}

#[test]
fn validate_reports_field_errors() {
    let temp = TempDir::new().expect("tempdir");
    let config = temp.child("wizard.json");
    config.write_str(PROJECT_WIZARD).expect("config");
    let data = temp.child("data.json");
    data.write_str(r#"{"projectName": "ab", "projectType": "web"}"#)
        .expect("data");

    let assert = wizard()
        .args(["validate", "--step", "project-info", "--config"])
        .arg(config.path())
        .arg("--data")
        .arg(data.path())
        .assert()
        .failure();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("Validation result: invalid"));
    assert!(stdout.contains("projectName - Must contain at least 3 character(s)"));
    assert!(stdout.contains("projectDescription - Required"));

    data.write_str(
        r#"{"projectName": "Atlas", "projectDescription": "An internal dashboard", "projectType": "api"}"#,
    )
    .expect("data");
    wizard()
        .args(["validate", "--step", "project-info", "--config"])
        .arg(config.path())
        .arg("--data")
        .arg(data.path())
        .assert()
        .success();
}

#[test]
fn visibility_lists_hidden_fields() {
    let temp = TempDir::new().expect("tempdir");
    let form = temp.child("form.json");
    form.write_str(REGISTRATION_FORM).expect("form");
    let values = temp.child("values.json");
    values
        .write_str(r#"{"accountType": "business", "companyName": "Acme"}"#)
        .expect("values");

    let stdout = stdout_of(
        wizard()
            .arg("visibility")
            .arg("--form")
            .arg(form.path())
            .arg("--values")
            .arg(values.path()),
    );
    assert!(stdout.contains("companyName: visible"));
    assert!(stdout.contains("yearsOfExperience: hidden"));
    assert!(stdout.contains("Missing required fields: firstName, email, taxId"));

    values
        .write_str(r#"{"accountType": "personal"}"#)
        .expect("values");
    let stdout = stdout_of(
        wizard()
            .arg("visibility")
            .arg("--form")
            .arg(form.path())
            .arg("--values")
            .arg(values.path()),
    );
    assert!(stdout.contains("companyName: hidden"));
}

#[test]
fn run_walks_every_step_and_submits() {
    let temp = TempDir::new().expect("tempdir");
    let config = temp.child("wizard.json");
    config.write_str(PROJECT_WIZARD).expect("config");
    let state_dir = temp.child("state");
    let out = temp.child("submission.json");

    let input = [
        "Atlas",
        "An internal dashboard",
        "Web",
        ":skip",
        "react, vue",
        "postgres",
        "https://example.com/atlas.git",
        "yes",
        "yes",
    ]
    .join("\n")
        + "\n";

    let assert = wizard()
        .arg("run")
        .arg("--config")
        .arg(config.path())
        .arg("--state-dir")
        .arg(state_dir.path())
        .arg("--out")
        .arg(out.path())
        .write_stdin(input)
        .assert()
        .success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(stdout.contains("Step 1/5: Project Information"));
    assert!(stdout.contains("Step 3/5: Technology Stack"));
    assert!(stdout.contains("Project created successfully!"));

    let submission: Value =
        serde_json::from_str(&std::fs::read_to_string(out.path()).expect("out")).expect("json");
    assert_eq!(submission["endpoint"], "/projects");
    assert_eq!(submission["method"], "POST");
    assert_eq!(submission["payload"]["project-info"]["projectType"], "web");
    assert_eq!(
        submission["payload"]["technology-stack"]["frontend"],
        serde_json::json!(["react", "vue"])
    );
    assert!(submission["payload"].get("team-members").is_none());

    assert!(!state_dir.child("project-setup-wizard.json").path().exists());
}

#[test]
fn progress_survives_an_aborted_run() {
    let temp = TempDir::new().expect("tempdir");
    let config = temp.child("wizard.json");
    config.write_str(PROJECT_WIZARD).expect("config");
    let state_dir = temp.child("state");

    wizard()
        .arg("run")
        .arg("--config")
        .arg(config.path())
        .env("WIZARD_STATE_DIR", state_dir.path())
        .write_stdin("Atlas\nAn internal dashboard\napi\nexit\n")
        .assert()
        .failure();

    let stdout = stdout_of(
        wizard()
            .arg("status")
            .arg("--config")
            .arg(config.path())
            .arg("--state-dir")
            .arg(state_dir.path()),
    );
    assert!(stdout.contains("Current step: 2/5 (Team Members)"));
    assert!(stdout.contains("Progress: 20%"));
    assert!(stdout.contains(" - Project Information [complete]"));

    let resumed = wizard()
        .arg("run")
        .arg("--config")
        .arg(config.path())
        .env("WIZARD_STATE_DIR", state_dir.path())
        .write_stdin("exit\n")
        .assert()
        .failure();
    let stdout = String::from_utf8_lossy(&resumed.get_output().stdout).into_owned();
    assert!(stdout.contains("Resuming saved progress at step 2/5."));
}

#[test]
fn status_reads_saved_progress_without_restore_on_mount() {
    let temp = TempDir::new().expect("tempdir");
    let mut wizard_json: Value = serde_json::from_str(PROJECT_WIZARD).expect("fixture");
    wizard_json["persistence"]["restore_on_mount"] = Value::Bool(false);
    let config = temp.child("wizard.json");
    config
        .write_str(&wizard_json.to_string())
        .expect("config");
    let state_dir = temp.child("state");
    state_dir
        .child("project-setup-wizard.json")
        .write_str(r#"{"current_step_index": 2, "completed_steps": ["project-info"], "skipped_steps": ["team-members"]}"#)
        .expect("snapshot");

    let stdout = stdout_of(
        wizard()
            .arg("status")
            .arg("--config")
            .arg(config.path())
            .arg("--state-dir")
            .arg(state_dir.path()),
    );
    assert!(!stdout.contains("No saved progress."));
    assert!(stdout.contains("Current step: 3/5 (Technology Stack)"));
    assert!(stdout.contains("Progress: 40%"));
}
