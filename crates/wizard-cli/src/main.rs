mod wizard;

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use component_wizard::{validate_form as component_validate_form, visibility as component_visibility};
use serde_json::{Map, Value, json};
use wizard::{Verbosity, WizardPresenter};
use wizard_spec::{
    FieldConfig, FieldRegistry, FormConfig, SchemaRegistry, StepValidator, StorageBackends,
    SubmitError, SubmitMethod, SubmitOutcome, Submitter, WizardConfig, WizardMachine,
    WizardPersistence, WizardState, compute_visibility, is_field_visible, navigation,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const STATE_DIR_ENV: &str = "WIZARD_STATE_DIR";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Text-based wizard runner",
    long_about = "Runs configuration-driven wizards in a terminal and exposes the validation and visibility helpers behind them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk through a wizard interactively.
    Run {
        /// Path to the wizard configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Directory for saved progress (defaults to WIZARD_STATE_DIR; in-memory when unset).
        #[arg(long, value_name = "DIR")]
        state_dir: Option<PathBuf>,
        /// Write the submitted payload here instead of stdout.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
        /// Show progress, statuses and parse expectations.
        #[arg(long, alias = "debug")]
        verbose: bool,
    },
    /// Validate step data against a step's rules.
    Validate {
        /// Path to the wizard configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Id of the step to validate.
        #[arg(long, value_name = "STEP")]
        step: String,
        /// JSON file holding the step data.
        #[arg(long, value_name = "DATA")]
        data: PathBuf,
    },
    /// Show which form fields are visible for the given values.
    Visibility {
        /// Path to the form configuration JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// JSON file holding the form values.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
    },
    /// Print saved progress for a wizard.
    Status {
        /// Path to the wizard configuration JSON.
        #[arg(long, value_name = "CONFIG")]
        config: PathBuf,
        /// Directory holding saved progress (defaults to WIZARD_STATE_DIR).
        #[arg(long, value_name = "DIR")]
        state_dir: Option<PathBuf>,
    },
    /// Print the JSON schema of the configuration format.
    Schema {
        /// Print the form schema instead of the wizard schema.
        #[arg(long)]
        form: bool,
    },
}

fn main() -> CliResult<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            config,
            state_dir,
            out,
            verbose,
        } => runtime()?.block_on(run_wizard(config, state_dir, out, verbose)),
        Command::Validate { config, step, data } => {
            runtime()?.block_on(run_validate(config, step, data))
        }
        Command::Visibility { form, values } => run_visibility(form, values),
        Command::Status { config, state_dir } => run_status(config, state_dir),
        Command::Schema { form } => run_schema(form),
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn load_config(path: &Path) -> CliResult<WizardConfig> {
    let contents = fs::read_to_string(path)?;
    Ok(WizardConfig::from_json(&contents)?)
}

fn resolve_state_dir(state_dir: Option<PathBuf>) -> Option<PathBuf> {
    state_dir.or_else(|| env::var_os(STATE_DIR_ENV).map(PathBuf::from))
}

fn storage_for(state_dir: Option<PathBuf>) -> StorageBackends {
    match resolve_state_dir(state_dir) {
        Some(dir) => StorageBackends::with_directory(dir),
        None => StorageBackends::in_memory(),
    }
}

/// Writes the submission to a file or stdout in place of a network call.
struct OutputSubmitter {
    out: Option<PathBuf>,
}

#[async_trait]
impl Submitter for OutputSubmitter {
    async fn submit(
        &self,
        endpoint: &str,
        method: SubmitMethod,
        payload: &Value,
    ) -> Result<Value, SubmitError> {
        let request = json!({
            "endpoint": endpoint,
            "method": method.as_str(),
            "payload": payload,
        });
        let encoded = serde_json::to_string_pretty(&request)
            .map_err(|err| SubmitError::new(endpoint, "failed to encode payload").with_source(err))?;
        match &self.out {
            Some(path) => fs::write(path, encoded).map_err(|err| {
                SubmitError::new(endpoint, format!("failed to write {}", path.display()))
                    .with_source(err)
            })?,
            None => println!("{}", encoded),
        }
        Ok(json!({ "status": "recorded" }))
    }
}

enum StepInput {
    Values(Map<String, Value>),
    Back,
    Skip,
}

async fn run_wizard(
    config_path: PathBuf,
    state_dir: Option<PathBuf>,
    out: Option<PathBuf>,
    verbose: bool,
) -> CliResult<()> {
    let config = load_config(&config_path)?;
    let backends = storage_for(state_dir);
    let mut machine = WizardMachine::new(config)?.with_storage(&backends);
    let registry = FieldRegistry::with_defaults();
    let submitter = OutputSubmitter { out };
    let mut presenter = WizardPresenter::new(Verbosity::from_verbose(verbose));

    presenter.show_header(machine.config());
    if machine.load_persisted_state() {
        presenter.show_resumed(&machine.navigation());
    }

    loop {
        if machine.state().is_completed {
            break;
        }
        let step = machine.current_step().clone();
        presenter.show_step(machine.config(), &step, &machine.navigation());

        let existing = machine
            .current_step_data()
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let values = match collect_step(&step.fields, existing, &registry, &presenter)? {
            StepInput::Back => {
                if !machine.previous_step() {
                    println!("Already at the first step.");
                }
                continue;
            }
            StepInput::Skip => {
                if !machine.skip_step() {
                    println!("This step cannot be skipped.");
                }
                continue;
            }
            StepInput::Values(values) => values,
        };

        machine.update_step_data(&step.id, Value::Object(values));
        let validation = machine.validate_current_step().await;
        if !validation.valid {
            presenter.show_step_errors(&validation.errors);
            if !step.optional {
                continue;
            }
        }
        machine.complete_step(&step.id);

        if !machine.navigation().is_last_step {
            machine.next_step();
            continue;
        }

        match machine.submit_wizard(&submitter).await? {
            SubmitOutcome::Submitted(response) => {
                presenter.show_completion(machine.config(), &response);
            }
            SubmitOutcome::Incomplete(titles) => {
                presenter.show_wizard_errors(&machine.state().wizard_errors);
                let first_missing = machine
                    .config()
                    .steps
                    .iter()
                    .position(|step| titles.first() == Some(&step.title));
                if let Some(index) = first_missing {
                    machine.go_to_step(index);
                }
            }
            SubmitOutcome::Ignored => break,
        }
    }

    Ok(())
}

/// Prompts for every visible field of a step. Visibility is recomputed after
/// each answer so later fields react to earlier ones.
fn collect_step(
    fields: &[FieldConfig],
    mut values: Map<String, Value>,
    registry: &FieldRegistry,
    presenter: &WizardPresenter,
) -> CliResult<StepInput> {
    for field in fields {
        let visibility = compute_visibility(fields, &Value::Object(values.clone()));
        if !is_field_visible(&visibility, &field.id) {
            continue;
        }
        let current = values.get(field.key()).cloned();
        loop {
            presenter.show_prompt(field, registry.hint(field).as_deref(), current.as_ref());
            let line = read_line()?;
            let trimmed = line.trim();
            if trimmed.eq_ignore_ascii_case("exit") {
                return Err("wizard aborted by user".into());
            }
            if trimmed == ":back" {
                return Ok(StepInput::Back);
            }
            if trimmed == ":skip" {
                return Ok(StepInput::Skip);
            }
            if trimmed.is_empty()
                && let Some(current) = &current
                && !current.is_null()
            {
                break;
            }
            match registry.parse(field, trimmed) {
                Ok(value) => {
                    values.insert(field.key().to_string(), value);
                    break;
                }
                Err(err) => presenter.show_parse_error(&err),
            }
        }
    }
    Ok(StepInput::Values(values))
}

fn read_line() -> CliResult<String> {
    print!("> ");
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Err("input closed before the wizard finished".into());
    }
    Ok(input)
}

async fn run_validate(config_path: PathBuf, step_id: String, data_path: PathBuf) -> CliResult<()> {
    let config = load_config(&config_path)?;
    let step = config
        .step(&step_id)
        .ok_or_else(|| format!("step '{}' not found", step_id))?;
    let data: Value = serde_json::from_str(&fs::read_to_string(data_path)?)?;

    let schemas = SchemaRegistry::new();
    let mut validator = StepValidator::new(step, schemas.resolve(step));
    let result = validator.validate(&data).await;
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    if !result.errors.is_empty() {
        println!("Errors:");
        for (field, message) in &result.errors {
            println!("  {} - {}", field, message);
        }
    }

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn run_visibility(form_path: PathBuf, values_path: PathBuf) -> CliResult<()> {
    let form_json = fs::read_to_string(form_path)?;
    let values_json = fs::read_to_string(values_path)?;
    let form: FormConfig = serde_json::from_str(&form_json)?;

    let visibility = parse_component_result(&component_visibility(&form_json, &values_json))?;
    for field in form.all_fields() {
        let visible = visibility
            .get(&field.id)
            .and_then(Value::as_bool)
            .unwrap_or(true);
        println!("{}: {}", field.id, if visible { "visible" } else { "hidden" });
    }

    let report = parse_component_result(&component_validate_form(&form_json, &values_json))?;
    if let Some(missing) = report.get("missing_required").and_then(Value::as_array)
        && !missing.is_empty()
    {
        let names = missing
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        println!("Missing required fields: {}", names);
    }
    if let Some(errors) = report.get("errors").and_then(Value::as_object) {
        for (field, message) in errors {
            println!("  {} - {}", field, message.as_str().unwrap_or_default());
        }
    }
    Ok(())
}

/// Reads the saved snapshot directly, so `restore_on_mount` does not apply.
fn run_status(config_path: PathBuf, state_dir: Option<PathBuf>) -> CliResult<()> {
    let config = load_config(&config_path)?;
    let persistence_config = config
        .active_persistence()
        .cloned()
        .ok_or_else(|| format!("wizard '{}' does not persist its progress", config.id))?;
    let persistence = WizardPersistence::new(persistence_config, &storage_for(state_dir));

    let mut state = WizardState::initial(&config);
    match persistence.load() {
        Some(snapshot) => state.restore(snapshot, &config),
        None => println!("No saved progress."),
    }
    let presenter = WizardPresenter::new(Verbosity::Clean);
    presenter.show_status(&config, &state, &navigation(&config, &state));
    Ok(())
}

fn run_schema(form: bool) -> CliResult<()> {
    let schema = if form {
        schemars::schema_for!(FormConfig)
    } else {
        schemars::schema_for!(WizardConfig)
    };
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
