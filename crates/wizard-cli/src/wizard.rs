use serde_json::Value;
use wizard_spec::{
    FieldConfig, FieldErrors, InputError, NavigationInfo, WizardConfig, WizardState, WizardStep,
};

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: step headers and prompts only.
    Clean,
    /// Verbose output: progress, step statuses, parse expectations.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints the wizard as the user moves through it.
pub struct WizardPresenter {
    verbosity: Verbosity,
    header_printed: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            header_printed: false,
        }
    }

    pub fn show_header(&mut self, config: &WizardConfig) {
        if self.header_printed {
            return;
        }
        println!("Wizard: {}", config.title);
        if let Some(description) = &config.description {
            println!("{}", description);
        }
        println!("Type ':back' to return, ':skip' to skip a skippable step, 'exit' to stop.");
        self.header_printed = true;
    }

    pub fn show_resumed(&self, nav: &NavigationInfo) {
        println!(
            "Resuming saved progress at step {}/{}.",
            nav.current_step_number, nav.total_steps
        );
    }

    pub fn show_step(&self, config: &WizardConfig, step: &WizardStep, nav: &NavigationInfo) {
        println!();
        let mut line = if config.show_step_numbers {
            format!("Step {}/{}: {}", nav.current_step_number, nav.total_steps, step.title)
        } else {
            step.title.clone()
        };
        if step.optional {
            line.push_str(" (optional)");
        }
        println!("{}", line);
        if let Some(description) = &step.description {
            println!("{}", description);
        }
        if config.show_progress_bar && self.verbosity.is_verbose() {
            println!("Progress: {:.0}%", nav.progress);
        }
    }

    pub fn show_prompt(&self, field: &FieldConfig, hint: Option<&str>, current: Option<&Value>) {
        let mut line = field.label.clone();
        if field.required {
            line.push_str(" *");
        }
        if let Some(hint) = hint {
            line.push(' ');
            line.push_str(hint);
        }
        if let Some(current) = current.filter(|value| !value.is_null()) {
            line.push_str(&format!(" [{}]", display_value(current)));
        }
        println!("{}", line);
        if let Some(help) = &field.help_text {
            println!("  {}", help);
        }
    }

    pub fn show_parse_error(&self, error: &InputError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_step_errors(&self, errors: &FieldErrors) {
        eprintln!("Please fix the following:");
        for (field, message) in errors {
            eprintln!("  {} - {}", field, message);
        }
    }

    pub fn show_wizard_errors(&self, errors: &[String]) {
        for error in errors {
            eprintln!("{}", error);
        }
    }

    pub fn show_status(&self, config: &WizardConfig, state: &WizardState, nav: &NavigationInfo) {
        println!("Wizard: {}", config.title);
        println!(
            "Current step: {}/{} ({})",
            nav.current_step_number,
            nav.total_steps,
            config.steps[state.current_step_index].title
        );
        println!("Progress: {:.0}%", nav.progress);
        for step in &config.steps {
            println!(" - {} [{}]", step.title, state.status_of(&step.id).as_str());
        }
        if state.is_completed {
            println!("Submitted.");
        }
    }

    pub fn show_completion(&self, config: &WizardConfig, response: &Value) {
        let message = config
            .submit
            .as_ref()
            .and_then(|submit| submit.success_message.as_deref())
            .unwrap_or("Wizard completed.");
        println!("{}", message);
        if self.verbosity.is_verbose() && !response.is_null() {
            println!("Response: {}", response);
        }
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
