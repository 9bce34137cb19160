use handlebars::Handlebars;
use serde_json::json;

use crate::spec::wizard::DEFAULT_INCOMPLETE_MESSAGE;

/// Renders wizard-level user messages from handlebars templates.
pub struct MessageTemplates {
    engine: Handlebars<'static>,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageTemplates {
    pub fn new() -> Self {
        let mut engine = Handlebars::new();
        engine.register_escape_fn(handlebars::no_escape);
        Self { engine }
    }

    /// Message listing the required steps still missing. Falls back to the
    /// default template when `template` does not render.
    pub fn incomplete_steps(&self, template: &str, titles: &[String]) -> String {
        let data = json!({
            "steps": titles.join(", "),
            "step_titles": titles,
            "count": titles.len(),
        });
        match self.engine.render_template(template, &data) {
            Ok(message) => message,
            Err(err) => {
                log::warn!("invalid incomplete-steps template: {}", err);
                self.engine
                    .render_template(DEFAULT_INCOMPLETE_MESSAGE, &data)
                    .unwrap_or_else(|_| format!("Please complete all required steps: {}", titles.join(", ")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_lists_titles() {
        let templates = MessageTemplates::new();
        let message = templates.incomplete_steps(
            DEFAULT_INCOMPLETE_MESSAGE,
            &["Project Information".into(), "Review & Submit".into()],
        );
        assert_eq!(
            message,
            "Please complete all required steps: Project Information, Review & Submit"
        );
    }

    #[test]
    fn custom_templates_can_use_count() {
        let templates = MessageTemplates::new();
        let message = templates.incomplete_steps("{{count}} step(s) left", &["A".into()]);
        assert_eq!(message, "1 step(s) left");
    }

    #[test]
    fn broken_templates_fall_back() {
        let templates = MessageTemplates::new();
        let message = templates.incomplete_steps("{{#if}}", &["A".into()]);
        assert_eq!(message, "Please complete all required steps: A");
    }
}
