//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the plan-delegator CLI.

use delegator::types::{FailureRecord, PlanResult, Step};
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the plan-delegator banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}\n",
                "plan-delegator".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            println!("\n   plan-delegator v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a step message (for multi-step operations)
    pub fn step(&self, step_num: usize, total: usize, message: &str) {
        if self.colored {
            println!(
                "  {} {}",
                format!("[{}/{}]", step_num, total).dimmed(),
                message.bright_white()
            );
        } else {
            println!("  [{}/{}] {}", step_num, total, message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "✓".green().bold(),
                file_type.dimmed(),
                path.bright_white()
            );
        } else {
            println!("  [CREATED] {} {}", file_type, path);
        }
    }

    /// Print a file skipped message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            println!(
                "  {} {} {}",
                "○".yellow(),
                path.dimmed(),
                format!("({})", reason).yellow()
            );
        } else {
            println!("  [SKIPPED] {} ({})", path, reason);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a subheader
    pub fn subheader(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.cyan().bold());
        } else {
            println!("\n  --- {} ---", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a list item
    pub fn list_item(&self, item: &str) {
        if self.colored {
            println!("    {} {}", "•".blue(), item);
        } else {
            println!("    - {}", item);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print a command suggestion
    pub fn command(&self, cmd: &str) {
        if self.colored {
            println!("     {}", format!("$ {}", cmd).bright_cyan());
        } else {
            println!("     $ {}", cmd);
        }
    }

    /// Print completion message
    pub fn complete(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "🚀".green(), message.bright_green().bold());
        } else {
            println!("\n  [DONE] {}", message);
        }
    }

    /// Print a table header row
    pub fn table_header(&self, columns: &[&str]) {
        let header = columns
            .iter()
            .map(|c| format!("{:<20}", c))
            .collect::<Vec<_>>()
            .join(" ");
        if self.colored {
            println!("    {}", header.bright_white().bold());
            println!("    {}", "─".repeat(columns.len() * 21).dimmed());
        } else {
            println!("    {}", header);
            println!("    {}", "-".repeat(columns.len() * 21));
        }
    }

    /// Print a table row
    pub fn table_row(&self, values: &[&str]) {
        let row = values
            .iter()
            .map(|v| format!("{:<20}", v))
            .collect::<Vec<_>>()
            .join(" ");
        println!("    {}", row);
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }

    /// Print the outcome of a plan execution
    pub fn plan_summary(&self, result: &PlanResult) {
        self.header("Plan");
        let total = result.steps.len();
        for (index, step) in result.steps.iter().enumerate() {
            self.step(index + 1, total, &step_label(step));
        }

        if !result.per_capability_state.is_empty() {
            self.subheader("Capabilities touched");
            for (capability, context) in &result.per_capability_state {
                self.success(capability);
                let fragment = context.narrative_fragment.trim();
                if !fragment.is_empty() {
                    self.list_item(fragment);
                }
            }
        }

        if !result.failures.is_empty() {
            self.subheader("Failures");
            for failure in &result.failures {
                self.failure(failure);
            }
        }

        if let Some(response) = &result.final_response {
            self.subheader("Final response");
            println!("    {}", response);
        }

        let failed = result.failures.len();
        if failed == 0 {
            self.complete(&format!("Plan finished: {} step(s)", total));
        } else {
            self.warning(&format!(
                "Plan finished: {} step(s), {} failed",
                total, failed
            ));
        }
    }

    fn failure(&self, failure: &FailureRecord) {
        self.error(&format!(
            "{} [{}] {}",
            failure.capability,
            failure.kind.as_str(),
            failure.step_action_text
        ));
        self.kv("error", &failure.error);
    }
}

fn step_label(step: &Step) -> String {
    match &step.capability {
        Some(capability) => format!("{} ({})", step.action_text, capability),
        None => step.action_text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delegator::types::{CapabilityContext, Classification, FailureKind};
    use std::collections::BTreeMap;

    fn sample_result() -> PlanResult {
        let mut state = BTreeMap::new();
        state.insert(
            "Cal".to_string(),
            CapabilityContext {
                narrative_fragment: "The Cal id is 123. ".to_string(),
                serialized_request_body: r#"{"id":"123"}"#.to_string(),
                retrieval_match: None,
            },
        );
        PlanResult {
            steps: vec![
                Step::new("1", "Find a free day", Classification::InformationAnalysis),
                Step::new("2", "Create the meeting", Classification::Operation)
                    .with_capability("Cal"),
            ],
            narrative: "AI_RESPONSE is Tuesday".to_string(),
            per_capability_state: state,
            failures: vec![FailureRecord {
                step_action_text: "Invite Dana".to_string(),
                capability: "Zoom".to_string(),
                kind: FailureKind::Dispatch,
                raw_model_output: "{}".to_string(),
                attempted_request_body: None,
                error: "Dispatch error: 500".to_string(),
                retrieval_match: None,
            }],
            final_response: Some(r#"{"id":"123"}"#.to_string()),
        }
    }

    #[test]
    fn test_output_new() {
        let output = Output::new();
        assert!(output.colored);
    }

    #[test]
    fn test_output_no_color() {
        let output = Output::no_color();
        assert!(!output.colored);
    }

    #[test]
    fn test_output_default() {
        let output = Output::default();
        assert!(output.colored);
    }

    #[test]
    fn test_step_label_names_capability() {
        let step = Step::new("2", "Create the meeting", Classification::Operation)
            .with_capability("Cal");
        assert_eq!(step_label(&step), "Create the meeting (Cal)");

        let step = Step::new("1", "Think", Classification::InformationAnalysis);
        assert_eq!(step_label(&step), "Think");
    }

    #[test]
    fn test_table_formatting() {
        // Verify table output doesn't panic with various inputs
        let output = Output::no_color();

        output.table_header(&["Name", "Kind", "Auth"]);
        output.table_header(&[]);
        output.table_row(&["Google Calendar", "google-calendar", "google-proxy"]);
        output.table_row(&[]);
    }

    #[test]
    fn test_plan_summary_no_panic() {
        Output::no_color().plan_summary(&sample_result());
        Output::new().plan_summary(&sample_result());
    }

    #[test]
    fn test_output_methods_no_panic() {
        // Smoke test - ensure none of the output methods panic
        for output in [Output::no_color(), Output::new()] {
            output.banner();
            output.success("test success");
            output.info("test info");
            output.warning("test warning");
            output.error("test error");
            output.step(1, 3, "step message");
            output.created("file", "path/to/file");
            output.skipped("path", "reason");
            output.header("Test Header");
            output.subheader("Test Subheader");
            output.kv("key", "value");
            output.list_item("item");
            output.hint("hint message");
            output.command("some command");
            output.complete("complete message");
            output.newline();
        }
    }
}
