use clap::{Parser, Subcommand, ValueEnum};
use component_form::{answers as component_answers, explain_field};
use form_spec::{
    FormSpec, LintReport, VisibilityMode, build_report, lint, report_json, report_text,
};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Questionnaire visibility rule checker",
    long_about = "Evaluates enableWhen rules of a form document, explains individual decisions, and lints rules that can never match"
)]
struct Cli {
    /// Log evaluation details to stderr (overridden by FORMKIT_LOG).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    /// Show every field, as the editor does while preview is off.
    Edit,
    /// Apply enableWhen rules.
    Preview,
}

impl From<Mode> for VisibilityMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Edit => VisibilityMode::Edit,
            Mode::Preview => VisibilityMode::Preview,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// List every field with its current visibility.
    Check {
        /// Path to the form JSON document.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_enum, env = "FORMKIT_MODE", default_value_t = Mode::Preview)]
        mode: Mode,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show how each condition of one field evaluated.
    Explain {
        /// Path to the form JSON document.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Id of the field to explain.
        #[arg(long, value_name = "ID")]
        field: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Report rules that can never match, duplicate ids, and cycles.
    Lint {
        /// Path to the form JSON document.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
    },
    /// Print the answers of the visible fields as JSON.
    Answers {
        /// Path to the form JSON document.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_enum, env = "FORMKIT_MODE", default_value_t = Mode::Preview)]
        mode: Mode,
    },
    /// Print the JSON Schema of the form document.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Command::Check { form, mode, format } => run_check(form, mode.into(), format),
        Command::Explain {
            form,
            field,
            format,
        } => run_explain(form, &field, format),
        Command::Lint { form } => run_lint(form),
        Command::Answers { form, mode } => run_answers(form, mode.into()),
        Command::Schema => run_schema(),
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("FORMKIT_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        eprintln!("formkit: logging not initialized: {}", err);
    }
}

fn load_form(path: &Path) -> CliResult<FormSpec> {
    let spec = FormSpec::load(path)?;
    debug!(form_id = %spec.id, path = %path.display(), "loaded form");
    Ok(spec)
}

fn run_check(path: PathBuf, mode: VisibilityMode, format: OutputFormat) -> CliResult<()> {
    let spec = load_form(&path)?;
    let report = build_report(&spec, mode);
    info!(visible = report.visible, total = report.total, "visibility resolved");
    match format {
        OutputFormat::Text => println!("{}", report_text(&report)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report_json(&report))?
        ),
    }
    Ok(())
}

fn run_explain(path: PathBuf, field_id: &str, format: OutputFormat) -> CliResult<()> {
    let spec = load_form(&path)?;
    let explanation = parse_component_result(&explain_field(
        &spec.id,
        &component_config(&spec, VisibilityMode::Preview)?,
        field_id,
    ))?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&explanation)?),
        OutputFormat::Text => println!("{}", describe_explanation(&explanation)),
    }
    Ok(())
}

fn describe_explanation(explanation: &Value) -> String {
    let mut lines = Vec::new();
    let visible = explanation["visible"].as_bool().unwrap_or(true);
    lines.push(format!(
        "Field {}: {}",
        explanation["field_id"].as_str().unwrap_or("<unknown>"),
        if visible { "visible" } else { "hidden" }
    ));
    let conditions = explanation["conditions"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    match explanation["logic"].as_str() {
        None => lines.push("No active enableWhen rule.".to_string()),
        Some(logic) => {
            lines.push(format!(
                "Logic: {} over {} condition(s)",
                logic,
                conditions.len()
            ));
            for condition in &conditions {
                let mark = if condition["matched"].as_bool() == Some(true) {
                    "x"
                } else {
                    " "
                };
                let mut line = format!(
                    "  [{}] {} {} '{}'",
                    mark,
                    condition["target_id"].as_str().unwrap_or(""),
                    condition["operator"].as_str().unwrap_or("unknown"),
                    condition["expected"].as_str().unwrap_or("")
                );
                match &condition["actual"] {
                    Value::Null => {}
                    actual => line.push_str(&format!(" (actual: {})", actual)),
                }
                if let Some(failure) = condition["failure"].as_str() {
                    line.push_str(&format!(" <{}>", failure));
                }
                lines.push(line);
            }
        }
    }
    lines.join("\n")
}

fn run_lint(path: PathBuf) -> CliResult<()> {
    let spec = load_form(&path)?;
    let report = lint(&spec);
    println!(
        "Lint result: {}",
        if report.valid { "valid" } else { "invalid" }
    );
    describe_lint(&report);

    if report.valid {
        Ok(())
    } else {
        Err(format!("{} rule issue(s) found", report.issues.len()).into())
    }
}

fn describe_lint(report: &LintReport) {
    if report.issues.is_empty() {
        return;
    }
    println!("Issues:");
    for issue in &report.issues {
        println!(
            "  {} [{}] {}",
            issue.field_id,
            issue.code.as_str(),
            issue.message
        );
    }
}

fn run_answers(path: PathBuf, mode: VisibilityMode) -> CliResult<()> {
    let spec = load_form(&path)?;
    let answers =
        parse_component_result(&component_answers(&spec.id, &component_config(&spec, mode)?))?;
    println!("{}", serde_json::to_string_pretty(&answers)?);
    Ok(())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(FormSpec);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn component_config(spec: &FormSpec, mode: VisibilityMode) -> CliResult<String> {
    Ok(json!({
        "form_json": serde_json::to_string(spec)?,
        "mode": mode.as_str(),
    })
    .to_string())
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(error.to_string().into());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    const FORM: &str = r#"{
        "id": "cli-form",
        "title": "CLI Form",
        "fields": [
            { "id": "pet", "fieldType": "radio", "title": "Pet", "selected": "cat" },
            { "id": "cat_name", "fieldType": "input", "title": "Cat name", "answer": "Tom",
              "enableWhen": { "conditions": [
                  { "targetId": "pet", "operator": "equals", "value": "cat" }
              ] } },
            { "id": "dog_name", "fieldType": "input", "title": "Dog name", "answer": "Rex",
              "enableWhen": { "conditions": [
                  { "targetId": "pet", "operator": "equals", "value": "dog" }
              ] } }
        ]
    }"#;

    const BROKEN: &str = r#"{
        "id": "broken",
        "title": "Broken",
        "fields": [
            { "id": "a", "fieldType": "input",
              "enableWhen": { "conditions": [
                  { "targetId": "ghost", "operator": "equals", "value": "x" }
              ] } }
        ]
    }"#;

    #[test]
    fn describe_explanation_lists_conditions() {
        let explanation = json!({
            "field_id": "dog_name",
            "visible": false,
            "logic": "AND",
            "conditions": [
                { "target_id": "pet", "operator": "equals", "expected": "dog",
                  "actual": "cat", "matched": false }
            ]
        });
        let text = describe_explanation(&explanation);
        assert!(text.contains("Field dog_name: hidden"));
        assert!(text.contains("Logic: AND over 1 condition(s)"));
        assert!(text.contains("[ ] pet equals 'dog' (actual: \"cat\")"));
    }

    #[test]
    fn describe_explanation_without_rule() {
        let explanation = json!({
            "field_id": "pet",
            "visible": true,
            "logic": null,
            "conditions": []
        });
        let text = describe_explanation(&explanation);
        assert!(text.contains("No active enableWhen rule."));
    }

    #[test]
    fn parse_component_result_surfaces_errors() {
        assert!(parse_component_result(r#"{"error": "boom"}"#).is_err());
        assert_eq!(
            parse_component_result(r#"{"ok": true}"#).unwrap(),
            json!({ "ok": true })
        );
    }

    #[test]
    fn check_command_prints_visibility() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let form = workspace.child("form.json");
        form.write_str(FORM)?;

        let output = Command::cargo_bin("formkit")?
            .arg("check")
            .arg("--form")
            .arg(form.path())
            .env_remove("FORMKIT_MODE")
            .output()?;
        assert!(output.status.success());
        let stdout = String::from_utf8(output.stdout)?;
        assert!(stdout.contains("Mode: preview (2/3 visible)"));
        assert!(stdout.contains("- dog_name (Dog name) [input]"));
        Ok(())
    }

    #[test]
    fn check_command_honors_mode_env() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let form = workspace.child("form.json");
        form.write_str(FORM)?;

        let output = Command::cargo_bin("formkit")?
            .args(["check", "--format", "json", "--form"])
            .arg(form.path())
            .env("FORMKIT_MODE", "edit")
            .output()?;
        assert!(output.status.success());
        let parsed: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(parsed["mode"], "edit");
        assert_eq!(parsed["visible"], 3);
        Ok(())
    }

    #[test]
    fn answers_command_skips_hidden_fields() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("form.json");
        fs::write(&path, FORM)?;

        let output = Command::cargo_bin("formkit")?
            .arg("answers")
            .arg("--form")
            .arg(&path)
            .env_remove("FORMKIT_MODE")
            .output()?;
        assert!(output.status.success());
        let parsed: Value = serde_json::from_slice(&output.stdout)?;
        assert_eq!(parsed, json!({ "pet": "cat", "cat_name": "Tom" }));
        Ok(())
    }

    #[test]
    fn explain_command_reports_unknown_field() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = dir.path().join("form.json");
        fs::write(&path, FORM)?;

        Command::cargo_bin("formkit")?
            .args(["explain", "--field", "cat_name", "--form"])
            .arg(&path)
            .assert()
            .success();

        Command::cargo_bin("formkit")?
            .args(["explain", "--field", "missing", "--form"])
            .arg(&path)
            .assert()
            .failure();
        Ok(())
    }

    #[test]
    fn lint_command_fails_on_issues() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = assert_fs::TempDir::new()?;
        let broken = workspace.child("broken.json");
        broken.write_str(BROKEN)?;
        let clean = workspace.child("clean.json");
        clean.write_str(FORM)?;

        let output = Command::cargo_bin("formkit")?
            .arg("lint")
            .arg("--form")
            .arg(broken.path())
            .output()?;
        assert!(!output.status.success());
        let stdout = String::from_utf8(output.stdout)?;
        assert!(stdout.contains("a [dangling_target]"));

        Command::cargo_bin("formkit")?
            .arg("lint")
            .arg("--form")
            .arg(clean.path())
            .assert()
            .success();
        Ok(())
    }

    #[test]
    fn schema_command_describes_fields() -> Result<(), Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("formkit")?.arg("schema").output()?;
        assert!(output.status.success());
        let schema: Value = serde_json::from_slice(&output.stdout)?;
        assert!(schema["properties"].get("fields").is_some());
        Ok(())
    }

    #[test]
    fn repeated_logging_init_does_not_panic() {
        init_logging(false);
        init_logging(true);
        debug!("still running after a second init");
    }
}
