//! # Validate Subcommand
//!
//! Loads one profile document, runs base validation, then checks any
//! `--require`d vendor fields through `Profile::validate_fields`.
//!
//! The outcome is always rendered as a [`ValidateReport`]; the process exit
//! status is non-zero whenever the report is not valid.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use cardbot_profile::{ConstraintRegistry, ProfileError, ProfileLoader};
use clap::{Args, ValueEnum};
use serde::Serialize;

use crate::constraints::load_registry;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Profile document (JSON). Reads stdin when omitted or `-`.
    pub path: Option<PathBuf>,

    /// Field that must be present and valid beyond the base schema.
    /// May be repeated.
    #[arg(long = "require", value_name = "FIELD")]
    pub require: Vec<String>,

    /// Constraint document (JSON, or YAML by extension) for vendor fields.
    #[arg(long)]
    pub constraints: Option<PathBuf>,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// How the report is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Where validation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Input could not be turned into a record.
    Load,
    /// The base schema rejected the record.
    Base,
    /// A required vendor field failed.
    Fields,
}

/// One failing field in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportFailure {
    pub field: String,
    pub kind: &'static str,
    pub message: String,
}

/// Result of validating one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidateReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ReportFailure>,
    pub fields: Vec<String>,
}

impl ValidateReport {
    fn rejected(stage: Stage, err: &ProfileError) -> Self {
        let failures = err
            .validation()
            .map(|v| {
                v.failures()
                    .iter()
                    .map(|f| ReportFailure {
                        field: f.field.clone(),
                        kind: f.kind.as_str(),
                        message: f.message.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            valid: false,
            stage: Some(stage),
            error: err.validation().is_none().then(|| err.to_string()),
            failures,
            fields: Vec::new(),
        }
    }

    /// Render the report as human-readable text.
    pub fn to_text(&self) -> String {
        if self.valid {
            return format!("valid profile ({} fields: {})", self.fields.len(), self.fields.join(", "));
        }
        let stage = match self.stage {
            Some(Stage::Load) => "could not be loaded",
            Some(Stage::Base) => "failed base validation",
            Some(Stage::Fields) => "failed field validation",
            None => "is invalid",
        };
        let mut out = format!("profile {stage}");
        if let Some(error) = &self.error {
            out.push_str(&format!(": {error}"));
        }
        for failure in &self.failures {
            let field = if failure.field.is_empty() { "(root)" } else { &failure.field };
            out.push_str(&format!("\n  {field} ({}): {}", failure.kind, failure.message));
        }
        out
    }
}

/// Validate `input` against `registry`, then check `required` fields.
pub fn validate_input(
    input: Vec<u8>,
    registry: std::sync::Arc<ConstraintRegistry>,
    required: &[String],
) -> ValidateReport {
    let profile = match ProfileLoader::new(registry).create(input) {
        Ok(profile) => profile,
        Err(err) => {
            let stage = if err.validation().is_some() {
                Stage::Base
            } else {
                Stage::Load
            };
            return ValidateReport::rejected(stage, &err);
        }
    };

    if let Err(err) = profile.validate_fields(required) {
        return ValidateReport::rejected(Stage::Fields, &err);
    }

    ValidateReport {
        valid: true,
        stage: None,
        error: None,
        failures: Vec::new(),
        fields: profile.fields().map(str::to_string).collect(),
    }
}

fn read_input(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read(path)
            .with_context(|| format!("cannot read profile document {}", path.display())),
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("cannot read profile from stdin")?;
            Ok(buf)
        }
    }
}

/// Handler for `cardbot validate`. Returns whether the profile was valid.
pub fn run(args: &ValidateArgs) -> anyhow::Result<bool> {
    let registry = load_registry(args.constraints.as_deref())?;
    let input = read_input(args.path.as_deref())?;
    let report = validate_input(input, registry, &args.require);

    tracing::info!(
        valid = report.valid,
        failures = report.failures.len(),
        "profile validation finished"
    );

    match args.format {
        OutputFormat::Text => println!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(report.valid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cardbot_profile::FailureKind;
    use serde_json::json;

    fn base() -> Arc<ConstraintRegistry> {
        ConstraintRegistry::shared_base().unwrap()
    }

    const ADA: &str = r#"{"first_name":"Ada","last_name":"Lovelace","email":"ada@example.com","employer":"AE"}"#;

    #[test]
    fn valid_document_lists_fields() {
        let report = validate_input(ADA.as_bytes().to_vec(), base(), &[]);
        assert!(report.valid);
        assert_eq!(report.fields.len(), 4);
        assert!(report.to_text().starts_with("valid profile (4 fields"));
    }

    #[test]
    fn malformed_document_stops_at_load() {
        let report = validate_input(b"{not valid json".to_vec(), base(), &[]);
        assert!(!report.valid);
        assert_eq!(report.stage, Some(Stage::Load));
        assert!(report.error.as_deref().unwrap().contains("JSON parsing failed"));
        assert!(report.failures.is_empty());
    }

    #[test]
    fn base_failures_are_itemized() {
        let report = validate_input(
            br#"{"first_name":"Ada","email":"not-an-email"}"#.to_vec(),
            base(),
            &[],
        );
        assert_eq!(report.stage, Some(Stage::Base));
        assert!(report.error.is_none());
        let fields: Vec<&str> = report.failures.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(fields, vec!["last_name", "email"]);
        assert_eq!(report.failures[0].kind, FailureKind::Missing.as_str());
    }

    #[test]
    fn non_object_document_fails_at_root() {
        let report = validate_input(b"[1, 2]".to_vec(), base(), &[]);
        assert_eq!(report.stage, Some(Stage::Base));
        assert!(report.error.is_none());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Invalid.as_str());
        assert!(report
            .to_text()
            .contains("(root) (invalid): profile must be an object, got array"));
    }

    #[test]
    fn required_fields_are_checked_after_base() {
        let report = validate_input(
            ADA.as_bytes().to_vec(),
            base(),
            &["employer".to_string(), "ssn".to_string()],
        );
        assert_eq!(report.stage, Some(Stage::Fields));
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].field, "ssn");
        assert!(report.to_text().contains("ssn (missing)"));
    }

    #[test]
    fn json_report_omits_empty_sections() {
        let report = validate_input(ADA.as_bytes().to_vec(), base(), &[]);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["valid"], json!(true));
        assert!(value.get("stage").is_none());
        assert!(value.get("failures").is_none());
    }
}
