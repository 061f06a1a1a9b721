//! # Constraint Documents
//!
//! Loads vendor field constraints from a JSON or YAML document and lists
//! the constraints a registry holds.
//!
//! ```yaml
//! fields:
//!   date_of_birth:
//!     type: string
//!     format: date
//!     description: an ISO 8601 date
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use cardbot_profile::{is_base_field, ConstraintRegistry};
use clap::Args;
use serde::Serialize;
use serde_json::Value;

/// Arguments for the constraints subcommand.
#[derive(Args, Debug)]
pub struct ConstraintsArgs {
    /// Constraint document to merge on top of the base schema.
    #[arg(long)]
    pub constraints: Option<PathBuf>,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Parse a constraint document. YAML when `yaml` is set, JSON otherwise.
pub fn parse_document(content: &str, yaml: bool) -> anyhow::Result<Value> {
    if yaml {
        serde_yaml::from_str(content).context("invalid YAML constraint document")
    } else {
        serde_json::from_str(content).context("invalid JSON constraint document")
    }
}

/// Build the registry used for validation: the shared base registry when
/// `path` is `None`, otherwise the base plus the document's constraints.
pub fn load_registry(path: Option<&Path>) -> anyhow::Result<Arc<ConstraintRegistry>> {
    let Some(path) = path else {
        return Ok(ConstraintRegistry::shared_base()?);
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read constraint document {}", path.display()))?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let document = parse_document(&content, yaml)
        .with_context(|| format!("loading {}", path.display()))?;
    let registry = ConstraintRegistry::from_document(&document)
        .with_context(|| format!("building constraints from {}", path.display()))?;

    tracing::debug!(
        path = %path.display(),
        constraints = registry.len(),
        "loaded constraint document"
    );
    Ok(Arc::new(registry))
}

/// One row of the constraint listing.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ConstraintRow {
    pub field: String,
    pub requirement: String,
    pub base: bool,
}

/// Describe every constraint in `registry`, in registration order.
pub fn describe(registry: &ConstraintRegistry) -> Vec<ConstraintRow> {
    registry
        .fields()
        .filter_map(|field| {
            registry.get(field).map(|c| ConstraintRow {
                field: field.to_string(),
                requirement: c.describe().to_string(),
                base: is_base_field(field),
            })
        })
        .collect()
}

/// Handler for `cardbot constraints`.
pub fn run(args: &ConstraintsArgs) -> anyhow::Result<()> {
    let registry = load_registry(args.constraints.as_deref())?;
    let rows = describe(&registry);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in rows {
            let marker = if row.base { " (base)" } else { "" };
            println!("{}{}: must be {}", row.field, marker, row.requirement);
        }
    }
    Ok(())
}
