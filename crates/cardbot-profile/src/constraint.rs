//! # Field Constraints
//!
//! A field constraint is a predicate over one field's value plus a
//! human-readable statement of what it requires. Constraints are collected
//! into a [`ConstraintRegistry`], and [`ConstraintRegistry::evaluate`] is the
//! single evaluator used both for base validation at construction time and
//! for caller-requested checks via `Profile::validate_fields`.
//!
//! ## Base Schema
//!
//! Every registry starts from the same three constraints, which cannot be
//! replaced:
//!
//! | Field        | Requirement                       |
//! |--------------|-----------------------------------|
//! | `first_name` | non-empty text                    |
//! | `last_name`  | non-empty text                    |
//! | `email`      | syntactically valid email address |
//!
//! ## Engine
//!
//! [`SchemaConstraint`] compiles a JSON Schema fragment (Draft 2020-12, with
//! `format` treated as an assertion) using the `jsonschema` crate. The
//! engine's raw errors are kept as [`Violation`]s for diagnostics.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock};

use jsonschema::Validator;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::error::{FieldFailure, ValidationError, Violation};

/// The fields every profile must carry, in evaluation order.
pub const BASE_FIELDS: [&str; 3] = ["first_name", "last_name", "email"];

/// Error building a constraint or registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The JSON Schema fragment could not be compiled.
    #[error("invalid constraint schema: {reason}")]
    InvalidSchema {
        /// Compiler message.
        reason: String,
    },

    /// A caller tried to replace one of the base constraints.
    #[error("field '{field}' belongs to the base schema and cannot be re-registered")]
    BaseFieldOverride {
        /// The base field.
        field: String,
    },

    /// A constraint for this field already exists.
    #[error("a constraint for field '{field}' is already registered")]
    Duplicate {
        /// The duplicated field.
        field: String,
    },

    /// A constraint document did not have the expected shape.
    #[error("malformed constraint document: {reason}")]
    MalformedDocument {
        /// What was wrong with it.
        reason: String,
    },
}

/// A named rule a field's value must satisfy.
///
/// Presence is checked by the evaluator before the constraint runs, so
/// `check` only ever sees values that exist in the record.
pub trait FieldConstraint: Send + Sync + fmt::Debug {
    /// What the constraint requires, phrased to follow "must be".
    fn describe(&self) -> &str;

    /// Check `value` (stored under `field`), returning every violation.
    fn check(&self, field: &str, value: &Value) -> Result<(), Vec<Violation>>;
}

// ─── Schema-backed constraint ────────────────────────────────────────

/// A constraint backed by a compiled JSON Schema fragment.
pub struct SchemaConstraint {
    schema: Value,
    validator: Validator,
    description: String,
}

impl SchemaConstraint {
    /// Compile `schema` into a constraint described by `description`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidSchema`] if the fragment is not a
    /// valid JSON Schema.
    pub fn new(schema: Value, description: impl Into<String>) -> Result<Self, RegistryError> {
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .should_validate_formats(true)
            .build(&schema)
            .map_err(|e| RegistryError::InvalidSchema {
                reason: e.to_string(),
            })?;
        Ok(Self {
            schema,
            validator,
            description: description.into(),
        })
    }

    /// Compile `schema`, deriving the description from its `description`
    /// keyword, or from its `type` when there is none.
    pub fn from_schema(schema: Value) -> Result<Self, RegistryError> {
        let description = schema
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| {
                schema
                    .get("type")
                    .and_then(Value::as_str)
                    .map(|t| format!("of type {t}"))
            })
            .unwrap_or_else(|| "valid".to_string());
        Self::new(schema, description)
    }

    /// Text with at least one character.
    pub fn non_empty_string() -> Result<Self, RegistryError> {
        Self::new(json!({ "type": "string", "minLength": 1 }), "non-empty text")
    }

    /// Text that is a syntactically valid email address.
    pub fn email() -> Result<Self, RegistryError> {
        Self::new(
            json!({ "type": "string", "minLength": 1, "format": "email" }),
            "a valid email address",
        )
    }

    /// The source schema.
    pub fn schema(&self) -> &Value {
        &self.schema
    }
}

impl fmt::Debug for SchemaConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaConstraint")
            .field("schema", &self.schema)
            .field("description", &self.description)
            .finish()
    }
}

impl FieldConstraint for SchemaConstraint {
    fn describe(&self) -> &str {
        &self.description
    }

    fn check(&self, field: &str, value: &Value) -> Result<(), Vec<Violation>> {
        let base = field_pointer(field);
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(value)
            .map(|e| Violation {
                field: field.to_string(),
                instance_path: format!("{base}{}", e.instance_path),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

// ─── Predicate constraint ────────────────────────────────────────────

type Predicate = dyn Fn(&Value) -> bool + Send + Sync;

/// A constraint defined by an arbitrary predicate.
pub struct PredicateConstraint {
    predicate: Box<Predicate>,
    reason: String,
}

impl PredicateConstraint {
    /// Build a constraint that passes when `predicate` returns true.
    /// `reason` states the requirement ("a positive number").
    pub fn new<F>(reason: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            reason: reason.into(),
        }
    }
}

impl fmt::Debug for PredicateConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateConstraint")
            .field("reason", &self.reason)
            .finish_non_exhaustive()
    }
}

impl FieldConstraint for PredicateConstraint {
    fn describe(&self) -> &str {
        &self.reason
    }

    fn check(&self, field: &str, value: &Value) -> Result<(), Vec<Violation>> {
        if (self.predicate)(value) {
            Ok(())
        } else {
            Err(vec![Violation {
                field: field.to_string(),
                instance_path: field_pointer(field),
                schema_path: String::new(),
                message: format!("{value} is not {}", self.reason),
            }])
        }
    }
}

// ─── Registry ────────────────────────────────────────────────────────

/// Ordered set of named field constraints.
///
/// Always contains the base constraints. Shared between profiles via `Arc`;
/// it is never mutated once a profile holds it.
#[derive(Debug, Clone)]
pub struct ConstraintRegistry {
    entries: Vec<(String, Arc<dyn FieldConstraint>)>,
}

impl ConstraintRegistry {
    /// A registry holding exactly the base constraints.
    pub fn base() -> Result<Self, RegistryError> {
        let names: Arc<dyn FieldConstraint> = Arc::new(SchemaConstraint::non_empty_string()?);
        let email: Arc<dyn FieldConstraint> = Arc::new(SchemaConstraint::email()?);
        Ok(Self {
            entries: vec![
                (BASE_FIELDS[0].to_string(), Arc::clone(&names)),
                (BASE_FIELDS[1].to_string(), names),
                (BASE_FIELDS[2].to_string(), email),
            ],
        })
    }

    /// The process-wide base registry, compiled on first use.
    pub fn shared_base() -> Result<Arc<Self>, RegistryError> {
        static BASE: OnceLock<Arc<ConstraintRegistry>> = OnceLock::new();
        if let Some(registry) = BASE.get() {
            return Ok(Arc::clone(registry));
        }
        let registry = Arc::new(Self::base()?);
        Ok(Arc::clone(BASE.get_or_init(|| registry)))
    }

    /// Build a registry from a constraint document on top of the base
    /// constraints.
    ///
    /// The document has the shape
    /// `{"fields": {"<field>": <JSON Schema fragment>, ...}}`.
    pub fn from_document(document: &Value) -> Result<Self, RegistryError> {
        let fields = document
            .as_object()
            .ok_or_else(|| RegistryError::MalformedDocument {
                reason: "document must be an object".to_string(),
            })?
            .get("fields")
            .and_then(Value::as_object)
            .ok_or_else(|| RegistryError::MalformedDocument {
                reason: "document must contain a \"fields\" object".to_string(),
            })?;

        let mut registry = Self::base()?;
        for (field, schema) in fields {
            let constraint = SchemaConstraint::from_schema(schema.clone()).map_err(|e| {
                RegistryError::MalformedDocument {
                    reason: format!("field '{field}': {e}"),
                }
            })?;
            registry.register(field, constraint)?;
        }
        Ok(registry)
    }

    /// Register a constraint for `field`.
    ///
    /// # Errors
    ///
    /// [`RegistryError::BaseFieldOverride`] for base fields,
    /// [`RegistryError::Duplicate`] if `field` already has a constraint.
    pub fn register(
        &mut self,
        field: impl Into<String>,
        constraint: impl FieldConstraint + 'static,
    ) -> Result<&mut Self, RegistryError> {
        let field = field.into();
        if is_base_field(&field) {
            return Err(RegistryError::BaseFieldOverride { field });
        }
        if self.get(&field).is_some() {
            return Err(RegistryError::Duplicate { field });
        }
        self.entries.push((field, Arc::new(constraint)));
        Ok(self)
    }

    /// Compile `schema` and register it for `field`.
    pub fn register_schema(
        &mut self,
        field: impl Into<String>,
        schema: Value,
    ) -> Result<&mut Self, RegistryError> {
        let constraint = SchemaConstraint::from_schema(schema)?;
        self.register(field, constraint)
    }

    /// The constraint registered for `field`.
    pub fn get(&self, field: &str) -> Option<&dyn FieldConstraint> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, c)| c.as_ref())
    }

    /// Registered field names in registration order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of registered constraints, base included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Never true; the base constraints are always present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check `fields` of `record`, collecting every failure.
    ///
    /// Each field must be present. A present field is then checked against
    /// its registered constraint, or, when none is registered, must not be
    /// null. Duplicate names are checked once; order is preserved.
    pub fn evaluate<I, S>(&self, record: &Map<String, Value>, fields: I) -> Result<(), ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut failures = Vec::new();
        let mut diagnostics = Vec::new();

        for field in fields {
            let field = field.as_ref();
            if !seen.insert(field.to_string()) {
                continue;
            }

            let Some(value) = record.get(field) else {
                failures.push(FieldFailure::missing(field));
                diagnostics.push(Violation::missing(field));
                continue;
            };

            match self.get(field) {
                Some(constraint) => {
                    if let Err(violations) = constraint.check(field, value) {
                        failures.push(FieldFailure::invalid(field, constraint.describe()));
                        diagnostics.extend(violations);
                    }
                }
                None if value.is_null() => {
                    failures.push(FieldFailure::invalid(field, "a non-null value"));
                    diagnostics.push(Violation {
                        field: field.to_string(),
                        instance_path: field_pointer(field),
                        schema_path: String::new(),
                        message: "null is not allowed".to_string(),
                    });
                }
                None => {}
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(failures, diagnostics))
        }
    }
}

/// Whether `field` is one of the base schema fields.
pub fn is_base_field(field: &str) -> bool {
    BASE_FIELDS.contains(&field)
}

/// JSON Pointer to a top-level field (RFC 6901 escaping).
fn field_pointer(field: &str) -> String {
    format!("/{}", field.replace('~', "~0").replace('/', "~1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("fixture must be an object, got {other}"),
        }
    }

    #[test]
    fn base_registry_has_three_constraints_in_order() {
        let registry = ConstraintRegistry::base().unwrap();
        let fields: Vec<&str> = registry.fields().collect();
        assert_eq!(fields, BASE_FIELDS.to_vec());
    }

    #[test]
    fn non_empty_string_rejects_empty_and_non_text() {
        let c = SchemaConstraint::non_empty_string().unwrap();
        assert!(c.check("first_name", &json!("Ada")).is_ok());
        assert!(c.check("first_name", &json!("")).is_err());
        assert!(c.check("first_name", &json!(42)).is_err());
        assert!(c.check("first_name", &Value::Null).is_err());
    }

    #[test]
    fn email_constraint_rejects_malformed_addresses() {
        let c = SchemaConstraint::email().unwrap();
        assert!(c.check("email", &json!("ada@example.com")).is_ok());
        let violations = c.check("email", &json!("not-an-email")).unwrap_err();
        assert_eq!(violations[0].field, "email");
        assert_eq!(violations[0].instance_path, "/email");
    }

    #[test]
    fn evaluate_is_exhaustive() {
        let registry = ConstraintRegistry::base().unwrap();
        let rec = record(json!({ "first_name": "", "email": "nope" }));
        let err = registry.evaluate(&rec, BASE_FIELDS).unwrap_err();
        assert_eq!(err.fields(), vec!["first_name", "last_name", "email"]);
        assert_eq!(err.failure("first_name").unwrap().kind, FailureKind::Invalid);
        assert_eq!(err.failure("last_name").unwrap().kind, FailureKind::Missing);
        assert!(!err.diagnostics().is_empty());
    }

    #[test]
    fn evaluate_checks_duplicates_once_and_keeps_order() {
        let registry = ConstraintRegistry::base().unwrap();
        let rec = record(json!({}));
        let err = registry
            .evaluate(&rec, ["ssn", "email", "ssn"])
            .unwrap_err();
        assert_eq!(err.fields(), vec!["ssn", "email"]);
    }

    #[test]
    fn unregistered_fields_must_be_present_and_non_null() {
        let registry = ConstraintRegistry::base().unwrap();
        let rec = record(json!({ "income": 0, "employer": null }));
        assert!(registry.evaluate(&rec, ["income"]).is_ok());
        let err = registry.evaluate(&rec, ["employer"]).unwrap_err();
        assert_eq!(err.failure("employer").unwrap().kind, FailureKind::Invalid);
    }

    #[test]
    fn register_rejects_base_override_and_duplicates() {
        let mut registry = ConstraintRegistry::base().unwrap();
        let err = registry
            .register("email", SchemaConstraint::non_empty_string().unwrap())
            .unwrap_err();
        assert!(matches!(err, RegistryError::BaseFieldOverride { .. }));

        registry
            .register_schema("ssn", json!({ "type": "string", "pattern": "^[0-9]{9}$" }))
            .unwrap();
        let err = registry
            .register_schema("ssn", json!({ "type": "string" }))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { .. }));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn predicate_constraint_reports_reason() {
        let mut registry = ConstraintRegistry::base().unwrap();
        registry
            .register(
                "annual_income",
                PredicateConstraint::new("a positive number", |v| {
                    v.as_f64().is_some_and(|n| n > 0.0)
                }),
            )
            .unwrap();
        let rec = record(json!({ "annual_income": -5 }));
        let err = registry.evaluate(&rec, ["annual_income"]).unwrap_err();
        assert_eq!(
            err.failures()[0].message,
            "\"annual_income\" must be a positive number"
        );
    }

    #[test]
    fn from_document_adds_vendor_fields() {
        let doc = json!({
            "fields": {
                "date_of_birth": { "type": "string", "format": "date", "description": "an ISO 8601 date" },
                "ssn": { "type": "string", "pattern": "^[0-9]{9}$" }
            }
        });
        let registry = ConstraintRegistry::from_document(&doc).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get("date_of_birth").unwrap().describe(), "an ISO 8601 date");
        assert_eq!(registry.get("ssn").unwrap().describe(), "of type string");
    }

    #[test]
    fn from_document_rejects_bad_shapes() {
        assert!(matches!(
            ConstraintRegistry::from_document(&json!([])),
            Err(RegistryError::MalformedDocument { .. })
        ));
        assert!(matches!(
            ConstraintRegistry::from_document(&json!({ "rules": {} })),
            Err(RegistryError::MalformedDocument { .. })
        ));
        assert!(matches!(
            ConstraintRegistry::from_document(&json!({ "fields": { "email": { "type": "string" } } })),
            Err(RegistryError::BaseFieldOverride { .. })
        ));
        assert!(matches!(
            ConstraintRegistry::from_document(&json!({ "fields": { "x": { "type": 12 } } })),
            Err(RegistryError::MalformedDocument { .. })
        ));
    }

    #[test]
    fn shared_base_is_cached() {
        let a = ConstraintRegistry::shared_base().unwrap();
        let b = ConstraintRegistry::shared_base().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn field_pointer_escapes_reserved_characters() {
        assert_eq!(field_pointer("a/b~c"), "/a~1b~0c");
    }
}
