//! # Error Types
//!
//! Every failure the profile core can produce. All errors use `thiserror`
//! for `Display` and `Error` implementations and are returned synchronously
//! at the point of violation.
//!
//! ## Taxonomy
//!
//! - [`ProfileError::Type`]: the caller passed an unsupported input shape.
//! - [`ProfileError::Format`]: text input could not be decoded as JSON.
//! - [`ProfileError::Validation`]: the decoded value is not an object, or the
//!   record does not satisfy the field constraints. Carries an itemized
//!   [`ValidationError`].
//! - State errors ([`ProfileError::AlreadySet`], [`ProfileError::ReadOnlyField`],
//!   [`ProfileError::UnknownField`], [`ProfileError::Uninitialized`]): a
//!   programming error in the caller, never a problem with applicant data.

use std::fmt;

use thiserror::Error;

use crate::constraint::RegistryError;

/// Top-level error type for profile loading, validation and access.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// Input was neither JSON text nor a JSON object.
    #[error("expected either a JSON encoded string or an object, got {found}")]
    Type {
        /// Shape of the rejected input (e.g. `"number"`, `"array"`).
        found: &'static str,
    },

    /// Text input failed to decode.
    #[error("JSON parsing failed: {reason}")]
    Format {
        /// Message reported by the decoder.
        reason: String,
    },

    /// The record violates one or more field constraints.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A record was assigned to a profile that already holds one.
    #[error("profile is already set")]
    AlreadySet,

    /// A write was attempted through a field accessor.
    #[error("field '{field}' is a read-only field")]
    ReadOnlyField {
        /// The field the caller tried to write.
        field: String,
    },

    /// A write was attempted for a field the profile does not carry.
    #[error("field '{field}' is not present in the profile and cannot be added")]
    UnknownField {
        /// The field the caller tried to write.
        field: String,
    },

    /// The profile has not been assigned a record yet.
    #[error("profile has not been assigned a record")]
    Uninitialized,

    /// The validated record could not be projected into the requested type.
    #[error("profile projection into {target} failed: {reason}")]
    Projection {
        /// Name of the target type.
        target: &'static str,
        /// Reason reported by the deserializer.
        reason: String,
    },

    /// The constraint registry could not be built.
    #[error("constraint registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl ProfileError {
    /// The itemized validation failure, if this is a validation error.
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this error reports a caller programming error rather than bad
    /// input data.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::AlreadySet
                | Self::ReadOnlyField { .. }
                | Self::UnknownField { .. }
                | Self::Uninitialized
        )
    }
}

// ─── Validation failures ─────────────────────────────────────────────

/// Why a single field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The field is absent from the record.
    Missing,
    /// The field is present but its value violates the constraint.
    Invalid,
}

impl FailureKind {
    /// Stable lowercase name, as used in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One itemized failure: the offending field and the violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    /// Name of the offending field.
    pub field: String,
    /// Whether the field was missing or invalid.
    pub kind: FailureKind,
    /// Human-readable description of the violated constraint.
    pub message: String,
}

impl FieldFailure {
    pub(crate) fn missing(field: &str) -> Self {
        Self {
            field: field.to_string(),
            kind: FailureKind::Missing,
            message: format!("\"{field}\" is required"),
        }
    }

    pub(crate) fn invalid(field: &str, requirement: &str) -> Self {
        Self {
            field: field.to_string(),
            kind: FailureKind::Invalid,
            message: format!("\"{field}\" must be {requirement}"),
        }
    }
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.field, self.message)
        }
    }
}

/// A single violation as reported by the constraint engine, kept for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Top-level field the violation belongs to.
    pub field: String,
    /// JSON Pointer to the violating value within the record.
    pub instance_path: String,
    /// JSON Pointer within the constraint schema that triggered the error.
    pub schema_path: String,
    /// Engine message.
    pub message: String,
}

impl Violation {
    pub(crate) fn missing(field: &str) -> Self {
        Self {
            field: field.to_string(),
            instance_path: String::new(),
            schema_path: "/required".to_string(),
            message: format!("\"{field}\" is a required property"),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Itemized validation failure.
///
/// `failures` lists one entry per offending field in evaluation order.
/// `diagnostics` holds every raw violation the constraint engine produced,
/// which may be more than one per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    failures: Vec<FieldFailure>,
    diagnostics: Vec<Violation>,
}

impl ValidationError {
    pub(crate) fn new(failures: Vec<FieldFailure>, diagnostics: Vec<Violation>) -> Self {
        Self {
            failures,
            diagnostics,
        }
    }

    /// A root-level failure for decoded text whose top-level value is not
    /// an object. The failure's `field` is empty.
    pub(crate) fn not_an_object(found: &str) -> Self {
        Self::new(
            vec![FieldFailure {
                field: String::new(),
                kind: FailureKind::Invalid,
                message: format!("profile must be an object, got {found}"),
            }],
            vec![Violation {
                field: String::new(),
                instance_path: String::new(),
                schema_path: "/type".to_string(),
                message: format!("{found} is not of type \"object\""),
            }],
        )
    }

    /// The ordered per-field failures.
    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    /// The engine's full violation list.
    pub fn diagnostics(&self) -> &[Violation] {
        &self.diagnostics
    }

    /// Names of the failing fields, in order.
    pub fn fields(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.field.as_str()).collect()
    }

    /// The failure recorded for `field`, if any.
    pub fn failure(&self, field: &str) -> Option<&FieldFailure> {
        self.failures.iter().find(|f| f.field == field)
    }

    /// Number of failing fields.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always false for errors produced by the evaluator.
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Consumes self and returns the per-field failures.
    pub fn into_failures(self) -> Vec<FieldFailure> {
        self.failures
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "profile validation failed:")?;
        for failure in &self.failures {
            write!(f, "\n{failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
