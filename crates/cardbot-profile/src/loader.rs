//! # Profile Loader
//!
//! Normalizes raw input into a single in-memory record and hands it to a
//! fresh [`Profile`] for base validation.
//!
//! Accepted shapes:
//!
//! - JSON text (`&str`, `String`, or a JSON string value), decoded with
//!   `serde_json`. Decode failures are [`ProfileError::Format`].
//! - UTF-8 bytes, treated as text once decoded.
//! - A JSON object, used as-is.
//!
//! Anything else (`null`, numbers, booleans, top-level arrays) is
//! [`ProfileError::Type`]. Text that decodes to something other than an
//! object did arrive in a supported shape, so it fails validation instead:
//! [`ProfileError::Validation`] with a single root-level failure.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::constraint::ConstraintRegistry;
use crate::error::{ProfileError, ValidationError};
use crate::profile::Profile;

/// Raw input accepted by the loader.
#[derive(Debug, Clone, PartialEq)]
pub enum RawProfile {
    /// JSON encoded text.
    Text(String),
    /// JSON encoded text as bytes; must be UTF-8.
    Bytes(Vec<u8>),
    /// An in-memory JSON value.
    Value(Value),
}

impl RawProfile {
    /// Decode and normalize into a record.
    pub fn into_record(self) -> Result<Map<String, Value>, ProfileError> {
        match self {
            Self::Text(text) | Self::Value(Value::String(text)) => decode_text(&text),
            Self::Bytes(bytes) => {
                let text = std::str::from_utf8(&bytes).map_err(|e| ProfileError::Format {
                    reason: format!("input is not valid UTF-8: {e}"),
                })?;
                decode_text(text)
            }
            Self::Value(Value::Object(record)) => {
                tracing::debug!("loading profile from a JSON object");
                Ok(record)
            }
            Self::Value(other) => {
                tracing::debug!(shape = shape_name(&other), "unsupported profile input");
                Err(ProfileError::Type {
                    found: shape_name(&other),
                })
            }
        }
    }
}

impl From<&str> for RawProfile {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RawProfile {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&[u8]> for RawProfile {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for RawProfile {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Value> for RawProfile {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Map<String, Value>> for RawProfile {
    fn from(record: Map<String, Value>) -> Self {
        Self::Value(Value::Object(record))
    }
}

/// Factory for profiles bound to a constraint registry.
///
/// Profiles created by a loader validate against its registry, so
/// `validate_fields` sees every constraint registered on it.
#[derive(Debug, Clone)]
pub struct ProfileLoader {
    registry: Arc<ConstraintRegistry>,
}

impl ProfileLoader {
    /// A loader over `registry`.
    pub fn new(registry: Arc<ConstraintRegistry>) -> Self {
        Self { registry }
    }

    /// A loader over the shared base registry.
    pub fn base() -> Result<Self, ProfileError> {
        Ok(Self::new(ConstraintRegistry::shared_base()?))
    }

    /// The registry profiles are validated against.
    pub fn registry(&self) -> &Arc<ConstraintRegistry> {
        &self.registry
    }

    /// Normalize `input`, then construct and validate a profile from it.
    ///
    /// # Errors
    ///
    /// [`ProfileError::Type`] or [`ProfileError::Format`] if the input
    /// cannot be normalized; [`ProfileError::Validation`] if decoded text is
    /// not an object or the record fails the base schema.
    pub fn create(&self, input: impl Into<RawProfile>) -> Result<Profile, ProfileError> {
        let record = input.into().into_record()?;
        let profile = Profile::with_registry(Arc::clone(&self.registry));
        profile.assign(record)?;
        Ok(profile)
    }
}

fn decode_text(text: &str) -> Result<Map<String, Value>, ProfileError> {
    tracing::debug!("loading profile from JSON text");
    let value: Value = serde_json::from_str(text).map_err(|e| {
        tracing::debug!(error = %e, "profile text failed to decode");
        ProfileError::Format {
            reason: e.to_string(),
        }
    })?;
    match value {
        Value::Object(record) => Ok(record),
        other => {
            tracing::debug!(shape = shape_name(&other), "decoded profile is not an object");
            Err(ValidationError::not_an_object(shape_name(&other)).into())
        }
    }
}

/// JSON shape name used in type errors.
fn shape_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use serde_json::json;

    #[test]
    fn text_decodes_to_record() {
        let record = RawProfile::from(r#"{"a": 1}"#).into_record().unwrap();
        assert_eq!(record["a"], json!(1));
    }

    #[test]
    fn string_value_is_treated_as_text() {
        let record = RawProfile::from(json!(r#"{"a": [1, 2]}"#))
            .into_record()
            .unwrap();
        assert_eq!(record["a"], json!([1, 2]));
    }

    #[test]
    fn malformed_text_is_a_format_error() {
        let err = RawProfile::from("{not valid json").into_record().unwrap_err();
        match err {
            ProfileError::Format { reason } => assert!(!reason.is_empty()),
            other => panic!("expected Format, got {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_is_a_format_error() {
        let err = RawProfile::from(vec![0xff, 0xfe, b'{'])
            .into_record()
            .unwrap_err();
        assert!(matches!(err, ProfileError::Format { .. }));
    }

    #[test]
    fn unsupported_shapes_are_type_errors() {
        for (value, shape) in [
            (json!(42), "number"),
            (Value::Null, "null"),
            (json!(true), "boolean"),
            (json!([{ "first_name": "Ada" }]), "array"),
        ] {
            match RawProfile::from(value).into_record() {
                Err(ProfileError::Type { found }) => assert_eq!(found, shape),
                other => panic!("expected Type error for {shape}, got {other:?}"),
            }
        }
    }

    #[test]
    fn text_decoding_to_non_object_fails_validation() {
        for (text, shape) in [
            ("[1, 2, 3]", "array"),
            ("null", "null"),
            ("42", "number"),
            ("\"x\"", "string"),
        ] {
            let err = RawProfile::from(text).into_record().unwrap_err();
            let validation = err
                .validation()
                .unwrap_or_else(|| panic!("expected Validation for {text}, got {err:?}"));
            assert_eq!(validation.fields(), vec![""]);
            let failure = &validation.failures()[0];
            assert_eq!(failure.kind, FailureKind::Invalid);
            assert_eq!(failure.message, format!("profile must be an object, got {shape}"));
            assert_eq!(validation.diagnostics()[0].instance_path, "");
        }
    }

    #[test]
    fn string_value_holding_non_object_text_fails_validation() {
        let err = RawProfile::from(json!("[]")).into_record().unwrap_err();
        assert!(err.validation().is_some(), "got {err:?}");
    }

    #[test]
    fn loader_binds_profiles_to_its_registry() {
        let mut registry = ConstraintRegistry::base().unwrap();
        registry
            .register_schema("ssn", json!({ "type": "string", "pattern": "^[0-9]{9}$" }))
            .unwrap();
        let loader = ProfileLoader::new(Arc::new(registry));
        let profile = loader
            .create(json!({
                "first_name": "Ada",
                "last_name": "Lovelace",
                "email": "ada@example.com",
                "ssn": "12345"
            }))
            .unwrap();
        assert!(Arc::ptr_eq(profile.registry(), loader.registry()));
        assert!(profile.validate_fields(["ssn"]).is_err());
    }
}
