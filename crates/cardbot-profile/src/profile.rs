//! # Applicant Profile
//!
//! A write-once container for applicant identity data.
//!
//! ## States
//!
//! ```text
//! Uninitialized ──assign (base schema passes)──▶ Validated
//! ```
//!
//! The single transition is an atomic check-and-set on a `OnceLock`: of two
//! concurrent `assign` calls on the same instance, exactly one succeeds and
//! the other observes [`ProfileError::AlreadySet`]. A failed validation
//! leaves the instance `Uninitialized` with no record stored.
//!
//! ## Read Surface
//!
//! Once validated, every key of the record is reachable through
//! [`Profile::get`] and through a read-only [`FieldAccessor`]. Writes through
//! an accessor, or through [`Profile::set`], always fail and never change a
//! value. The backing map is only ever lent out as `&Map`.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::constraint::{ConstraintRegistry, BASE_FIELDS};
use crate::error::ProfileError;
use crate::loader::{ProfileLoader, RawProfile};

/// Lifecycle state of a [`Profile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileState {
    /// No record has been assigned.
    Uninitialized,
    /// A record passed base validation and is frozen.
    Validated,
}

impl fmt::Display for ProfileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("UNINITIALIZED"),
            Self::Validated => f.write_str("VALIDATED"),
        }
    }
}

/// Validated, immutable applicant profile.
#[derive(Debug, Clone)]
pub struct Profile {
    registry: Arc<ConstraintRegistry>,
    record: OnceLock<Map<String, Value>>,
}

impl Profile {
    /// Load a profile from JSON text or a JSON object and validate it
    /// against the base schema.
    ///
    /// ```
    /// use cardbot_profile::Profile;
    ///
    /// let profile = Profile::create(
    ///     r#"{"first_name":"Ada","last_name":"Lovelace","email":"ada@example.com"}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(profile.first_name(), Some("Ada"));
    /// ```
    pub fn create(input: impl Into<RawProfile>) -> Result<Self, ProfileError> {
        ProfileLoader::base()?.create(input)
    }

    /// An uninitialized profile over the base registry.
    pub fn new() -> Result<Self, ProfileError> {
        Ok(Self::with_registry(ConstraintRegistry::shared_base()?))
    }

    /// An uninitialized profile over `registry`.
    pub fn with_registry(registry: Arc<ConstraintRegistry>) -> Self {
        Self {
            registry,
            record: OnceLock::new(),
        }
    }

    /// Assign the backing record. Usable exactly once per instance.
    ///
    /// The record is checked against the base schema before it is stored.
    /// On failure nothing is stored and the profile stays uninitialized.
    ///
    /// # Errors
    ///
    /// - [`ProfileError::AlreadySet`] if a record is already held, including
    ///   when a concurrent `assign` won the race.
    /// - [`ProfileError::Validation`] listing every base field failure.
    pub fn assign(&self, record: Map<String, Value>) -> Result<(), ProfileError> {
        if self.record.get().is_some() {
            return Err(ProfileError::AlreadySet);
        }

        if let Err(err) = self.registry.evaluate(&record, BASE_FIELDS) {
            tracing::debug!(
                failures = err.len(),
                fields = ?err.fields(),
                "base validation of profile failed"
            );
            return Err(err.into());
        }

        let field_count = record.len();
        self.record
            .set(record)
            .map_err(|_| ProfileError::AlreadySet)?;
        tracing::debug!(fields = field_count, "profile validated");
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProfileState {
        if self.record.get().is_some() {
            ProfileState::Validated
        } else {
            ProfileState::Uninitialized
        }
    }

    /// Whether a record has been assigned and validated.
    pub fn is_validated(&self) -> bool {
        self.state() == ProfileState::Validated
    }

    /// The registry this profile validates against.
    pub fn registry(&self) -> &Arc<ConstraintRegistry> {
        &self.registry
    }

    /// The frozen record.
    pub fn record(&self) -> Option<&Map<String, Value>> {
        self.record.get()
    }

    /// The value stored under `field`, or `None` if it was never present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.record.get().and_then(|record| record.get(field))
    }

    /// Whether the record carries `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Field names present in the record.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.record
            .get()
            .into_iter()
            .flat_map(|record| record.keys().map(String::as_str))
    }

    /// Number of fields in the record; zero while uninitialized.
    pub fn len(&self) -> usize {
        self.record.get().map_or(0, Map::len)
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only accessor for `field`.
    pub fn accessor(&self, field: &str) -> Option<FieldAccessor<'_>> {
        self.record
            .get()?
            .get_key_value(field)
            .map(|(name, value)| FieldAccessor { name, value })
    }

    /// One read-only accessor per field of the record.
    pub fn accessors(&self) -> impl Iterator<Item = FieldAccessor<'_>> {
        self.record
            .get()
            .into_iter()
            .flat_map(|record| record.iter().map(|(name, value)| FieldAccessor { name, value }))
    }

    /// Attempt to write `field`. Always fails; no value is changed.
    ///
    /// Returns [`ProfileError::ReadOnlyField`] for fields the profile
    /// carries and [`ProfileError::UnknownField`] for anything else.
    pub fn set(&self, field: &str, value: Value) -> Result<(), ProfileError> {
        match self.accessor(field) {
            Some(accessor) => accessor.set(value),
            None => Err(ProfileError::UnknownField {
                field: field.to_string(),
            }),
        }
    }

    /// Assert that `fields` are present and satisfy their registered
    /// constraints.
    ///
    /// Called by vendor-specific components before they read the fields
    /// they depend on. Uses the same evaluator as base validation, so the
    /// error shape is identical. Fields without a registered constraint
    /// must be present and non-null.
    ///
    /// # Errors
    ///
    /// [`ProfileError::Validation`] enumerating every failing field, or
    /// [`ProfileError::Uninitialized`] if no record has been assigned.
    pub fn validate_fields<I, S>(&self, fields: I) -> Result<(), ProfileError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let record = self.record.get().ok_or(ProfileError::Uninitialized)?;
        self.registry.evaluate(record, fields)?;
        Ok(())
    }

    /// Applicant's first name.
    pub fn first_name(&self) -> Option<&str> {
        self.get("first_name").and_then(Value::as_str)
    }

    /// Applicant's last name.
    pub fn last_name(&self) -> Option<&str> {
        self.get("last_name").and_then(Value::as_str)
    }

    /// Applicant's email address.
    pub fn email(&self) -> Option<&str> {
        self.get("email").and_then(Value::as_str)
    }

    /// Deserialize a copy of the record into `T`.
    ///
    /// Lets a consumer read the fields it cares about through its own typed
    /// view without touching the backing map.
    pub fn project<T: DeserializeOwned>(&self) -> Result<T, ProfileError> {
        let record = self.record.get().ok_or(ProfileError::Uninitialized)?;
        serde_json::from_value(Value::Object(record.clone())).map_err(|e| {
            ProfileError::Projection {
                target: std::any::type_name::<T>(),
                reason: e.to_string(),
            }
        })
    }
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.record.get() == other.record.get()
    }
}

impl FromStr for Profile {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::create(s)
    }
}

impl TryFrom<Value> for Profile {
    type Error = ProfileError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::create(value)
    }
}

impl TryFrom<Map<String, Value>> for Profile {
    type Error = ProfileError;

    fn try_from(record: Map<String, Value>) -> Result<Self, Self::Error> {
        Self::create(record)
    }
}

impl Serialize for Profile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.record.get() {
            Some(record) => record.serialize(serializer),
            None => Err(serde::ser::Error::custom(ProfileError::Uninitialized)),
        }
    }
}

impl<'de> Deserialize<'de> for Profile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = Map::<String, Value>::deserialize(deserializer)?;
        Self::create(record).map_err(serde::de::Error::custom)
    }
}

/// Read-only handle to one field of a validated profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldAccessor<'a> {
    name: &'a str,
    value: &'a Value,
}

impl<'a> FieldAccessor<'a> {
    /// The field name.
    pub fn name(&self) -> &'a str {
        self.name
    }

    /// The field value.
    pub fn get(&self) -> &'a Value {
        self.value
    }

    /// Always fails with [`ProfileError::ReadOnlyField`].
    pub fn set(&self, _value: Value) -> Result<(), ProfileError> {
        Err(ProfileError::ReadOnlyField {
            field: self.name.to_string(),
        })
    }
}
