//! # cardbot-profile: Applicant Profile Core
//!
//! A schema-validated, write-once container for an applicant's identity
//! data, handed to downstream eligibility and enrollment components.
//!
//! ## Flow
//!
//! ```text
//! raw input ──▶ normalize (loader) ──▶ base validation ──▶ frozen Profile
//! ```
//!
//! - [`loader`]: accepts JSON text, UTF-8 bytes, or a JSON object and
//!   produces one record. Rejects other shapes.
//! - [`constraint`]: field constraints and the registry that evaluates them.
//!   The base schema (`first_name`, `last_name`, `email`) lives here.
//! - [`profile`]: the [`Profile`] itself. A record is assigned exactly once;
//!   after that every field is read-only.
//!
//! ## Extension Point
//!
//! Vendor components call [`Profile::validate_fields`] with the fields they
//! need. Constraints for those fields are registered on a
//! [`ConstraintRegistry`] and bound to profiles through a [`ProfileLoader`].
//! Failures have the same [`ValidationError`] shape as base validation.
//!
//! ## Crate Policy
//!
//! - No I/O. Callers read files or sockets and pass the bytes in.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - Logging through `tracing` only; the crate never installs a subscriber.

pub mod constraint;
pub mod error;
pub mod loader;
pub mod profile;

pub use constraint::{
    is_base_field, ConstraintRegistry, FieldConstraint, PredicateConstraint, RegistryError,
    SchemaConstraint, BASE_FIELDS,
};
pub use error::{FailureKind, FieldFailure, ProfileError, ValidationError, Violation};
pub use loader::{ProfileLoader, RawProfile};
pub use profile::{FieldAccessor, Profile, ProfileState};
