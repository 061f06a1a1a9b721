//! # cardbot-cli: Applicant Profile Command-Line Interface
//!
//! Thin shell around `cardbot-profile`. All file and stdin access happens
//! here; the profile core never performs I/O.
//!
//! ## Subcommands
//!
//! - `validate`: load a profile document, run base validation, then check
//!   any `--require`d vendor fields
//! - `constraints`: list the field constraints in effect
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from the handlers.
//! - Handlers delegate to `cardbot-profile` for every validation decision.

pub mod constraints;
pub mod validate;
