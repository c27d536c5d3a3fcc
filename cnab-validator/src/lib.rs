//! CNAB400 Validation Engine
//!
//! Validates fixed-width, 400-byte-per-record banking remittance files against
//! a declarative layout and reconciles the trailer against the detail records.
//!
//! # Architecture
//!
//! 1. **Layout**: immutable registry of field specs and record rules per record type
//! 2. **Field pipeline**: length, requirement, allowed values, pattern, transform, cross-field rule
//! 3. **Record dispatch**: every field of a line, then that record type's rules
//! 4. **File validation**: structure, sequence numbers, trailer totals with tolerance
//!
//! Every violation becomes a [`ValidationError`] with a [`Severity`]; the
//! engine returns `Err` only when it cannot run at all (I/O, configuration,
//! layout registration).
//!
//! # Example
//!
//! ```no_run
//! use cnab_validator::{Severity, ValidationConfig};
//!
//! fn main() -> cnab_validator::Result<()> {
//!     let config = ValidationConfig::new(2000)?.with_tolerance_cents(5);
//!     let report = cnab_validator::validate_file("CB010100.REM", &config)?;
//!
//!     for error in report.errors(Severity::Business) {
//!         println!("{}", error);
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, missing_debug_implementations, clippy::all)]

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod field;
pub mod layout;
pub mod line;
pub mod reconciliation;
pub mod report;
pub mod rules;
pub mod types;
pub mod validator;

// Re-exports
pub use config::ValidationConfig;
pub use error::{Error, Result};
pub use field::{FieldSpec, FieldValue, RecordContext, Transform};
pub use layout::{Layout, LayoutBuilder};
pub use report::{FileSummary, ValidationReport};
pub use types::{ErrorDetail, ErrorKind, Severity, ValidationError, ValidationResult};
pub use validator::{validate_file, FileValidator};
