//! TOML edit scripts: schema, loading and application.

pub mod applicator;
pub mod loader;
pub mod schema;

pub use applicator::{apply_script, ApplicationError, ApplyMode, ScriptReport};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    EditDefinition, EditScript, HashAlgorithm, Metadata, Operation, ValidationError,
    ValidationIssue, Verify,
};
