//! Rich diagnostic error types for the triple TMS.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Note what is *not* here: removing a
//! dependency that was never recorded is a no-op, not an error.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the triple TMS.
#[derive(Debug, Error, Diagnostic)]
pub enum TmsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Reference errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ReferenceError {
    #[error("triple reference has an empty subject (predicate: {predicate:?})")]
    #[diagnostic(
        code(tms::reference::empty_subject),
        help(
            "A triple is identified by a (subject, predicate) pair and both must be \
             non-empty. Check the evaluator resolved the subject before recording the edge."
        )
    )]
    EmptySubject { predicate: String },

    #[error("triple reference has an empty predicate (subject: {subject:?})")]
    #[diagnostic(
        code(tms::reference::empty_predicate),
        help(
            "A triple is identified by a (subject, predicate) pair and both must be \
             non-empty. Check the property name produced by the evaluator."
        )
    )]
    EmptyPredicate { subject: String },
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("triple not found: {subject}/{predicate}")]
    #[diagnostic(
        code(tms::registry::not_found),
        help(
            "The owning triple is not registered. Create it first with \
             `TripleRegistry::get_or_create()`, or check whether it was retracted."
        )
    )]
    TripleNotFound { subject: String, predicate: String },

    #[error("duplicate triple: {subject}/{predicate}")]
    #[diagnostic(
        code(tms::registry::duplicate),
        help(
            "A triple with this (subject, predicate) pair is already registered. \
             Use `TripleRegistry::lock()` to update it in place."
        )
    )]
    DuplicateTriple { subject: String, predicate: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    #[diagnostic(
        code(tms::config::read),
        help("Check that the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    #[diagnostic(
        code(tms::config::parse),
        help(
            "The config file is not valid TOML for a registry config. \
             Known keys are `initial_capacity` and `max_cascade_depth`."
        )
    )]
    Parse { path: String, message: String },

    #[error("failed to write config {path}: {source}")]
    #[diagnostic(
        code(tms::config::write),
        help("Check that the target directory is writable and the disk is not full.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config {path}: {message}")]
    #[diagnostic(
        code(tms::config::serialize),
        help("The in-memory config could not be rendered as TOML. This is a bug; please report it.")
    )]
    Serialize { path: String, message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(tms::config::invalid), help("Check the RegistryConfig fields. {message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning triple TMS results.
pub type TmsResult<T> = std::result::Result<T, TmsError>;
