//! Error handling for bindery
//!
//! This module provides the error types and user-friendly error reporting for
//! the binding resolution engine. The error system is designed around two core
//! principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for embedding hosts
//!
//! # Architecture
//!
//! The error system consists of two main types:
//! - [`BinderyError`] - Enumerated error types for all failure cases in the engine
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! Errors are organized by the phase that raises them:
//! - **Configuration**: [`BinderyError::Configuration`] - raised while the
//!   binder is being configured (category table, layering input)
//! - **Merge**: [`BinderyError::MergeConflict`],
//!   [`BinderyError::AbstractNotOverridden`],
//!   [`BinderyError::UnresolvedOverride`] - raised while layers are merged
//! - **Lookup**: [`BinderyError::LookupCycle`],
//!   [`BinderyError::MissingProducer`], [`BinderyError::TypeMismatch`] -
//!   raised while a value is being produced
//! - **Multibind**: [`BinderyError::MultibindPolicy`],
//!   [`BinderyError::DuplicateContribution`],
//!   [`BinderyError::UnsupportedMultibindType`] - raised while an aggregate
//!   is assembled
//!
//! None of these are retried internally; the engine always surfaces them
//! synchronously to the caller. Lookups that simply find nothing return
//! `None` instead of raising.
//!
//! Use [`user_friendly_error`] to convert any error into a user-friendly
//! format with contextual suggestions.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Convenience alias used by all fallible engine operations.
pub type Result<T> = std::result::Result<T, BinderyError>;

/// The main error type for binding resolution and lookup operations.
///
/// Each variant represents a specific failure mode and carries the context
/// needed to report it without access to the data model that produced it.
/// All variants are fatal for the operation that discovered them; there is
/// no "soft" error mode.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BinderyError {
    /// The binder was configured incorrectly.
    ///
    /// Raised at `set_categories`/`set_layers` time for problems such as an
    /// exceeded category limit, a redefined categorization name, or calls
    /// made out of order.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem
        message: String,
    },

    /// Two bindings for the same key could not be ranked.
    ///
    /// Raised while a layer is reduced when two bindings for one key have
    /// equal effective precedence, or when a lower binding marked `final`
    /// would be shadowed by a higher layer.
    #[error("conflicting binding for '{name}' in layer '{layer}', from '{first}' and '{second}'{finality}")]
    MergeConflict {
        /// Name of the contested key
        name: String,
        /// Layer in which the conflict was discovered
        layer: String,
        /// Origin (named bindings) of the first binding
        first: String,
        /// Origin (named bindings) of the second binding
        second: String,
        /// Preformatted note when a `final` binding was involved
        finality: String,
    },

    /// An `abstract` binding surfaced as the effective binding for its key.
    #[error("the abstract binding '{type_name}/{name}' in '{bindings}' in layer '{layer}' was not overridden")]
    AbstractNotOverridden {
        /// Declared type of the abstract binding
        type_name: String,
        /// Name of the abstract binding
        name: String,
        /// Named bindings container that declared it
        bindings: String,
        /// Layer that declared it
        layer: String,
    },

    /// A binding marked `override` never overrode anything.
    #[error("binding with unresolved 'override' detected: {binding}")]
    UnresolvedOverride {
        /// Formatted description of the unresolved binding
        binding: String,
    },

    /// The same key was inserted into the merged map twice.
    ///
    /// Indicates the per-layer reduction failed to dedupe; this is a bug in
    /// the engine, not in the caller's bindings.
    #[error("internal error: redefinition of key '{key}' during layer merge")]
    InternalRedefinition {
        /// The key that was inserted twice
        key: String,
    },

    /// A key was looked up while already being produced on the same call chain.
    #[error("lookup loop detected for key: {key}")]
    LookupCycle {
        /// The key that closed the cycle
        key: String,
    },

    /// A non-multibind entry has no producer to transform.
    #[error("binding for key '{key}' has no producer")]
    MissingProducer {
        /// The key whose entry lacks a producer
        key: String,
    },

    /// A multibind's declared type selects neither the array nor the hash
    /// aggregator.
    #[error("unsupported multibind type for '{name}': expected an array or hash type, got '{type_shape}'")]
    UnsupportedMultibindType {
        /// Name of the multibinding
        name: String,
        /// The offending declared type
        type_shape: String,
    },

    /// A produced value does not satisfy the type it was produced for.
    ///
    /// Raised both for direct lookups (binding type, requested type) and for
    /// multibind element and key contributions.
    #[error("type error: value for {subject} is not a '{expected}' (got '{actual}')")]
    TypeMismatch {
        /// What was being produced (key, contribution, ...)
        subject: String,
        /// The expected type shape
        expected: String,
        /// The inferred type shape of the produced value
        actual: String,
    },

    /// A multibind contribution violated the active conflict-resolution
    /// policy.
    #[error("multibind policy violation in '{multibind}': {message}")]
    MultibindPolicy {
        /// Id of the multibind being assembled
        multibind: String,
        /// Description of the violation
        message: String,
    },

    /// Two contributions share a name at identical precedence while a
    /// priority rule is in effect.
    #[error("duplicate contribution '{name}' at equal precedence in multibind '{multibind}'")]
    DuplicateContribution {
        /// Id of the multibind being assembled
        multibind: String,
        /// The contested contribution name (empty for unnamed)
        name: String,
    },

    /// The evaluator capability failed to evaluate an expression.
    #[error("evaluation of expression '{expression}' failed: {message}")]
    Evaluation {
        /// Source text of the expression
        expression: String,
        /// Evaluator-reported reason
        message: String,
    },

    /// An instantiable failed to construct a value.
    #[error("instantiation of '{class_name}' failed: {message}")]
    Instantiation {
        /// Registered name of the instantiable
        class_name: String,
        /// Reason reported by the hook or constructor
        message: String,
    },

    /// A producer descriptor referenced a name absent from the registry.
    #[error("unknown {kind} '{name}' in registry")]
    UnknownRegistryEntry {
        /// Registry section ("class" or "producer")
        kind: &'static str,
        /// The unresolved name
        name: String,
        /// Closest registered name, when one is similar enough
        suggestion: Option<String>,
    },
}

/// Error context wrapper providing user-friendly messages and suggestions.
///
/// Wraps a [`BinderyError`] with optional actionable suggestions and details
/// for display to end users of an embedding host.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying engine error
    pub error: BinderyError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no additional suggestions or details.
    #[must_use]
    pub const fn new(error: BinderyError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    ///
    /// Suggestions should be actionable steps; they are displayed in green
    /// in the terminal to draw attention.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    ///
    /// Details provide context about why the error occurred; they are
    /// displayed in yellow, less prominent than the main error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    ///
    /// Prints the error in red, details in yellow, and the suggestion in
    /// green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Build an [`ErrorContext`] with suggestions tailored to the error variant.
fn create_error_context(error: BinderyError) -> ErrorContext {
    match &error {
        BinderyError::Configuration { .. } => ErrorContext::new(error)
            .with_suggestion(
                "Check the effective categories and layered bindings handed to the binder",
            )
            .with_details(
                "Configuration errors abort binder setup before any bindings are merged",
            ),
        BinderyError::MergeConflict { .. } => ErrorContext::new(error)
            .with_suggestion(
                "Make one of the bindings more specific (bind it under a higher-precedence \
                 category) or remove one of them",
            )
            .with_details(
                "Two bindings for the same key resolved to identical precedence; the engine \
                 never guesses a winner",
            ),
        BinderyError::AbstractNotOverridden { .. } => ErrorContext::new(error)
            .with_suggestion("Provide a concrete binding for this key in a higher layer"),
        BinderyError::UnresolvedOverride { .. } => ErrorContext::new(error).with_suggestion(
            "Add a lower-precedence binding for the same key, or drop the 'override' flag",
        ),
        BinderyError::LookupCycle { .. } => ErrorContext::new(error)
            .with_suggestion("Break the cycle by removing the self-referencing lookup producer")
            .with_details("A lookup producer transitively looked up the key it produces"),
        BinderyError::MissingProducer { .. } => ErrorContext::new(error).with_suggestion(
            "Give the binding a producer, or declare it as a multibinding so an aggregator \
             is selected from its type",
        ),
        BinderyError::TypeMismatch { .. } => ErrorContext::new(error).with_suggestion(
            "Align the binding's declared type with what its producer actually produces",
        ),
        BinderyError::UnknownRegistryEntry {
            suggestion: Some(closest),
            ..
        } => {
            let hint = format!("Did you mean '{closest}'?");
            ErrorContext::new(error).with_suggestion(hint)
        }
        BinderyError::UnknownRegistryEntry { .. } => ErrorContext::new(error)
            .with_suggestion("Register the name with the instantiable registry before wiring it"),
        _ => ErrorContext::new(error),
    }
}

/// Convert any error into a user-friendly format with contextual suggestions.
///
/// Checks the error chain for known types ([`BinderyError`], TOML parse
/// errors) and attaches variant-specific suggestions; unknown errors are
/// reported with their full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(engine_error) = error.downcast_ref::<BinderyError>() {
        return create_error_context(engine_error.clone());
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(BinderyError::Configuration {
            message: toml_error.to_string(),
        })
        .with_suggestion(
            "Check the TOML syntax of the engine configuration. Verify quotes, brackets, and \
             key names",
        );
    }

    // Generic error - include the full error chain for better diagnostics
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(BinderyError::Configuration { message })
}
