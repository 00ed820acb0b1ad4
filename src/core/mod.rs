//! Core types and functionality for bindery
//!
//! This module forms the foundation of the engine's error handling. It
//! defines the strongly-typed error taxonomy used by every other module and
//! the user-facing error context wrapper.
//!
//! # Modules
//!
//! ## `error` - Error Handling
//!
//! The error module provides:
//! - [`BinderyError`] - Enumerated error types covering all engine failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//! - [`Result`] - Alias used by all fallible engine operations
//!
//! # Design Principles
//!
//! Every operation that can fail returns a [`Result`] with a specific
//! [`BinderyError`] variant; errors are never caught and retried inside the
//! engine. Lookups that find nothing return `None` rather than raising -
//! only structural or type violations raise.

pub mod error;

pub use error::{BinderyError, ErrorContext, Result, user_friendly_error};
