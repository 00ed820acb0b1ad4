//! Integration test suite for bindery
//!
//! End-to-end tests exercising the public surface: binder configuration,
//! layered merging, injector lookups, overrides, and the determinism
//! guarantees.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! Tests are organized by functionality area:
//! - **end_to_end**: full binder-to-injector scenarios, overrides, layering
//! - **determinism**: identical inputs produce identical results and errors

mod common;
mod determinism;
mod end_to_end;
