//! Global constants used throughout the bindery codebase.
//!
//! This module contains the precedence and sizing constants shared by the
//! binder and injector. Defining them centrally improves maintainability
//! and makes magic numbers more discoverable.

/// Maximum number of distinct categorizations accepted by
/// [`Binder::set_categories`](crate::binder::Binder::set_categories).
///
/// Category precedences are assigned by counting down from
/// [`CATEGORY_PRECEDENCE_BASE`]; with more than this many categorizations the
/// assignment would collide with the reserved `common` precedence.
pub const MAX_CATEGORIZATIONS: usize = 1000;

/// Precedence assigned to the first (highest) effective categorization.
///
/// Subsequent categorizations receive decreasing values (999, 998, ...).
pub const CATEGORY_PRECEDENCE_BASE: u32 = 1000;

/// Precedence of the implicit `common` categorization.
///
/// `common` is always present and always lowest; every binding declared
/// outside a categorized container resolves at this precedence.
pub const COMMON_PRECEDENCE: u32 = 0;

/// Name of the implicit always-present categorization.
pub const COMMON_CATEGORIZATION: &str = "common";

/// Value carried by the implicit `common` category.
pub const COMMON_CATEGORY_VALUE: &str = "true";
