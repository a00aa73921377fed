//! Core types for Bindery.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod role;
pub mod status;

pub use id::*;
pub use money::Money;
pub use role::{Capability, Role, RoleParseError, RoleSet};
pub use status::*;
