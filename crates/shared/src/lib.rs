//! Shared utilities and common types for the equipment tracker backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Identifier normalization (serial numbers, tags, room codes)
//! - Common validation logic
//! - Offset pagination helpers

pub mod pagination;
pub mod validation;
