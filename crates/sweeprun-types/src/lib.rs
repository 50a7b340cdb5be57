//! Shared domain types for sweeprun.
//!
//! This crate contains the types that flow between the sweep engine and its
//! callers: parameter bindings, job descriptors, run reports, the declarative
//! TOML manifest, and the configuration-error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, toml, thiserror.

pub mod binding;
pub mod error;
pub mod job;
pub mod manifest;
