//! The sweep engine: expand parameterized job templates into concrete shell
//! invocations and drain them under bounded parallelism.
//!
//! - `param` -- parameter axes: fixed values, cartesian lists, derivations
//! - `resolver` -- bounded fixed-point `[[name]]` template substitution
//! - `grid` -- cartesian expansion, derived evaluation, combination filters
//! - `runner` -- the coordinator: sections, groups, registration, drains
//! - `executor` -- fixed worker pool invoking `sh -c` per job
//! - `output` -- per-path serialized stdout capture with one-time headers
//!
//! The only cross-job dependency the engine knows is "does this job's
//! declared output file already exist" -- an existence check, not a content
//! hash, so a stale file with the right name counts as done.

pub mod executor;
pub mod grid;
pub mod output;
pub mod param;
pub mod resolver;
pub mod runner;

pub use param::{ParamValue, ParameterSpec};
pub use runner::{JobSpec, Runner};
