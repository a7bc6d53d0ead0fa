//! Flake builder and SPARQL-like query planner: turns a shape-scoped
//! [`Query`] into a single compiled query string a
//! [`ldkit_shape::Shape`]-aware store can execute.

pub mod flake;
pub mod model;
pub mod planner;

pub use flake::Flake;
pub use model::{Criterion, Expression, Probe, Query, Specs, Transform};
pub use planner::{compile, path_variable, CompiledQuery};
