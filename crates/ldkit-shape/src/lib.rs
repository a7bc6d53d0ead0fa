//! Immutable Shape/Property/Type model: declarative, SHACL-style constraint
//! sets that guide both validation and query planning in the crates built
//! on top of this one.

pub mod error;
pub mod property;
pub mod shape;
pub mod types;

pub use error::{ShapeError, ShapeResult};
pub use property::{NestedShape, Property};
pub use shape::{Constraint, Shape};
pub use types::Type;
