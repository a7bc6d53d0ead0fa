//! SHACL-style validation: given a [`ldkit_shape::Shape`] and a
//! [`ldkit_value::Value`], produces a positional trace value describing
//! every constraint violation. An empty (pruned-to-`Nil`) trace means the
//! value is valid.

pub mod validator;

pub use validator::{is_valid, validate};
