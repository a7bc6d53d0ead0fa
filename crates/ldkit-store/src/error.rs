//! The store-facing error kinds of §7: driver failures, store invariant
//! violations (including pre-write validation), and unsupported shapes.

use ldkit_value::Value;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("triple store connection failed: {0}")]
    Connection(String),
    #[error("tuple query failed: {0}")]
    Select(String),
    #[error("update failed: {0}")]
    Update(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("pre-write validation failed")]
    Validation { trace: Value },

    #[error("unknown property {name:?} during dispatch")]
    UnknownProperty { name: String },

    #[error("unsupported model shape: {reason}")]
    UnsupportedModel { reason: String },

    #[error("driver error")]
    Driver(#[from] DriverError),

    #[error("shape error")]
    Shape(#[from] ldkit_shape::ShapeError),

    #[error("value error")]
    Value(#[from] ldkit_value::ValueError),
}

pub type StoreResult<T> = Result<T, StoreError>;
