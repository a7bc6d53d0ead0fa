/// Errors raised while resolving a [`crate::property::Property`]'s nested
/// shape (§4.4, §9 "Cyclic shape graphs").
#[derive(Debug, thiserror::Error)]
pub enum ShapeError {
    /// Resolving a property's nested-shape supplier re-entered itself
    /// before completing — a self-referential `embedded` property graph
    /// with no base case.
    #[error("cyclic nested shape reference on property {property:?}")]
    Cyclic { property: String },
}

pub type ShapeResult<T> = Result<T, ShapeError>;
