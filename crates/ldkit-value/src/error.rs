/// Errors raised eagerly by value factories, accessors, and codecs.
///
/// This mirrors the "Argument error" / "Codec error" kinds of the toolkit's
/// error taxonomy; the store and validation layers define their own error
/// types for the kinds that belong to them.
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    /// A factory received a null, out-of-range, or otherwise invalid input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A decode saw a lexical form that does not belong to the target case.
    #[error("malformed {case} literal: {lexical:?}")]
    Malformed { case: &'static str, lexical: String },

    /// An accessor was asked for an unknown/reserved field.
    #[error("unknown field: {0}")]
    Unknown(String),
}

impl ValueError {
    pub fn malformed(case: &'static str, lexical: impl Into<String>) -> Self {
        ValueError::Malformed {
            case,
            lexical: lexical.into(),
        }
    }

    pub fn unknown(name: impl Into<String>) -> Self {
        ValueError::Unknown(name.into())
    }
}

pub type ValueResult<T> = Result<T, ValueError>;

/// A reserved field name (`@id`, `@type`, `@value`, `@language`, `@context`)
/// was addressed through [`crate::Value::get`], which forbids it.
pub(crate) fn reserved_field(name: &str) -> ValueError {
    ValueError::InvalidArgument(format!("reserved field name: {name}"))
}

/// Helper used by factories that reject a `Value` payload outright (e.g. a
/// non-finite `Floating`, or a relative URI where an absolute one is
/// required).
pub(crate) fn reject(msg: impl Into<String>) -> ValueError {
    ValueError::InvalidArgument(msg.into())
}
