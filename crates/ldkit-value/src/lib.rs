//! The polymorphic value algebra: a single [`Value`] type standing in for
//! JSON-LD/RDF literals, containers, and opaque host payloads, plus the
//! comparator and visitor that everything else in the toolkit is built on.

pub mod compare;
pub mod error;
pub mod generic;
pub mod locale;
pub mod temporal;
pub mod uri;
pub mod value;
pub mod visitor;

pub use compare::{comparable, compare};
pub use error::{ValueError, ValueResult};
pub use generic::Generic;
pub use locale::Locale;
pub use temporal::{Date, Duration, Offset, Period, Temporal, TemporalAmount, Time};
pub use value::{is_reserved, IntoNumeric, Value, RESERVED_FIELDS};
pub use visitor::{NumberRef, Visitor};
