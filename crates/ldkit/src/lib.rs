//! Re-exports the toolkit's five crates under one name: the [`Value`]
//! algebra, [`Shape`]-based validation, query planning, and the
//! [`Store`] facade that drives them against a triple store.

pub use ldkit_value::{
    comparable, compare, is_reserved, Date, Duration, Generic, IntoNumeric, Locale, NumberRef,
    Offset, Period, Temporal, TemporalAmount, Time, Value, ValueError, ValueResult, Visitor,
    RESERVED_FIELDS,
};

pub use ldkit_shape::{Constraint, NestedShape, Property, Shape, ShapeError, ShapeResult, Type};

pub use ldkit_validate::{is_valid, validate};

pub use ldkit_query::{compile, path_variable, CompiledQuery, Criterion, Expression, Flake, Probe, Query, Specs, Transform};

pub use ldkit_store::{
    DriverError, Fetcher, Loader, QueryPayload, Quad, Retriever, Selector, Store, StoreConfig,
    StoreError, StoreOutcome, StoreResult, StoreTask, Task, TripleStoreConnection, TupleRow,
    Updater, Worker, Writer, QUERY_PAYLOAD_TYPE,
};

pub mod testing {
    //! The in-memory [`TripleStoreConnection`](crate::TripleStoreConnection)
    //! test double, re-exported for downstream integration tests.
    pub use ldkit_store::testing::MemoryTripleStore;
}
