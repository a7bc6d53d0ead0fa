use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An opaque host-world payload (e.g. a prepared `Specs` projection or a
/// store-side `Table`) threaded through the value algebra without the
/// algebra itself needing to understand its shape.
///
/// `Generic` values have no canonical string encoding and compare equal only
/// to themselves by pointer identity; validators and comparators that reach
/// a `Generic` fall back to [`crate::visitor::Visitor::visit_any`].
#[derive(Clone)]
pub struct Generic {
    type_name: &'static str,
    payload: Arc<dyn Any + Send + Sync>,
}

impl Generic {
    pub fn new<T: Any + Send + Sync>(type_name: &'static str, payload: T) -> Generic {
        Generic { type_name, payload: Arc::new(payload) }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref()
    }
}

impl fmt::Debug for Generic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generic").field("type_name", &self.type_name).finish_non_exhaustive()
    }
}

impl PartialEq for Generic {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}
