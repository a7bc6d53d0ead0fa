//! A property is a directed or bidirectional edge declaration: `(name,
//! forward URI?, reverse URI?, embedded/foreign/hidden flags, nested shape
//! supplier)` (§3, §4.4).

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::{ShapeError, ShapeResult};
use crate::shape::Shape;

thread_local! {
    /// Nested-shape ids currently being resolved on this logical thread,
    /// used to detect self-referential `embedded` property graphs without
    /// recursing forever (§9).
    static PENDING: RefCell<HashSet<u64>> = RefCell::new(HashSet::new());
}

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A lazily-evaluated, memoized, cycle-guarded reference to a property's
/// nested shape. Properties hold a *supplier* rather than a direct `Shape`
/// reference precisely so that a shape can embed a property whose nested
/// shape is itself, without building an infinite structure at construction
/// time.
#[derive(Clone)]
pub struct NestedShape {
    id: u64,
    supplier: Arc<dyn Fn() -> Shape + Send + Sync>,
    cache: Arc<OnceLock<Shape>>,
}

impl NestedShape {
    pub fn new(supplier: impl Fn() -> Shape + Send + Sync + 'static) -> NestedShape {
        NestedShape {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            supplier: Arc::new(supplier),
            cache: Arc::new(OnceLock::new()),
        }
    }

    pub fn constant(shape: Shape) -> NestedShape {
        let cache = OnceLock::new();
        let _ = cache.set(shape.clone());
        NestedShape {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            supplier: Arc::new(move || shape.clone()),
            cache: Arc::new(cache),
        }
    }

    /// Resolves the nested shape, evaluating the supplier at most once.
    /// Returns [`ShapeError::Cyclic`] if resolution re-enters itself.
    pub fn resolve(&self, property_name: &str) -> ShapeResult<Shape> {
        if let Some(shape) = self.cache.get() {
            return Ok(shape.clone());
        }

        let entered = PENDING.with(|pending| pending.borrow_mut().insert(self.id));
        if !entered {
            return Err(ShapeError::Cyclic { property: property_name.to_owned() });
        }

        let shape = (self.supplier)();
        let _ = self.cache.set(shape.clone());
        PENDING.with(|pending| {
            pending.borrow_mut().remove(&self.id);
        });
        Ok(shape)
    }
}

impl fmt::Debug for NestedShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedShape").field("id", &self.id).field("resolved", &self.cache.get().is_some()).finish()
    }
}

#[derive(Debug, Clone)]
pub struct Property {
    inner: Arc<PropertyInner>,
}

#[derive(Debug)]
struct PropertyInner {
    name: String,
    forward: Option<String>,
    reverse: Option<String>,
    embedded: bool,
    foreign: bool,
    hidden: bool,
    shape: Option<NestedShape>,
}

impl Property {
    pub fn new(name: impl Into<String>) -> Property {
        Property {
            inner: Arc::new(PropertyInner {
                name: name.into(),
                forward: None,
                reverse: None,
                embedded: false,
                foreign: false,
                hidden: false,
                shape: None,
            }),
        }
    }

    fn with(&self, f: impl FnOnce(&mut PropertyInner)) -> Property {
        let mut inner = (*self.inner).clone_fields();
        f(&mut inner);
        Property { inner: Arc::new(inner) }
    }

    pub fn forward(&self, predicate: impl Into<String>) -> Property {
        self.with(|i| i.forward = Some(predicate.into()))
    }

    pub fn reverse(&self, predicate: impl Into<String>) -> Property {
        self.with(|i| i.reverse = Some(predicate.into()))
    }

    pub fn embedded(&self, embedded: bool) -> Property {
        self.with(|i| i.embedded = embedded)
    }

    pub fn foreign(&self, foreign: bool) -> Property {
        self.with(|i| i.foreign = foreign)
    }

    pub fn hidden(&self, hidden: bool) -> Property {
        self.with(|i| i.hidden = hidden)
    }

    pub fn shape(&self, shape: NestedShape) -> Property {
        self.with(|i| i.shape = Some(shape))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn forward_predicate(&self) -> Option<&str> {
        self.inner.forward.as_deref()
    }

    pub fn reverse_predicate(&self) -> Option<&str> {
        self.inner.reverse.as_deref()
    }

    pub fn is_embedded(&self) -> bool {
        self.inner.embedded
    }

    pub fn is_foreign(&self) -> bool {
        self.inner.foreign
    }

    pub fn is_hidden(&self) -> bool {
        self.inner.hidden
    }

    /// Resolves the property's nested shape, if any.
    pub fn nested_shape(&self) -> Option<ShapeResult<Shape>> {
        self.inner.shape.as_ref().map(|s| s.resolve(&self.inner.name))
    }
}

impl PropertyInner {
    fn clone_fields(&self) -> PropertyInner {
        PropertyInner {
            name: self.name.clone(),
            forward: self.forward.clone(),
            reverse: self.reverse.clone(),
            embedded: self.embedded,
            foreign: self.foreign,
            hidden: self.hidden,
            shape: self.shape.clone(),
        }
    }
}
