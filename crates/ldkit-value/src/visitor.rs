//! Double-dispatch visitor over [`crate::Value`].
//!
//! This is the value algebra's only public extension point (§4.1). Concrete
//! `visit_*` methods default-forward to a more general one, terminating at
//! [`Visitor::visit_any`] — the Rust translation of the source's numeric
//! `visit(Long) -> visit(Number) -> visit(Object)` and temporal
//! `visit(Year) -> visit(Temporal) -> visit(Object)` fallback chains.
//! Implementers override only the cases they care about; everything else
//! rides the default chain down to `visit_any`.

use bigdecimal::BigDecimal;
use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::generic::Generic;
use crate::locale::Locale;
use crate::temporal::{Duration, Period, Temporal, TemporalAmount};
use crate::Value;

/// A borrowed view over the four numeric representations, passed to
/// [`Visitor::visit_number`] by the default forwarding methods.
#[derive(Debug, Clone, Copy)]
pub enum NumberRef<'a> {
    Long(i64),
    Big(&'a BigInt),
    Decimal(&'a BigDecimal),
    Double(f64),
}

pub trait Visitor {
    type Output;
    type Error;

    /// The terminal fallback: every other `visit_*` method eventually
    /// forwards here unless overridden. This is the only method an
    /// implementer is required to provide.
    fn visit_any(&mut self, value: &Value) -> Result<Self::Output, Self::Error>;

    fn visit_nil(&mut self) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::Nil)
    }

    fn visit_bit(&mut self, v: bool) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::Bit(v))
    }

    fn visit_number(&mut self, _n: NumberRef<'_>, source: &Value) -> Result<Self::Output, Self::Error> {
        self.visit_any(source)
    }

    fn visit_long(&mut self, v: i64) -> Result<Self::Output, Self::Error> {
        self.visit_number(NumberRef::Long(v), &Value::Integral(v))
    }

    fn visit_big_int(&mut self, v: &BigInt) -> Result<Self::Output, Self::Error> {
        self.visit_number(NumberRef::Big(v), &Value::Integer(v.clone()))
    }

    fn visit_decimal(&mut self, v: &BigDecimal) -> Result<Self::Output, Self::Error> {
        self.visit_number(NumberRef::Decimal(v), &Value::Decimal(v.clone()))
    }

    fn visit_double(&mut self, v: f64) -> Result<Self::Output, Self::Error> {
        self.visit_number(NumberRef::Double(v), &Value::Floating(v))
    }

    fn visit_string(&mut self, v: &str) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::String(v.to_owned()))
    }

    fn visit_uri(&mut self, v: &str) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::Uri(v.to_owned()))
    }

    fn visit_text(&mut self, locale: &Locale, text: &str) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::Text(locale.clone(), text.to_owned()))
    }

    fn visit_data(&mut self, datatype: &str, lexical: &str) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::Data(datatype.to_owned(), lexical.to_owned()))
    }

    fn visit_temporal(&mut self, v: &Temporal) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::Temporal(v.clone()))
    }

    /// Every concrete temporal case forwards here by default.
    fn visit_temporal_case(&mut self, v: &Temporal) -> Result<Self::Output, Self::Error> {
        self.visit_temporal(v)
    }

    fn visit_temporal_amount(&mut self, v: &TemporalAmount) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::TemporalAmount(v.clone()))
    }

    fn visit_period(&mut self, v: &Period) -> Result<Self::Output, Self::Error> {
        self.visit_temporal_amount(&TemporalAmount::Period(*v))
    }

    fn visit_duration(&mut self, v: &Duration) -> Result<Self::Output, Self::Error> {
        self.visit_temporal_amount(&TemporalAmount::Duration(*v))
    }

    fn visit_array(&mut self, v: &[Value]) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::Array(v.to_vec()))
    }

    fn visit_map(&mut self, v: &IndexMap<String, Value>) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::Object(v.clone()))
    }

    fn visit_generic(&mut self, v: &Generic) -> Result<Self::Output, Self::Error> {
        self.visit_any(&Value::Generic(v.clone()))
    }
}

impl Value {
    /// Double-dispatches `self` to the most specific `visit_*` method on
    /// `visitor`, relying on the trait's default methods to walk the
    /// fallback chain down to [`Visitor::visit_any`] for anything not
    /// overridden.
    pub fn accept<V: Visitor>(&self, visitor: &mut V) -> Result<V::Output, V::Error> {
        match self {
            Value::Nil => visitor.visit_nil(),
            Value::Bit(b) => visitor.visit_bit(*b),
            Value::Integral(n) => visitor.visit_long(*n),
            Value::Integer(n) => visitor.visit_big_int(n),
            Value::Decimal(n) => visitor.visit_decimal(n),
            Value::Floating(n) => visitor.visit_double(*n),
            Value::String(s) => visitor.visit_string(s),
            Value::Uri(s) => visitor.visit_uri(s),
            Value::Temporal(t) => visitor.visit_temporal_case(t),
            Value::TemporalAmount(TemporalAmount::Period(p)) => visitor.visit_period(p),
            Value::TemporalAmount(TemporalAmount::Duration(d)) => visitor.visit_duration(d),
            Value::Text(locale, s) => visitor.visit_text(locale, s),
            Value::Data(datatype, lexical) => visitor.visit_data(datatype, lexical),
            Value::Object(fields) => visitor.visit_map(fields),
            Value::Array(items) => visitor.visit_array(items),
            Value::Generic(g) => visitor.visit_generic(g),
        }
    }
}
