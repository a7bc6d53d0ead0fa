//! Total-ish order over the value algebra's literal cases (§4.2).
//!
//! `Nil < Bit < Number < Temporal (same family only) < String/Text < Uri`.
//! Containers (`Object`, `Array`), `Data`, `TemporalAmount` and `Generic`
//! never participate — they compare as incomparable, same as cross-family
//! temporals or a `Bit` against a `Number`.

use std::cmp::Ordering;

use bigdecimal::BigDecimal;

use crate::Value;

fn rank(v: &Value) -> Option<u8> {
    match v {
        Value::Nil => Some(0),
        Value::Bit(_) => Some(1),
        Value::Integral(_) | Value::Integer(_) | Value::Decimal(_) | Value::Floating(_) => Some(2),
        Value::Temporal(_) => Some(3),
        Value::String(_) | Value::Text(..) => Some(4),
        Value::Uri(_) => Some(5),
        Value::Data(..) | Value::TemporalAmount(_) | Value::Object(_) | Value::Array(_) | Value::Generic(_) => None,
    }
}

/// `None` when the two values do not belong to a common comparable case
/// (different rank, or same rank but cross-family temporals).
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    let (ra, rb) = (rank(a)?, rank(b)?);
    if ra != rb {
        return ra.partial_cmp(&rb);
    }
    match (a, b) {
        (Value::Nil, Value::Nil) => Some(Ordering::Equal),
        (Value::Bit(x), Value::Bit(y)) => Some(x.cmp(y)),
        (Value::Temporal(x), Value::Temporal(y)) => {
            if x.family() != y.family() {
                None
            } else {
                Some(x.ordinal_key().cmp(&y.ordinal_key()))
            }
        }
        (Value::Uri(x), Value::Uri(y)) => Some(x.cmp(y)),
        // Text compares locale then lexeme; String has no locale, so a
        // String/Text pair falls back to lexeme-only comparison.
        (Value::Text(la, x), Value::Text(lb, y)) => Some((la.as_str(), x.as_str()).cmp(&(lb.as_str(), y.as_str()))),
        (Value::String(_) | Value::Text(..), Value::String(_) | Value::Text(..)) => {
            Some(textual(a).cmp(textual(b)))
        }
        _ => compare_numbers(a, b),
    }
}

pub fn comparable(a: &Value, b: &Value) -> bool {
    compare(a, b).is_some()
}

fn textual(v: &Value) -> &str {
    match v {
        Value::String(s) => s,
        Value::Text(_, s) => s,
        _ => unreachable!("textual() called on a non-textual value"),
    }
}

fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integral(x), Value::Integral(y)) => Some(x.cmp(y)),
        (Value::Floating(x), Value::Floating(y)) => x.partial_cmp(y),
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Decimal(x), Value::Decimal(y)) => Some(x.cmp(y)),
        _ => {
            let da = to_big_decimal(a)?;
            let db = to_big_decimal(b)?;
            Some(da.cmp(&db))
        }
    }
}

fn to_big_decimal(v: &Value) -> Option<BigDecimal> {
    match v {
        Value::Integral(n) => Some(BigDecimal::from(*n)),
        Value::Integer(n) => Some(BigDecimal::from(n.clone())),
        Value::Decimal(n) => Some(n.clone()),
        Value::Floating(f) => BigDecimal::try_from(*f).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;

    #[test]
    fn orders_across_cases_by_rank() {
        assert_eq!(compare(&Value::Nil, &Value::bit(false)), Some(Ordering::Less));
        assert_eq!(compare(&Value::bit(true), &Value::integral(0)), Some(Ordering::Less));
        assert_eq!(compare(&Value::integral(5), &Value::string("a")), Some(Ordering::Less));
    }

    #[test]
    fn cross_family_temporals_are_incomparable() {
        use crate::temporal::{Date, Temporal};
        let year = Value::temporal(Temporal::Year(2024));
        let date = Value::temporal(Temporal::LocalDate(Date { year: 2024, month: 1, day: 1 }));
        assert!(!comparable(&year, &date));
    }

    #[test]
    fn mixed_numeric_representations_compare_by_value() {
        use std::str::FromStr;
        let decimal = Value::decimal(BigDecimal::from_str("2.0").unwrap());
        assert_eq!(compare(&Value::integral(2), &decimal), Some(Ordering::Equal));
    }

    #[test]
    fn string_and_text_compare_by_lexical_content() {
        let s = Value::string("abc");
        let t = Value::text(Locale::new("en"), "abd");
        assert_eq!(compare(&s, &t), Some(Ordering::Less));
    }

    #[test]
    fn text_compares_locale_before_lexeme() {
        let en_z = Value::text(Locale::new("en"), "zzz");
        let fr_a = Value::text(Locale::new("fr"), "aaa");
        assert_eq!(compare(&en_z, &fr_a), Some(Ordering::Less));

        let en_a = Value::text(Locale::new("en"), "aaa");
        assert_eq!(compare(&en_a, &en_z), Some(Ordering::Less));
    }

    #[test]
    fn containers_are_never_comparable() {
        assert!(!comparable(&Value::array(vec![]), &Value::array(vec![])));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_comparable() -> impl Strategy<Value = Value> {
        prop_oneof![any::<bool>().prop_map(Value::bit), any::<i64>().prop_map(Value::integral),]
    }

    proptest! {
        // §8 property 2: compare(x, x) == Equal, and compare(x, y) ==
        // -compare(y, x) whenever the pair is comparable at all.
        #[test]
        fn reflexive(x in arb_comparable()) {
            prop_assert_eq!(compare(&x, &x), Some(Ordering::Equal));
        }

        #[test]
        fn antisymmetric(x in arb_comparable(), y in arb_comparable()) {
            prop_assert_eq!(compare(&x, &y), compare(&y, &x).map(Ordering::reverse));
        }
    }
}
