//! URI resolution/relativization against a caller-supplied base, used by
//! [`crate::Value::Uri`], `Data` datatypes, and `Object` `@id` fields.

use iri_string::types::{IriAbsoluteStr, IriReferenceStr};

use crate::error::ValueError;

/// Resolves `reference` against `base`, returning the absolute form.
///
/// `base` may be `None`, in which case `reference` is returned unchanged if
/// it is already absolute, and rejected otherwise.
pub fn resolve(base: Option<&str>, reference: &str) -> Result<String, ValueError> {
    let reference_ref = IriReferenceStr::new(reference)
        .map_err(|e| ValueError::InvalidArgument(format!("invalid URI {reference:?}: {e}")))?;

    if let Ok(absolute) = IriAbsoluteStr::new(reference) {
        let _ = absolute;
        return Ok(reference.to_owned());
    }

    let base = base.ok_or_else(|| {
        ValueError::InvalidArgument(format!("relative URI {reference:?} requires a base"))
    })?;
    let base_ref = IriAbsoluteStr::new(base)
        .map_err(|e| ValueError::InvalidArgument(format!("invalid base URI {base:?}: {e}")))?;

    Ok(reference_ref.resolve_against(base_ref).to_string())
}

/// Renders `absolute` relative to `base` when `base` is a prefix of it,
/// otherwise returns `absolute` unchanged (§3: "id of `@id` field relative
/// to base").
pub fn relativize(base: Option<&str>, absolute: &str) -> String {
    match base {
        Some(base) if !base.is_empty() && absolute.starts_with(base) => {
            let rest = &absolute[base.len()..];
            if rest.is_empty() {
                absolute.to_owned()
            } else {
                rest.to_owned()
            }
        }
        _ => absolute.to_owned(),
    }
}

pub fn is_absolute(s: &str) -> bool {
    IriAbsoluteStr::new(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_against_base() {
        let resolved = resolve(Some("http://example.org/base/"), "child").unwrap();
        assert_eq!(resolved, "http://example.org/base/child");
    }

    #[test]
    fn leaves_absolute_unchanged() {
        let resolved = resolve(Some("http://example.org/"), "http://other.org/x").unwrap();
        assert_eq!(resolved, "http://other.org/x");
    }

    #[test]
    fn relativizes_against_matching_base() {
        assert_eq!(
            relativize(Some("http://example.org/base/"), "http://example.org/base/child"),
            "child"
        );
        assert_eq!(relativize(Some("http://example.org/base/"), "http://example.org/base/"), "http://example.org/base/");
    }
}
