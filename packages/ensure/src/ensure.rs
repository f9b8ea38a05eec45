//! Checking records for present fields and returning narrowed copies.

use std::ops::Deref;

use crate::error::{EnsureError, Result};
use crate::record::Record;

/// A copy of a record whose checked fields are known to be present.
///
/// Only shared access to the copy is given out, so the checked fields stay
/// present for as long as the wrapper lives. Use [`Ensured::into_inner`] to
/// take the copy back for mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ensured<R> {
    record: R,
    checked: Vec<String>,
}

impl<R> Ensured<R> {
    /// Names of the fields that were checked, in checking order.
    #[must_use]
    pub fn checked_keys(&self) -> &[String] {
        &self.checked
    }

    /// Returns `true` if `key` was among the checked fields.
    #[must_use]
    pub fn is_checked(&self, key: &str) -> bool {
        self.checked.iter().any(|checked| checked == key)
    }

    /// Consume and return the copied record
    #[must_use]
    pub fn into_inner(self) -> R {
        self.record
    }
}

impl<R> Deref for Ensured<R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl<R> AsRef<R> for Ensured<R> {
    fn as_ref(&self) -> &R {
        &self.record
    }
}

#[cfg(feature = "serde")]
impl<R: serde::Serialize> serde::Serialize for Ensured<R> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.record.serialize(serializer)
    }
}

/// Checks that `value` is present and that the fields named by `keys` are
/// present, returning a copy of `value`.
///
/// With an empty `keys` every own field of the record is checked, in the
/// record's enumeration order. Checking stops at the first absent field.
/// Only the top level is checked; nested values are never inspected.
///
/// # Errors
/// - [`EnsureError::ValueNotDefined`] if `value` is `None`; no field is
///   checked in that case.
/// - [`EnsureError::MemberNotDefined`] naming the first absent field.
///
/// # Examples
/// ```
/// use std::collections::BTreeMap;
/// use ensure_defined::{ensure, EnsureError};
///
/// let mut dto = BTreeMap::new();
/// dto.insert("id".to_string(), Some("1"));
/// dto.insert("test".to_string(), None);
///
/// let ensured = ensure(Some(&dto), &["id"]).unwrap();
/// assert!(ensured.is_checked("id"));
///
/// let err = ensure(Some(&dto), &[]).unwrap_err();
/// assert_eq!(err, EnsureError::member_not_defined("test"));
/// ```
pub fn ensure<'a, R: Record>(value: Option<&'a R>, keys: &[R::Key<'a>]) -> Result<Ensured<R>> {
    let Some(value) = value else {
        tracing::debug!("supplied value was not defined");
        return Err(EnsureError::ValueNotDefined);
    };

    let keys = if keys.is_empty() {
        value.keys()
    } else {
        keys.to_vec()
    };

    let record = value.clone();
    let mut checked = Vec::with_capacity(keys.len());

    for key in &keys {
        let name = key.as_ref();
        if !value.is_member_defined(key) {
            tracing::debug!(key = %name, "member was not defined");
            return Err(EnsureError::member_not_defined(name));
        }
        checked.push(name.to_owned());
    }

    tracing::trace!(checked = checked.len(), "ensured record");
    Ok(Ensured { record, checked })
}

/// A record with a companion type in which every presence field has been
/// narrowed to its present type.
///
/// Implemented by `#[derive(Record)]`.
pub trait EnsureAll: Record {
    /// The record with absence stripped from every presence field.
    type Defined;

    /// Narrows every presence field, in declaration order.
    ///
    /// # Errors
    /// Returns [`EnsureError::MemberNotDefined`] naming the first absent field.
    fn into_defined(self) -> Result<Self::Defined>;
}

/// Checks that `value` and all of its fields are present, returning a copy
/// with every optional field unwrapped.
///
/// Behaves like [`ensure`] called without keys, but the result is the
/// statically narrowed [`EnsureAll::Defined`] type.
///
/// # Errors
/// Same as [`ensure`].
pub fn ensure_all<R: EnsureAll>(value: Option<&R>) -> Result<R::Defined> {
    let Some(value) = value else {
        tracing::debug!("supplied value was not defined");
        return Err(EnsureError::ValueNotDefined);
    };

    value.clone().into_defined().inspect_err(|err| {
        if let Some(key) = err.member() {
            tracing::debug!(key = %key, "member was not defined");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use rstest::rstest;

    fn record(
        entries: &[(&str, Option<&'static str>)],
    ) -> BTreeMap<String, Option<&'static str>> {
        entries
            .iter()
            .map(|(key, value)| ((*key).to_string(), *value))
            .collect()
    }

    #[test]
    fn test_ensure_absent_value() {
        let result = ensure::<BTreeMap<String, Option<&str>>>(None, &["a", "b"]);
        assert_eq!(result, Err(EnsureError::ValueNotDefined));
    }

    #[test]
    fn test_ensure_absent_value_without_keys() {
        let result = ensure::<BTreeMap<String, Option<&str>>>(None, &[]);
        assert_eq!(result, Err(EnsureError::ValueNotDefined));
    }

    #[test]
    fn test_ensure_without_keys_checks_every_field() {
        let value = record(&[("fizz", Some("BUZZ")), ("blub", Some(""))]);

        let ensured = ensure(Some(&value), &[]).unwrap();
        assert_eq!(*ensured, value);
        assert_eq!(ensured.checked_keys(), ["blub", "fizz"]);
    }

    #[rstest]
    #[case::first_in_order(&[("a", None), ("b", None)], "a")]
    #[case::after_present(&[("a", Some("x")), ("b", None), ("c", None)], "b")]
    fn test_ensure_without_keys_reports_first_absent(
        #[case] entries: &[(&str, Option<&'static str>)],
        #[case] expected: &str,
    ) {
        let value = record(entries);

        let err = ensure(Some(&value), &[]).unwrap_err();
        assert_eq!(err, EnsureError::member_not_defined(expected));
    }

    #[rstest]
    #[case::only_listed(&["fizz"], Ok(()))]
    #[case::absent_listed(&["test"], Err("test"))]
    #[case::missing_key(&["nope"], Err("nope"))]
    #[case::order_decides(&["fizz", "test", "nope"], Err("test"))]
    #[case::reverse_order(&["nope", "test"], Err("nope"))]
    fn test_ensure_with_keys(
        #[case] keys: &[&str],
        #[case] expected: std::result::Result<(), &str>,
    ) {
        let value = record(&[("fizz", Some("BUZZ")), ("test", None)]);

        let result = ensure(Some(&value), keys).map(|_| ());
        assert_eq!(result, expected.map_err(EnsureError::member_not_defined));
    }

    #[test]
    fn test_ensure_copies_are_independent() {
        let value = record(&[("fizz", Some("BUZZ"))]);

        let mut first = ensure(Some(&value), &[]).unwrap().into_inner();
        let second = ensure(Some(&value), &[]).unwrap().into_inner();
        assert_eq!(first, second);

        first.insert("fizz".to_string(), Some("changed"));
        assert_eq!(second.get("fizz"), Some(&Some("BUZZ")));
        assert_eq!(value.get("fizz"), Some(&Some("BUZZ")));
    }

    #[test]
    fn test_ensure_empty_record() {
        let value = record(&[]);

        let ensured = ensure(Some(&value), &[]).unwrap();
        assert!(ensured.checked_keys().is_empty());
        assert!(ensured.is_empty());
    }

    #[test]
    fn test_ensured_is_checked() {
        let value = record(&[("a", Some("1")), ("b", None)]);

        let ensured = ensure(Some(&value), &["a"]).unwrap();
        assert!(ensured.is_checked("a"));
        assert!(!ensured.is_checked("b"));
        assert_eq!(ensured.as_ref().len(), 2);
        assert_eq!(ensured.checked_keys(), vec!["a".to_string()]);
    }

    #[cfg(feature = "json")]
    mod json {
        use super::*;
        use serde_json::{json, Map, Value};

        fn object(value: Value) -> Map<String, Value> {
            match value {
                Value::Object(map) => map,
                other => panic!("expected an object, got {other}"),
            }
        }

        #[test]
        fn test_ensure_json_without_keys() {
            let value = object(json!({ "fizz": "BUZZ", "test": null, "blub": 1 }));

            let err = ensure(Some(&value), &[]).unwrap_err();
            assert_eq!(err.to_string(), "Member was not defined: test");
        }

        #[test]
        fn test_ensure_json_with_keys() {
            let value = object(json!({ "fizz": "BUZZ", "test": null }));

            let ensured = ensure(Some(&value), &["fizz"]).unwrap();
            assert_eq!(ensured["fizz"], json!("BUZZ"));
            assert_eq!(ensured["test"], Value::Null);
        }

        #[test]
        fn test_ensure_json_is_shallow() {
            let value = object(json!({ "nested": { "inner": null } }));

            let ensured = ensure(Some(&value), &[]).unwrap();
            assert_eq!(ensured["nested"]["inner"], Value::Null);
        }

        #[test]
        fn test_ensure_json_null_and_missing_behave_alike() {
            let with_null = object(json!({ "test": null }));
            let without = object(json!({}));

            assert_eq!(
                ensure(Some(&with_null), &["test"]).unwrap_err(),
                ensure(Some(&without), &["test"]).unwrap_err()
            );
        }
    }

    #[cfg(all(feature = "serde", feature = "json"))]
    #[test]
    fn test_ensured_serializes_as_the_record() {
        let value = record(&[("fizz", Some("BUZZ")), ("test", None)]);

        let ensured = ensure(Some(&value), &["fizz"]).unwrap();
        assert_eq!(
            serde_json::to_value(&ensured).unwrap(),
            serde_json::json!({ "fizz": "BUZZ", "test": null })
        );
    }
}
