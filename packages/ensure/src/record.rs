//! Flat records whose fields can be checked for presence.

use std::collections::BTreeMap;

use crate::presence::Presence;

/// A flat record with a known set of named fields.
///
/// Sequences and sets are deliberately not records. The copy made by
/// [`ensure`](crate::ensure) is the record's [`Clone`]; fields meant to be
/// shared between the original and the copy belong behind `Rc`/`Arc`.
pub trait Record: Clone {
    /// A field name that callers may ask to be checked.
    ///
    /// Derived records use a generated field enum here, so asking for a
    /// field the record does not have fails to compile.
    type Key<'a>: Clone + AsRef<str>
    where
        Self: 'a;

    /// The record's own fields, in its enumeration order.
    fn keys(&self) -> Vec<Self::Key<'_>>;

    /// Returns `true` if the field at `key` holds a present value.
    ///
    /// A field that does not exist at all is absent.
    fn is_member_defined(&self, key: &Self::Key<'_>) -> bool;
}

impl<V> Record for BTreeMap<String, V>
where
    V: Presence + Clone,
{
    type Key<'a>
        = &'a str
    where
        Self: 'a;

    fn keys(&self) -> Vec<&str> {
        self.iter().map(|(key, _)| key.as_str()).collect()
    }

    fn is_member_defined(&self, key: &&str) -> bool {
        self.get(*key).is_some_and(Presence::is_present)
    }
}

#[cfg(feature = "indexmap")]
impl<V> Record for indexmap::IndexMap<String, V>
where
    V: Presence + Clone,
{
    type Key<'a>
        = &'a str
    where
        Self: 'a;

    fn keys(&self) -> Vec<&str> {
        self.iter().map(|(key, _)| key.as_str()).collect()
    }

    fn is_member_defined(&self, key: &&str) -> bool {
        self.get(*key).is_some_and(Presence::is_present)
    }
}

#[cfg(feature = "json")]
impl Record for serde_json::Map<String, serde_json::Value> {
    type Key<'a>
        = &'a str
    where
        Self: 'a;

    fn keys(&self) -> Vec<&str> {
        self.iter().map(|(key, _)| key.as_str()).collect()
    }

    fn is_member_defined(&self, key: &&str) -> bool {
        self.get(*key).is_some_and(Presence::is_present)
    }
}
