//! Telling present values apart from absent ones.
//!
//! Rust folds "undefined" and "null" into a single absent state: `None` for
//! typed values, `null` for dynamic JSON values. Everything else, including
//! falsy values such as `Some(0)`, `Some("")` or `false`, is present.

/// A value that may be absent.
///
/// `Present` is the value's type once absence has been ruled out, so
/// `Present<Option<T>>` is `T`.
pub trait Presence {
    /// The type of the value after narrowing away absence.
    type Present;

    /// Returns `true` if the value is present.
    fn is_present(&self) -> bool;

    /// Narrows the value, returning `None` if it is absent.
    fn into_present(self) -> Option<Self::Present>
    where
        Self: Sized;

    /// Narrows the value by reference, returning `None` if it is absent.
    fn as_present(&self) -> Option<&Self::Present>;
}

/// The narrowed type of a [`Presence`] value.
pub type Present<P> = <P as Presence>::Present;

impl<T> Presence for Option<T> {
    type Present = T;

    fn is_present(&self) -> bool {
        self.is_some()
    }

    fn into_present(self) -> Self {
        self
    }

    fn as_present(&self) -> Option<&T> {
        self.as_ref()
    }
}

#[cfg(feature = "json")]
impl Presence for serde_json::Value {
    type Present = Self;

    fn is_present(&self) -> bool {
        !self.is_null()
    }

    fn into_present(self) -> Option<Self> {
        (!self.is_null()).then_some(self)
    }

    fn as_present(&self) -> Option<&Self> {
        (!self.is_null()).then_some(self)
    }
}

/// Returns `true` if `value` is neither undefined nor null.
///
/// # Examples
/// ```
/// use ensure_defined::is_defined;
///
/// assert!(is_defined(&Some("test")));
/// assert!(is_defined(&Some(0)));
/// assert!(!is_defined(&None::<&str>));
/// ```
#[inline]
#[must_use]
pub fn is_defined<P: Presence + ?Sized>(value: &P) -> bool {
    value.is_present()
}
