//! Errors raised by the presence checks.

use thiserror::Error;

/// Reasons an [`ensure`](crate::ensure) call rejects its input.
///
/// The display strings are stable and are matched verbatim by callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnsureError {
    /// The record itself was absent.
    #[error("Supplied value was not defined!")]
    ValueNotDefined,
    /// A checked field of the record was absent.
    #[error("Member was not defined: {0}")]
    MemberNotDefined(String),
}

impl EnsureError {
    /// Builds a [`EnsureError::MemberNotDefined`] for `key`.
    #[must_use]
    pub fn member_not_defined(key: impl Into<String>) -> Self {
        Self::MemberNotDefined(key.into())
    }

    /// The name of the absent field, if this error is about a field.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        match self {
            Self::ValueNotDefined => None,
            Self::MemberNotDefined(key) => Some(key),
        }
    }
}

/// Result type alias for presence checks
pub type Result<T, E = EnsureError> = std::result::Result<T, E>;
