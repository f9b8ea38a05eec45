#![doc = include_str!("../README.md")]
#![deny(clippy::nursery, clippy::pedantic, missing_docs)]

//! Presence checks for optional values and flat records
//!
//! [`is_defined`] tells a present value apart from an absent one, and
//! [`ensure`] checks some or all fields of a [`Record`] and hands back a copy
//! whose checked fields are known to be present.

mod ensure;
mod error;
mod presence;
mod record;

pub use ensure::{ensure, ensure_all, EnsureAll, Ensured};
pub use error::{EnsureError, Result};
pub use presence::{is_defined, Presence, Present};
pub use record::Record;

#[cfg(feature = "derive")]
pub use ensure_defined_derive::Record;
