//! Bundled fetch primitives.
//!
//! rek works with any [`Fetch`](crate::Fetch) implementation. This module
//! ships one for convenience; it is only compiled with the `reqwest-backend`
//! feature (on by default).

#[cfg(feature = "reqwest-backend")]
mod reqwest;
#[cfg(feature = "reqwest-backend")]
pub use self::reqwest::ReqwestFetch;

/// The fetch primitive used by [`rek()`](crate::rek) and the free request
/// functions.
#[cfg(feature = "reqwest-backend")]
pub type DefaultFetch = ReqwestFetch;
