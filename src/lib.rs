//! # Fetch with less boilerplate
//! rek is a small convenience layer over an injected HTTP fetch primitive.
//! It takes care of the repetitive parts of making requests:
//! - merging per-call options with instance defaults (headers merge by name)
//! - resolving URLs against a base URL and applying query parameters
//! - serializing plain data bodies to JSON with the right `content-type`
//! - setting `accept` and decoding the response into the requested representation
//! - turning non-2xx responses into a typed [`FetchError`]
//!
//! The network itself is always someone else's job: a [`Fetch`]
//! implementation supplied through [`Api`]. With the default
//! `reqwest-backend` feature a ready-made instance is available from
//! [`rek()`].
//!
//! # Quick start
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use serde_json::json;
//!
//! let todo: serde_json::Value = rek::get("https://example.com/todos/1", ())
//!     .await?
//!     .into_json()?;
//! println!("{todo}");
//!
//! rek::post("https://example.com/todos", json!({ "title": "write docs" }), ()).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod body;
mod client;
mod error;
mod fetch;
mod multipart;
mod options;
mod response;
#[cfg(test)]
mod tests;

pub use body::{Blob, Body};
pub use client::{Rek, factory};
pub use error::{BodyError, BoxError, Error, ErrorKind, FetchError, Result};
pub use fetch::{Api, Fetch, Request};
pub use multipart::{FormData, FormPart};
pub use options::{Credentials, Options, SearchParams};
pub use response::{ByteStream, Reply, Representation, Response, ResponseMode, Transform};

pub use http::{HeaderMap, Method, StatusCode};

/// The default instance: same-origin credentials, JSON responses and the
/// bundled [`DefaultFetch`](backend::DefaultFetch) primitive.
///
/// Derive customised instances with [`Rek::extend`].
#[cfg(feature = "reqwest-backend")]
#[must_use]
pub fn rek() -> Rek {
    factory(
        Options::new()
            .credentials(Credentials::SameOrigin)
            .response(Representation::Json),
        Api::with_fetch(backend::DefaultFetch::new()),
    )
}

/// `GET` with the default instance.
///
/// # Errors
///
/// See [`Rek::request`].
#[cfg(feature = "reqwest-backend")]
pub async fn get(url: impl AsRef<str>, options: impl Into<Options>) -> Result<Reply> {
    rek().get(url, options).await
}

/// `HEAD` with the default instance.
///
/// # Errors
///
/// See [`Rek::request`].
#[cfg(feature = "reqwest-backend")]
pub async fn head(url: impl AsRef<str>, options: impl Into<Options>) -> Result<Reply> {
    rek().head(url, options).await
}

/// `DELETE` with the default instance.
///
/// # Errors
///
/// See [`Rek::request`].
#[cfg(feature = "reqwest-backend")]
pub async fn delete(url: impl AsRef<str>, options: impl Into<Options>) -> Result<Reply> {
    rek().delete(url, options).await
}

/// `POST` with the default instance.
///
/// # Errors
///
/// See [`Rek::request`].
#[cfg(feature = "reqwest-backend")]
pub async fn post(
    url: impl AsRef<str>,
    body: impl Into<Body>,
    options: impl Into<Options>,
) -> Result<Reply> {
    rek().post(url, body, options).await
}

/// `PUT` with the default instance.
///
/// # Errors
///
/// See [`Rek::request`].
#[cfg(feature = "reqwest-backend")]
pub async fn put(
    url: impl AsRef<str>,
    body: impl Into<Body>,
    options: impl Into<Options>,
) -> Result<Reply> {
    rek().put(url, body, options).await
}

/// `PATCH` with the default instance.
///
/// # Errors
///
/// See [`Rek::request`].
#[cfg(feature = "reqwest-backend")]
pub async fn patch(
    url: impl AsRef<str>,
    body: impl Into<Body>,
    options: impl Into<Options>,
) -> Result<Reply> {
    rek().patch(url, body, options).await
}
