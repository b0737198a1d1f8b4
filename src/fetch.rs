//! The injected network primitive and the capability set carrying it.
//!
//! rek never talks to the network itself. Every request is handed to a
//! [`Fetch`] implementation supplied through [`Api`]; connection handling,
//! redirects, TLS, timeouts and cancellation are all its business.

use core::{fmt, future::Future};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use http::{HeaderMap, Method};

use crate::{Body, Credentials, Response, error::BoxError};

/// A request as handed to the fetch primitive.
#[derive(Debug, Clone)]
pub struct Request {
    /// Resolved URL (base URL and query parameters already applied).
    pub url: String,
    /// HTTP method.
    pub method: Method,
    /// Headers built for this call only.
    pub headers: HeaderMap,
    /// Body, already prepared (plain data serialized to JSON text).
    pub body: Option<Body>,
    /// Credentials policy, if configured.
    pub credentials: Option<Credentials>,
}

impl Request {
    /// Create a bodiless request.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: HeaderMap::new(),
            body: None,
            credentials: None,
        }
    }
}

/// Network primitive: performs exactly one HTTP round trip.
///
/// Any `Fn(Request) -> impl Future<Output = Result<Response, BoxError>>`
/// closure implements this trait.
pub trait Fetch: Send + Sync + 'static {
    /// Perform the request.
    ///
    /// Errors are transport failures; a response with any status code,
    /// including 4xx/5xx, is a success at this level.
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, BoxError>>;
}

impl<F, Fut> Fetch for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, BoxError>> + Send + 'static,
{
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, BoxError>> {
        Box::pin(self(request))
    }
}

/// The capability set a [`Rek`](crate::Rek) instance depends on.
#[derive(Clone, Default)]
pub struct Api {
    fetch: Option<Arc<dyn Fetch>>,
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("fetch", &self.fetch.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Api {
    /// Empty capability set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Capability set with the given fetch primitive.
    pub fn with_fetch(fetch: impl Fetch) -> Self {
        Self {
            fetch: Some(Arc::new(fetch)),
        }
    }

    /// Capability set sharing an existing fetch primitive.
    pub fn with_shared_fetch(fetch: Arc<dyn Fetch>) -> Self {
        Self { fetch: Some(fetch) }
    }

    /// The fetch primitive, if one was supplied.
    pub fn fetch(&self) -> Option<&Arc<dyn Fetch>> {
        self.fetch.as_ref()
    }

    /// Shallow merge: primitives supplied by `other` win.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            fetch: other.fetch.clone().or_else(|| self.fetch.clone()),
        }
    }
}
