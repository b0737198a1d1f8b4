//! The request factory.

use core::future::Future;
use std::sync::Arc;

use http::{HeaderValue, Method, StatusCode, header};
use url::Url;

use crate::{
    Api, Body, Error, FetchError, Options, Reply, Request, ResponseMode, Result,
    error::BodyError,
};

/// Build a request function from default options and a capability set.
///
/// The defaults are captured immutably; use [`Rek::extend`] to derive an
/// instance with different defaults.
///
/// # Example
/// ```no_run
/// use rek::{Api, Options, Representation, factory};
/// use serde_json::json;
///
/// # async fn example(fetch: impl rek::Fetch) -> rek::Result<()> {
/// let rek = factory(
///     Options::new()
///         .base_url("https://api.example.com/v1/")
///         .response(Representation::Json),
///     Api::with_fetch(fetch),
/// );
///
/// let user = rek.get("users/1", ()).await?;
/// rek.post("users", json!({ "name": "Ada" }), ()).await?;
/// # Ok(())
/// # }
/// ```
pub fn factory(defaults: Options, api: Api) -> Rek {
    Rek {
        defaults: Arc::new(defaults),
        api,
    }
}

/// A configured request function.
///
/// Cheap to clone; clones share the same immutable defaults and capability
/// set. Concurrent calls do not interfere: every call builds its own headers
/// and options.
#[derive(Debug, Clone)]
pub struct Rek {
    defaults: Arc<Options>,
    api: Api,
}

impl Rek {
    /// The defaults every call starts from.
    pub fn defaults(&self) -> &Options {
        &self.defaults
    }

    /// The capability set.
    pub const fn api(&self) -> &Api {
        &self.api
    }

    /// Derive a new instance. Defaults are merged with [`Options::merge`]
    /// and the capability set with [`Api::merge`]; `self` is left unchanged.
    #[must_use]
    pub fn extend(&self, defaults: Options, api: Api) -> Self {
        factory(self.defaults.merge(&defaults), self.api.merge(&api))
    }

    /// Issue a request.
    ///
    /// `options` can be full [`Options`], a response type name such as
    /// `"text"` (shorthand for `Options::new().response_type("text")`), a
    /// [`Representation`](crate::Representation), or `()` for none.
    ///
    /// # Errors
    ///
    /// - configuration errors (unknown response type, missing fetch
    ///   primitive, bad URL or header) before anything is sent
    /// - [`Error::Transport`] when the fetch primitive fails
    /// - [`Error::Fetch`] when the response status is not 2xx
    /// - [`Error::Body`] when the requested representation cannot be read
    pub fn request(
        &self,
        url: impl AsRef<str>,
        options: impl Into<Options>,
    ) -> impl Future<Output = Result<Reply>> + Send + '_ {
        self.issue(url.as_ref().to_owned(), options.into())
    }

    /// `GET` request.
    ///
    /// # Errors
    ///
    /// See [`Rek::request`].
    pub fn get(
        &self,
        url: impl AsRef<str>,
        options: impl Into<Options>,
    ) -> impl Future<Output = Result<Reply>> + Send + '_ {
        self.request(url, options.into().method(Method::GET))
    }

    /// `HEAD` request.
    ///
    /// # Errors
    ///
    /// See [`Rek::request`].
    pub fn head(
        &self,
        url: impl AsRef<str>,
        options: impl Into<Options>,
    ) -> impl Future<Output = Result<Reply>> + Send + '_ {
        self.request(url, options.into().method(Method::HEAD))
    }

    /// `DELETE` request.
    ///
    /// # Errors
    ///
    /// See [`Rek::request`].
    pub fn delete(
        &self,
        url: impl AsRef<str>,
        options: impl Into<Options>,
    ) -> impl Future<Output = Result<Reply>> + Send + '_ {
        self.request(url, options.into().method(Method::DELETE))
    }

    /// `POST` request with a body.
    ///
    /// # Errors
    ///
    /// See [`Rek::request`].
    pub fn post(
        &self,
        url: impl AsRef<str>,
        body: impl Into<Body>,
        options: impl Into<Options>,
    ) -> impl Future<Output = Result<Reply>> + Send + '_ {
        self.request(url, options.into().body(body).method(Method::POST))
    }

    /// `PUT` request with a body.
    ///
    /// # Errors
    ///
    /// See [`Rek::request`].
    pub fn put(
        &self,
        url: impl AsRef<str>,
        body: impl Into<Body>,
        options: impl Into<Options>,
    ) -> impl Future<Output = Result<Reply>> + Send + '_ {
        self.request(url, options.into().body(body).method(Method::PUT))
    }

    /// `PATCH` request with a body.
    ///
    /// # Errors
    ///
    /// See [`Rek::request`].
    pub fn patch(
        &self,
        url: impl AsRef<str>,
        body: impl Into<Body>,
        options: impl Into<Options>,
    ) -> impl Future<Output = Result<Reply>> + Send + '_ {
        self.request(url, options.into().body(body).method(Method::PATCH))
    }

    async fn issue(&self, url: String, options: Options) -> Result<Reply> {
        let mut options = self.defaults.merge(&options);

        let mode = options.response_mode()?;
        let fetch = self.api.fetch().cloned().ok_or(Error::MissingFetch)?;
        let url = resolve_url(&url, &options)?;

        let mut headers = options.header_map()?;
        let body = options
            .take_body()
            .map(|body| body.prepare(&mut headers))
            .transpose()
            .map_err(|err| Error::Body(BodyError::Json(err)))?
            .flatten();

        if let ResponseMode::Representation(representation) = &mode {
            tracing::trace!(%representation, "requesting representation");
            headers.insert(
                header::ACCEPT,
                HeaderValue::from_static(representation.accept()),
            );
        }

        let request = Request {
            url,
            method: options.get_method().cloned().unwrap_or(Method::GET),
            headers,
            body,
            credentials: options.get_credentials(),
        };
        tracing::debug!(method = %request.method, url = %request.url, "issuing request");

        let mut response = fetch.fetch(request).await.map_err(Error::Transport)?;

        if !response.ok() {
            tracing::debug!(
                status = %response.status(),
                url = %response.url(),
                "non-success response"
            );
            return Err(FetchError::from_response(response).await.into());
        }

        match mode {
            ResponseMode::NoParse => Ok(Reply::Response(response)),
            ResponseMode::Transform(transform) => transform.call(response).await,
            ResponseMode::Representation(_) if response.status() == StatusCode::NO_CONTENT => {
                Ok(Reply::Null)
            }
            ResponseMode::Representation(representation) => {
                representation.read(&mut response).await
            }
        }
    }
}

/// Apply the base URL and query parameters to a request URL.
fn resolve_url(url: &str, options: &Options) -> Result<String> {
    let mut url = match options.get_base_url() {
        Some(base) => {
            let base = Url::parse(base).map_err(|source| Error::InvalidUrl {
                url: base.to_owned(),
                source,
            })?;
            base.join(url)
                .map_err(|source| Error::InvalidUrl {
                    url: url.to_owned(),
                    source,
                })?
                .to_string()
        }
        None => url.to_owned(),
    };

    if let Some(params) = options.get_search_params() {
        let end = url.find('?').unwrap_or(url.len());
        url.truncate(end);
        url.push('?');
        url.push_str(&params.to_string());
    }

    Ok(url)
}
