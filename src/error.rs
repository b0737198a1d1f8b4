//! Unified error types for rek.
//!
//! Every failure of a request surfaces through [`Error`]:
//! - configuration problems detected before the network is touched
//!   (unknown response type, missing fetch primitive, bad URL or header)
//! - transport failures reported by the injected [`Fetch`](crate::Fetch)
//!   primitive, passed through untouched
//! - non-success responses, converted into a [`FetchError`]
//! - failures decoding a successful response body

use http::StatusCode;
use serde_json::Value;
use std::error::Error as StdError;
use thiserror::Error;

use crate::Response;

/// Boxed error type used at the fetch primitive boundary.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Result alias used throughout rek.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for all rek operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The `response` option named a representation rek does not know.
    #[error("unknown response type: {0}")]
    UnknownResponseType(String),

    /// No fetch primitive was supplied in the capability set.
    #[error("no fetch primitive configured")]
    MissingFetch,

    /// The request URL could not be resolved against the base URL.
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        /// URL (or base URL) that failed to parse
        url: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// A configured header name or value is not valid HTTP.
    #[error("invalid header {0:?}")]
    InvalidHeader(String),

    /// The fetch primitive itself failed (network unreachable, TLS, ...).
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The server answered with a non-success status.
    #[error(transparent)]
    Fetch(#[from] Box<FetchError>),

    /// A successful response body could not be read or decoded.
    #[error("failed to read response body: {0}")]
    Body(#[from] BodyError),

    /// Failure raised by a custom response transform.
    #[error("{0}")]
    Other(#[source] BoxError),
}

/// Errors raised while reading a response body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body was already consumed by an earlier read.
    #[error("body has already been read")]
    AlreadyRead,

    /// The underlying byte stream failed.
    #[error("failed to read body: {0}")]
    Read(#[source] BoxError),

    /// The body is not valid JSON (or not the requested shape).
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// The body could not be decoded as form data.
    #[error("invalid form data: {0}")]
    Form(String),
}

/// A non-success HTTP response.
///
/// Carries the failing [`Response`] (its body already consumed) together with
/// a best-effort decoding of that body: parsed JSON when the text is valid
/// JSON, the raw text otherwise, or [`Value::Null`] when the body is empty or
/// could not be read.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FetchError {
    message: String,
    status: StatusCode,
    response: Response,
    body: Value,
}

impl FetchError {
    /// Build an error from a failing response, reading whatever body it has.
    ///
    /// Never fails: any problem reading the body degrades to `Value::Null`.
    pub async fn from_response(mut response: Response) -> Self {
        let body = match response.text().await {
            Ok(text) => parse_error_body(text),
            Err(err) => {
                tracing::trace!(error = %err, "could not read error body");
                Value::Null
            }
        };

        Self {
            message: response.status_text().to_owned(),
            status: response.status(),
            response,
            body,
        }
    }

    /// Status line text of the failing response.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status code of the failing response.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The failing response, for header/url introspection.
    pub const fn response(&self) -> &Response {
        &self.response
    }

    /// Best-effort decoded error body.
    pub const fn body(&self) -> &Value {
        &self.body
    }

    /// Consume the error, returning the failing response.
    pub fn into_response(self) -> Response {
        self.response
    }

    /// Attempt to deserialize the error body as a specific type.
    ///
    /// Useful for APIs that return structured error payloads.
    ///
    /// # Example
    /// ```no_run
    /// use serde::Deserialize;
    ///
    /// #[derive(Deserialize)]
    /// struct ApiError {
    ///     reason: String,
    /// }
    ///
    /// # async fn example(rek: rek::Rek) {
    /// if let Err(err) = rek.get("/items", ()).await {
    ///     if let Some(api) = err.fetch_error().and_then(|e| e.deserialize_body::<ApiError>()) {
    ///         println!("rejected: {}", api.reason);
    ///     }
    /// }
    /// # }
    /// ```
    pub fn deserialize_body<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.body.clone()).ok()
    }
}

fn parse_error_body(text: String) -> Value {
    if let Ok(value) = serde_json::from_str(&text) {
        return value;
    }
    if text.is_empty() {
        Value::Null
    } else {
        Value::String(text)
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        Self::Fetch(Box::new(err))
    }
}

impl Error {
    /// Wrap an arbitrary error raised by a custom transform.
    pub fn other(err: impl Into<BoxError>) -> Self {
        Self::Other(err.into())
    }

    /// Check if this error was raised before any network attempt.
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownResponseType(_)
                | Self::MissingFetch
                | Self::InvalidUrl { .. }
                | Self::InvalidHeader(_)
        )
    }

    /// Check if this is a failure of the fetch primitive.
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a client error (4xx HTTP status).
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|status| status.is_client_error())
    }

    /// Check if this is a server error (5xx HTTP status).
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status.is_server_error())
    }

    /// Status code of the failing response, if this is a [`FetchError`].
    pub fn status(&self) -> Option<StatusCode> {
        self.fetch_error().map(FetchError::status)
    }

    /// The [`FetchError`], if the server answered with a non-success status.
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            Self::Fetch(err) => Some(err),
            _ => None,
        }
    }

    /// Get the error category.
    ///
    /// Useful for logging.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownResponseType(_)
            | Self::MissingFetch
            | Self::InvalidUrl { .. }
            | Self::InvalidHeader(_) => ErrorKind::Config,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Fetch(_) => ErrorKind::Http,
            Self::Body(_) => ErrorKind::BodyParse,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

/// Error category labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Configuration error, raised before the network
    Config,
    /// Fetch primitive failure
    Transport,
    /// Non-success HTTP status
    Http,
    /// Response body decoding error
    BodyParse,
    /// Other/uncategorized error
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config => write!(f, "config"),
            Self::Transport => write!(f, "transport"),
            Self::Http => write!(f, "http"),
            Self::BodyParse => write!(f, "body_parse"),
            Self::Other => write!(f, "other"),
        }
    }
}
