//! Responses returned by the fetch primitive and the values a call resolves to.

use core::{any::Any, fmt, future::Future, str::FromStr};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Bytes, BytesMut};
use futures_util::{
    Stream, StreamExt,
    future::BoxFuture,
    stream::BoxStream,
};
use http::{HeaderMap, HeaderValue, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    Blob, FormData,
    error::{BodyError, BoxError, Error, Result},
};

/// A byte stream used as a response body.
pub type ByteStream = BoxStream<'static, Result<Bytes, BoxError>>;

enum ResponseBody {
    Empty,
    Buffered(Bytes),
    // Only ever taken whole; the mutex exists to make `Response: Sync`.
    Stream(Mutex<ByteStream>),
    Used,
}

/// An HTTP response produced by a [`Fetch`](crate::Fetch) primitive.
///
/// The body can be read exactly once through one of the reader methods;
/// afterwards [`Response::body_used`] is `true` and further reads fail with
/// [`BodyError::AlreadyRead`].
pub struct Response {
    status: StatusCode,
    status_text: Option<String>,
    url: String,
    headers: HeaderMap,
    body: ResponseBody,
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("status_text", &self.status_text())
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body_used", &self.body_used())
            .finish_non_exhaustive()
    }
}

impl Response {
    /// Create an empty response with the given status.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            status_text: None,
            url: String::new(),
            headers: HeaderMap::new(),
            body: ResponseBody::Empty,
        }
    }

    /// Override the status line text (defaults to the canonical reason phrase).
    #[must_use]
    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = Some(text.into());
        self
    }

    /// Set the final URL of the response.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Replace the response headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add a single header. Invalid names or values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.parse::<header::HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Use a buffered body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Buffered(body.into());
        self
    }

    /// Use a streamed body.
    #[must_use]
    pub fn with_stream<S>(mut self, stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
    {
        self.body = ResponseBody::Stream(Mutex::new(stream.boxed()));
        self
    }

    /// Status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is in the 200-299 range.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// Status line text.
    pub fn status_text(&self) -> &str {
        self.status_text
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or_default()
    }

    /// Final URL of the response.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Response headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of the `content-type` header, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Whether the body has already been consumed.
    pub const fn body_used(&self) -> bool {
        matches!(self.body, ResponseBody::Used)
    }

    /// Read the whole body as bytes.
    ///
    /// # Errors
    ///
    /// Fails if the body was already read or the stream errors.
    pub async fn array_buffer(&mut self) -> Result<Bytes, BodyError> {
        match std::mem::replace(&mut self.body, ResponseBody::Used) {
            ResponseBody::Used => Err(BodyError::AlreadyRead),
            ResponseBody::Empty => Ok(Bytes::new()),
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Stream(stream) => {
                let mut stream = stream.into_inner().unwrap_or_else(PoisonError::into_inner);
                let mut buffer = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk.map_err(BodyError::Read)?);
                }
                Ok(buffer.freeze())
            }
        }
    }

    /// Read the body as a [`Blob`] tagged with the response content type.
    ///
    /// # Errors
    ///
    /// Fails if the body was already read or the stream errors.
    pub async fn blob(&mut self) -> Result<Blob, BodyError> {
        let content_type = self.content_type().map(ToOwned::to_owned);
        let bytes = self.array_buffer().await?;
        Ok(Blob::new(bytes, content_type))
    }

    /// Read the body as text. Invalid UTF-8 sequences are replaced with
    /// `U+FFFD`.
    ///
    /// # Errors
    ///
    /// Fails if the body was already read or the stream errors.
    pub async fn text(&mut self) -> Result<String, BodyError> {
        let bytes = self.array_buffer().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the body as an untyped JSON value.
    ///
    /// # Errors
    ///
    /// Fails if the body cannot be read or is not JSON.
    pub async fn json(&mut self) -> Result<Value, BodyError> {
        self.json_as().await
    }

    /// Read the body as JSON into the specified type.
    ///
    /// # Errors
    ///
    /// Fails if the body cannot be read or does not match `T`.
    pub async fn json_as<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        let bytes = self.array_buffer().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Read the body as form data.
    ///
    /// Supports `multipart/form-data` and `application/x-www-form-urlencoded`
    /// bodies.
    ///
    /// # Errors
    ///
    /// Fails if the body cannot be read, the content type is neither of the
    /// supported ones, or the payload is malformed.
    pub async fn form_data(&mut self) -> Result<FormData, BodyError> {
        let content_type = self.content_type().map(ToOwned::to_owned);
        let bytes = self.array_buffer().await?;
        FormData::decode(content_type.as_deref(), &bytes)
    }
}

impl<B: Into<Bytes>> From<http::Response<B>> for Response {
    fn from(response: http::Response<B>) -> Self {
        let (parts, body) = response.into_parts();
        Self::new(parts.status)
            .with_headers(parts.headers)
            .with_body(body)
    }
}

/// A named way of decoding a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Representation {
    /// Raw bytes.
    ArrayBuffer,
    /// Bytes plus MIME type.
    Blob,
    /// Decoded form fields.
    FormData,
    /// Parsed JSON value.
    Json,
    /// UTF-8 text.
    Text,
}

impl Representation {
    /// Canonical name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::ArrayBuffer => "arrayBuffer",
            Self::Blob => "blob",
            Self::FormData => "formData",
            Self::Json => "json",
            Self::Text => "text",
        }
    }

    /// MIME type sent as `accept` when this representation is requested.
    pub const fn accept(self) -> &'static str {
        match self {
            Self::ArrayBuffer | Self::Blob => "*/*",
            Self::FormData => "multipart/form-data",
            Self::Json => "application/json",
            Self::Text => "text/*",
        }
    }

    pub(crate) async fn read(self, response: &mut Response) -> Result<Reply> {
        Ok(match self {
            Self::ArrayBuffer => Reply::ArrayBuffer(response.array_buffer().await?),
            Self::Blob => Reply::Blob(response.blob().await?),
            Self::FormData => Reply::FormData(response.form_data().await?),
            Self::Json => Reply::Json(response.json().await?),
            Self::Text => Reply::Text(response.text().await?),
        })
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Representation {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "arrayBuffer" => Ok(Self::ArrayBuffer),
            "blob" => Ok(Self::Blob),
            "formData" => Ok(Self::FormData),
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(Error::UnknownResponseType(other.to_owned())),
        }
    }
}

type TransformFn = dyn Fn(Response) -> BoxFuture<'static, Result<Reply>> + Send + Sync;

/// Custom response transform, invoked with the successful response.
#[derive(Clone)]
pub struct Transform(Arc<TransformFn>);

impl Transform {
    /// Wrap an async closure.
    pub fn new<F, Fut>(transform: F) -> Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply>> + Send + 'static,
    {
        Self(Arc::new(
            move |response: Response| -> BoxFuture<'static, Result<Reply>> {
                Box::pin(transform(response))
            },
        ))
    }

    pub(crate) fn call(&self, response: Response) -> BoxFuture<'static, Result<Reply>> {
        (self.0)(response)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transform(..)")
    }
}

/// How a successful response is turned into the resolved value.
#[derive(Debug, Clone)]
pub enum ResponseMode {
    /// Resolve with the raw [`Response`].
    NoParse,
    /// Read the body with the given representation.
    Representation(Representation),
    /// Hand the response to a custom transform.
    Transform(Transform),
}

impl From<Representation> for ResponseMode {
    fn from(representation: Representation) -> Self {
        Self::Representation(representation)
    }
}

impl From<Transform> for ResponseMode {
    fn from(transform: Transform) -> Self {
        Self::Transform(transform)
    }
}

/// The value a request resolves to.
#[derive(Debug)]
pub enum Reply {
    /// The raw response (no parsing requested).
    Response(Response),
    /// A `204 No Content` answer to a parsing request.
    Null,
    /// Raw body bytes.
    ArrayBuffer(Bytes),
    /// Body bytes with MIME type.
    Blob(Blob),
    /// Decoded form data.
    FormData(FormData),
    /// Parsed JSON.
    Json(Value),
    /// Body text.
    Text(String),
    /// Any other value produced by a custom transform.
    Custom(Box<dyn Any + Send + Sync>),
}

impl Reply {
    /// Wrap an arbitrary value, typically as the output of a custom
    /// [`Transform`].
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        Self::Custom(Box::new(value))
    }

    /// Whether this is [`Reply::Null`].
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The raw response, if no parsing was requested.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Response(response) => Some(response),
            _ => None,
        }
    }

    /// The body text, if the text representation was requested.
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// The body bytes, for the array buffer and blob representations.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            Self::ArrayBuffer(bytes) => Some(bytes),
            Self::Blob(blob) => Some(blob.into_bytes()),
            _ => None,
        }
    }

    /// The decoded form, if the form data representation was requested.
    pub fn into_form_data(self) -> Option<FormData> {
        match self {
            Self::FormData(form) => Some(form),
            _ => None,
        }
    }

    /// The value returned by a custom transform, if it has type `T`.
    ///
    /// # Errors
    ///
    /// Gives the reply back unchanged when it is not a custom value of type `T`.
    pub fn into_custom<T: Any>(self) -> Result<T, Self> {
        match self {
            Self::Custom(value) => value.downcast::<T>().map(|value| *value).map_err(Self::Custom),
            other => Err(other),
        }
    }

    /// Deserialize a JSON reply into `T`. [`Reply::Null`] deserializes from
    /// JSON `null`, so `Option<T>` covers `204` answers.
    ///
    /// # Errors
    ///
    /// Fails if the reply is not JSON (or null) or does not match `T`.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        let value = match self {
            Self::Json(value) => value,
            Self::Null => Value::Null,
            other => {
                return Err(Error::other(format!(
                    "expected a JSON reply, got {}",
                    other.variant_name()
                )));
            }
        };
        serde_json::from_value(value).map_err(|err| BodyError::Json(err).into())
    }

    const fn variant_name(&self) -> &'static str {
        match self {
            Self::Response(_) => "a raw response",
            Self::Null => "null",
            Self::ArrayBuffer(_) => "an array buffer",
            Self::Blob(_) => "a blob",
            Self::FormData(_) => "form data",
            Self::Json(_) => "JSON",
            Self::Text(_) => "text",
            Self::Custom(_) => "a custom value",
        }
    }
}
