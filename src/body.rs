//! Request bodies.
//!
//! A [`Body`] is one of a closed set of kinds, and the kind alone decides
//! what rek does with it before handing the request to the fetch primitive:
//!
//! | kind                         | variants                  | treatment                         |
//! |------------------------------|---------------------------|-----------------------------------|
//! | plain data                   | `Json` object or array    | serialized, `content-type` set    |
//! | scalar                       | `Json` string/number/bool | sent as text, headers untouched   |
//! | nothing                      | `Json` null               | no body is sent                   |
//! | form-like                    | `Form`, `SearchParams`    | `content-type` removed            |
//! | binary                       | `Bytes`, `Blob`           | passed through                    |
//! | text                         | `Text`                    | passed through                    |

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, header};
use serde::Serialize;
use serde_json::Value;

use crate::{FormData, SearchParams};

const APPLICATION_JSON: &str = "application/json";

/// Binary payload tagged with an optional MIME type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob {
    bytes: Bytes,
    content_type: Option<String>,
}

impl Blob {
    /// Create a blob.
    pub fn new(bytes: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type,
        }
    }

    /// MIME type, if known.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Payload bytes.
    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Consume the blob, returning its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

/// A request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A JSON value. Objects and arrays are serialized as JSON, scalars are
    /// sent as text and `null` sends nothing.
    Json(Value),
    /// Multipart form fields.
    Form(FormData),
    /// URL-encoded form fields.
    SearchParams(SearchParams),
    /// Raw bytes.
    Bytes(Bytes),
    /// Bytes with a MIME type.
    Blob(Blob),
    /// Text sent as-is.
    Text(String),
}

impl Body {
    /// Serialize any value into a plain-data body.
    ///
    /// # Errors
    ///
    /// Fails if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Self::Json)
    }

    /// Whether the fetch layer is responsible for the content type.
    pub const fn is_form_like(&self) -> bool {
        matches!(self, Self::Form(_) | Self::SearchParams(_))
    }

    /// Whether this is a binary payload.
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Bytes(_) | Self::Blob(_))
    }

    /// Text content, for text bodies.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Adjust the body and headers before sending.
    ///
    /// Plain data (a JSON object or array) becomes JSON text with
    /// `content-type: application/json` unless one is already set. Other JSON
    /// scalars are sent as their text, and `null` means no body at all.
    /// Form-like bodies drop any `content-type` so the fetch layer can pick
    /// the boundary. Everything else is left alone.
    pub(crate) fn prepare(
        self,
        headers: &mut HeaderMap,
    ) -> Result<Option<Self>, serde_json::Error> {
        match self {
            Self::Json(Value::Null) => Ok(None),
            Self::Json(Value::String(text)) => Ok(Some(Self::Text(text))),
            Self::Json(scalar @ (Value::Bool(_) | Value::Number(_))) => {
                Ok(Some(Self::Text(scalar.to_string())))
            }
            Self::Json(value) => {
                tracing::trace!("serializing plain data body as JSON");
                if !headers.contains_key(header::CONTENT_TYPE) {
                    headers.insert(
                        header::CONTENT_TYPE,
                        HeaderValue::from_static(APPLICATION_JSON),
                    );
                }
                serde_json::to_string(&value).map(|text| Some(Self::Text(text)))
            }
            body if body.is_form_like() => {
                tracing::trace!("form-like body, leaving content type to the fetch layer");
                headers.remove(header::CONTENT_TYPE);
                Ok(Some(body))
            }
            body => Ok(Some(body)),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<FormData> for Body {
    fn from(form: FormData) -> Self {
        Self::Form(form)
    }
}

impl From<SearchParams> for Body {
    fn from(params: SearchParams) -> Self {
        Self::SearchParams(params)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes.into())
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Self::Bytes(Bytes::from_static(bytes))
    }
}

impl From<Blob> for Body {
    fn from(blob: Blob) -> Self {
        Self::Blob(blob)
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}
