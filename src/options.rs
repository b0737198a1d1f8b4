//! Request options and their merge rules.

use std::{collections::BTreeMap, fmt};

use http::{HeaderMap, HeaderName, HeaderValue, Method};

use crate::{
    Body, Error, Representation, ResponseMode, Result, Transform,
    response::Reply,
};

/// Whether the fetch primitive should send credentials (cookies, auth).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credentials {
    /// Never send credentials.
    Omit,
    /// Only send credentials to the same origin.
    SameOrigin,
    /// Always send credentials.
    Include,
}

impl Credentials {
    /// Name as used by fetch implementations.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Omit => "omit",
            Self::SameOrigin => "same-origin",
            Self::Include => "include",
        }
    }
}

/// Ordered query string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    /// Create empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string. A leading `?` is ignored.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect()
    }

    /// Append a parameter.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Append a parameter (builder-style).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// First value of the named parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate over all pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl fmt::Display for SearchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&self.pairs)
            .finish();
        f.write_str(&encoded)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl From<&str> for SearchParams {
    fn from(query: &str) -> Self {
        Self::parse(query)
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for SearchParams {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for SearchParams {
    fn from(map: BTreeMap<K, V>) -> Self {
        map.into_iter().collect()
    }
}

#[derive(Debug, Clone)]
enum ResponseSetting {
    Mode(ResponseMode),
    // Validated when the request is issued.
    Named(String),
}

/// Options controlling a request.
///
/// Used both as the defaults captured by a [`Rek`](crate::Rek) instance and
/// as per-call overrides. Every field is optional; see [`Options::merge`] for
/// how two sets of options combine.
#[derive(Debug, Clone, Default)]
pub struct Options {
    method: Option<Method>,
    // Keyed by lowercased header name.
    headers: BTreeMap<String, String>,
    credentials: Option<Credentials>,
    base_url: Option<String>,
    search_params: Option<SearchParams>,
    body: Option<Body>,
    response: Option<ResponseSetting>,
}

impl Options {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set a header. Names are case-insensitive; a later value replaces an
    /// earlier one.
    #[must_use]
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Set several headers.
    #[must_use]
    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        headers
            .into_iter()
            .fold(self, |options, (name, value)| options.header(name, value))
    }

    /// Set the credentials policy passed to the fetch primitive.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Resolve request URLs against this base URL.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Replace the query string of request URLs with these parameters.
    #[must_use]
    pub fn search_params(mut self, params: impl Into<SearchParams>) -> Self {
        self.search_params = Some(params.into());
        self
    }

    /// Set the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Choose how the successful response is turned into the reply.
    #[must_use]
    pub fn response(mut self, mode: impl Into<ResponseMode>) -> Self {
        self.response = Some(ResponseSetting::Mode(mode.into()));
        self
    }

    /// Choose the response representation by name (`"json"`, `"text"`, ...).
    ///
    /// An empty name resolves with the raw response. Unknown names are
    /// reported when the request is issued, before any network traffic.
    #[must_use]
    pub fn response_type(mut self, name: impl Into<String>) -> Self {
        self.response = Some(ResponseSetting::Named(name.into()));
        self
    }

    /// Resolve with the raw [`Response`](crate::Response).
    #[must_use]
    pub fn no_parse(self) -> Self {
        self.response(ResponseMode::NoParse)
    }

    /// Resolve with the output of a custom transform.
    #[must_use]
    pub fn transform<F, Fut>(self, transform: F) -> Self
    where
        F: Fn(crate::Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply>> + Send + 'static,
    {
        self.response(Transform::new(transform))
    }

    /// Configured method, if any.
    pub const fn get_method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Configured value of a header, looked up case-insensitively.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Iterate over configured headers (lowercased names).
    pub fn get_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Configured credentials policy.
    pub const fn get_credentials(&self) -> Option<Credentials> {
        self.credentials
    }

    /// Configured base URL.
    pub fn get_base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Configured query parameters.
    pub const fn get_search_params(&self) -> Option<&SearchParams> {
        self.search_params.as_ref()
    }

    /// Configured body.
    pub const fn get_body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Shallow merge: every option set in `other` wins, except headers,
    /// which are merged name by name.
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        let mut headers = self.headers.clone();
        headers.extend(
            other
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );

        Self {
            method: other.method.clone().or_else(|| self.method.clone()),
            headers,
            credentials: other.credentials.or(self.credentials),
            base_url: other.base_url.clone().or_else(|| self.base_url.clone()),
            search_params: other
                .search_params
                .clone()
                .or_else(|| self.search_params.clone()),
            body: other.body.clone().or_else(|| self.body.clone()),
            response: other.response.clone().or_else(|| self.response.clone()),
        }
    }

    /// Resolve the configured response handling, rejecting unknown names.
    pub(crate) fn response_mode(&self) -> Result<ResponseMode> {
        match &self.response {
            None => Ok(ResponseMode::NoParse),
            Some(ResponseSetting::Mode(mode)) => Ok(mode.clone()),
            // An empty name asks for no parsing, like an absent one.
            Some(ResponseSetting::Named(name)) if name.is_empty() => Ok(ResponseMode::NoParse),
            Some(ResponseSetting::Named(name)) => name
                .parse::<Representation>()
                .map(ResponseMode::Representation),
        }
    }

    /// Build a fresh header collection for one call.
    pub(crate) fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| Error::InvalidHeader(name.clone()))?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }

    pub(crate) fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }
}

impl From<&str> for Options {
    fn from(response_type: &str) -> Self {
        Self::new().response_type(response_type)
    }
}

impl From<String> for Options {
    fn from(response_type: String) -> Self {
        Self::new().response_type(response_type)
    }
}

impl From<Representation> for Options {
    fn from(representation: Representation) -> Self {
        Self::new().response(representation)
    }
}

impl From<ResponseMode> for Options {
    fn from(mode: ResponseMode) -> Self {
        Self::new().response(mode)
    }
}

impl From<()> for Options {
    fn from((): ()) -> Self {
        Self::new()
    }
}
