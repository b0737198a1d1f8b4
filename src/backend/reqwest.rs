use futures_util::{TryStreamExt, future::BoxFuture};
use http::{HeaderMap, HeaderValue, header};

use crate::{Body, Fetch, Request, Response, error::BoxError};

/// Fetch primitive backed by [`reqwest`] with rustls.
///
/// The credentials policy of a request is not enforced: the underlying
/// client keeps no cookie store, so only explicitly set headers are sent.
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Create a fetch primitive with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured client (proxies, timeouts, redirect policy, ...).
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetch for ReqwestFetch {
    fn fetch(&self, request: Request) -> BoxFuture<'static, Result<Response, BoxError>> {
        let client = self.client.clone();
        Box::pin(async move { send(&client, request).await })
    }
}

async fn send(client: &reqwest::Client, request: Request) -> Result<Response, BoxError> {
    let Request {
        url,
        method,
        mut headers,
        body,
        credentials: _,
    } = request;

    let payload = body.map(|body| encode_body(body, &mut headers)).transpose()?;

    let mut builder = client.request(method, url.as_str()).headers(headers);
    if let Some(payload) = payload {
        builder = builder.body(payload);
    }

    let response = builder.send().await?;
    let status = response.status();
    let url = response.url().to_string();
    let headers = response.headers().clone();
    let stream = response
        .bytes_stream()
        .map_err(|err| Box::new(err) as BoxError);

    Ok(Response::new(status)
        .with_url(url)
        .with_headers(headers)
        .with_stream(stream))
}

/// Turn a prepared body into bytes on the wire, filling in the content type
/// the fetch layer is responsible for.
fn encode_body(body: Body, headers: &mut HeaderMap) -> Result<reqwest::Body, BoxError> {
    Ok(match body {
        Body::Text(text) => text.into(),
        Body::Bytes(bytes) => bytes.into(),
        Body::Blob(blob) => {
            if let Some(content_type) = blob.content_type() {
                default_content_type(headers, HeaderValue::from_str(content_type)?);
            }
            blob.into_bytes().into()
        }
        Body::SearchParams(params) => {
            default_content_type(
                headers,
                HeaderValue::from_static("application/x-www-form-urlencoded;charset=UTF-8"),
            );
            params.to_string().into()
        }
        Body::Form(form) => {
            let (boundary, bytes) = form.encode();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}"))?,
            );
            bytes.into()
        }
        Body::Json(value) => {
            default_content_type(headers, HeaderValue::from_static("application/json"));
            serde_json::to_vec(&value)?.into()
        }
    })
}

fn default_content_type(headers: &mut HeaderMap, value: HeaderValue) {
    if !headers.contains_key(header::CONTENT_TYPE) {
        headers.insert(header::CONTENT_TYPE, value);
    }
}
