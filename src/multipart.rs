//! Form data: `multipart/form-data` encoding and decoding.

use std::{
    borrow::Cow,
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::Bytes;

use crate::error::BodyError;

/// A single form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    name: Cow<'static, str>,
    filename: Option<Cow<'static, str>>,
    content_type: Option<Cow<'static, str>>,
    data: Bytes,
}

impl FormPart {
    /// Create a field with raw bytes.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            data: data.into(),
        }
    }

    /// Create a text field using UTF-8 content.
    #[must_use]
    pub fn text(name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self::new(name, value.into().into_bytes())
    }

    /// Create a file field with filename and content type metadata.
    #[must_use]
    pub fn file(
        name: impl Into<Cow<'static, str>>,
        filename: impl Into<Cow<'static, str>>,
        content_type: impl Into<Cow<'static, str>>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        }
    }

    /// Attach/override the filename metadata.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<Cow<'static, str>>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Attach/override the content type metadata.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<Cow<'static, str>>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filename, for file fields.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Content type, for file fields.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Raw field contents.
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Field contents as text, if valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// Ordered collection of form fields.
///
/// Sent as `multipart/form-data`; the fetch layer picks the boundary and the
/// `content-type` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    boundary: Option<String>,
    parts: Vec<FormPart>,
}

impl FormData {
    /// Create an empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the boundary string (otherwise auto-generated).
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Add a part (builder-style).
    #[must_use]
    pub fn with_part(mut self, part: FormPart) -> Self {
        self.parts.push(part);
        self
    }

    /// Add a text field (builder-style).
    #[must_use]
    pub fn with_text(self, name: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        self.with_part(FormPart::text(name, value))
    }

    /// Append a part.
    pub fn append(&mut self, part: FormPart) {
        self.parts.push(part);
    }

    /// First part with the given name.
    pub fn get(&self, name: &str) -> Option<&FormPart> {
        self.parts.iter().find(|part| part.name() == name)
    }

    /// All parts with the given name, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FormPart> + 'a {
        self.parts.iter().filter(move |part| part.name() == name)
    }

    /// Iterate over all parts.
    pub fn iter(&self) -> impl Iterator<Item = &FormPart> {
        self.parts.iter()
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the form has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Encode the form into `(boundary, body_bytes)`.
    #[must_use]
    pub fn encode(&self) -> (String, Vec<u8>) {
        let boundary = self.boundary.clone().unwrap_or_else(default_boundary);
        let mut body = Vec::new();

        for part in &self.parts {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"{}\r\n",
                    escape_quoted(part.name()),
                    part.filename()
                        .map(|name| format!("; filename=\"{}\"", escape_quoted(name)))
                        .unwrap_or_default()
                )
                .as_bytes(),
            );
            if let Some(content_type) = part.content_type() {
                body.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
            }
            body.extend_from_slice(b"\r\n");
            body.extend_from_slice(part.data());
            body.extend_from_slice(b"\r\n");
        }

        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        (boundary, body)
    }

    /// Decode a response body according to its content type.
    ///
    /// # Errors
    ///
    /// Fails for content types other than `multipart/form-data` and
    /// `application/x-www-form-urlencoded`, or malformed payloads.
    pub fn decode(content_type: Option<&str>, body: &[u8]) -> Result<Self, BodyError> {
        let content_type = content_type.unwrap_or_default();
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "multipart/form-data" => {
                let boundary = header_param(content_type, "boundary").ok_or_else(|| {
                    BodyError::Form("multipart body without boundary".to_owned())
                })?;
                decode_multipart(&boundary, body)
            }
            "application/x-www-form-urlencoded" => Ok(url::form_urlencoded::parse(body)
                .map(|(name, value)| FormPart::text(name.into_owned(), value))
                .collect()),
            _ => Err(BodyError::Form(format!(
                "cannot decode form data from content type {content_type:?}"
            ))),
        }
    }
}

impl FromIterator<FormPart> for FormData {
    fn from_iter<I: IntoIterator<Item = FormPart>>(iter: I) -> Self {
        Self {
            boundary: None,
            parts: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FormData {
    type Item = &'a FormPart;
    type IntoIter = std::slice::Iter<'a, FormPart>;

    fn into_iter(self) -> Self::IntoIter {
        self.parts.iter()
    }
}

fn decode_multipart(boundary: &str, body: &[u8]) -> Result<FormData, BodyError> {
    let delimiter = format!("--{boundary}");
    let mut sections = split_bytes(body, delimiter.as_bytes());
    // Preamble before the first delimiter is ignored.
    sections.next();

    let mut form = FormData::new();
    let mut closed = false;
    for section in sections {
        if section.starts_with(b"--") {
            closed = true;
            break;
        }
        let section = section.strip_prefix(b"\r\n").unwrap_or(section);
        let section = section.strip_suffix(b"\r\n").unwrap_or(section);
        let split = find(section, b"\r\n\r\n")
            .ok_or_else(|| BodyError::Form("multipart part without header block".to_owned()))?;
        let (head, data) = (&section[..split], &section[split + 4..]);
        form.append(decode_part(head, data)?);
    }

    if !closed {
        return Err(BodyError::Form("unterminated multipart body".to_owned()));
    }
    Ok(form)
}

fn decode_part(head: &[u8], data: &[u8]) -> Result<FormPart, BodyError> {
    let head = std::str::from_utf8(head)
        .map_err(|_| BodyError::Form("multipart headers are not UTF-8".to_owned()))?;

    let mut name = None;
    let mut filename = None;
    let mut content_type = None;
    for line in head.split("\r\n") {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if key.trim().eq_ignore_ascii_case("content-disposition") {
            name = header_param(value, "name");
            filename = header_param(value, "filename");
        } else if key.trim().eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_owned());
        }
    }

    let name = name.ok_or_else(|| BodyError::Form("multipart part without name".to_owned()))?;
    let mut part = FormPart::new(name, Bytes::copy_from_slice(data));
    if let Some(filename) = filename {
        part = part.with_filename(filename);
    }
    if let Some(content_type) = content_type {
        part = part.with_content_type(content_type);
    }
    Ok(part)
}

/// Percent-escape the characters that would break a quoted
/// `Content-Disposition` parameter, the way browsers encode field names.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Extract a `key=value` parameter from a header value like
/// `form-data; name="field"`. Semicolons inside quoted values do not
/// separate parameters.
fn header_param(value: &str, key: &str) -> Option<String> {
    split_params(value).into_iter().skip(1).find_map(|param| {
        let (name, raw) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case(key) {
            return None;
        }
        Some(unquote(raw.trim()))
    })
}

fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (index, ch) in value.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&value[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

fn unquote(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|raw| raw.strip_suffix('"')) else {
        return raw.to_owned();
    };
    let mut text = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        match (ch, chars.clone().next()) {
            ('\\', Some(next @ ('"' | '\\'))) => {
                text.push(next);
                chars.next();
            }
            _ => text.push(ch),
        }
    }
    text
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn split_bytes<'a>(mut haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = &'a [u8]> {
    let mut done = false;
    std::iter::from_fn(move || {
        if done {
            return None;
        }
        if let Some(pos) = find(haystack, needle) {
            let (head, tail) = haystack.split_at(pos);
            haystack = &tail[needle.len()..];
            Some(head)
        } else {
            done = true;
            Some(haystack)
        }
    })
}

fn default_boundary() -> String {
    format!("rek-{:#x}", monotonic_suffix())
}

fn monotonic_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or_else(|_| 0, |duration| duration.as_micros())
}
