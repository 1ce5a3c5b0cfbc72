use crate::model::UploadedFile;
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;

/// Most requests have at most 16 headers or cookies.
pub const MAX_INLINE_HEADERS: usize = 16;
/// Most routes have at most 8 path parameters.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Header and cookie storage. Names are `Arc<str>` so repeated names share
/// one allocation.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;
/// Matched path parameters.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// One part of a `multipart/form-data` body, already split out by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl MultipartPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        MultipartPart {
            name: name.into(),
            filename: None,
            content_type: None,
            data: value.into().into_bytes(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<&str>,
        data: Vec<u8>,
    ) -> Self {
        MultipartPart {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: content_type.map(str::to_string),
            data,
        }
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    pub fn to_uploaded_file(&self) -> UploadedFile {
        UploadedFile::new(
            self.filename.clone().unwrap_or_default(),
            self.content_type.clone(),
            self.data.clone(),
        )
    }
}

/// Transport-neutral view of one request, as handed over by the server that
/// matched the route.
#[derive(Debug, Clone)]
pub struct BindRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderVec,
    pub cookies: HeaderVec,
    /// Raw query string without the leading `?`.
    pub query: String,
    pub path_params: ParamVec,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub parts: Vec<MultipartPart>,
}

impl BindRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let (path, query) = match path.split_once('?') {
            Some((p, q)) => (p.to_string(), q.to_string()),
            None => (path, String::new()),
        };
        BindRequest {
            method,
            path,
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            query,
            path_params: ParamVec::new(),
            body: Vec::new(),
            content_type: None,
            parts: Vec::new(),
        }
    }

    /// Adapt an `http::Request`. `path_params` come from whatever router
    /// matched the request.
    pub fn from_http(request: &http::Request<Vec<u8>>, path_params: ParamVec) -> Self {
        let mut bind = BindRequest::new(request.method().clone(), request.uri().path());
        bind.query = request.uri().query().unwrap_or_default().to_string();
        for (name, value) in request.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).to_string();
            bind = bind.header(name.as_str(), value);
        }
        bind.path_params = path_params;
        bind.body = request.body().clone();
        bind
    }

    /// Add a header. `Cookie` headers also populate the cookie list and
    /// `Content-Type` sets the body content type.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        let lower = name.to_ascii_lowercase();
        if lower == "cookie" {
            self.cookies.extend(parse_cookies(&value));
        } else if lower == "content-type" {
            self.content_type = Some(value.clone());
        }
        self.headers.push((Arc::from(lower.as_str()), value));
        self
    }

    #[must_use]
    pub fn cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn path_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.path_params.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn json_body(mut self, body: &serde_json::Value) -> Self {
        self.body = body.to_string().into_bytes();
        self.content_type = Some("application/json".to_string());
        self
    }

    #[must_use]
    pub fn body(mut self, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self.content_type = Some(content_type.to_string());
        self
    }

    #[must_use]
    pub fn part(mut self, part: MultipartPart) -> Self {
        if self.content_type.is_none() {
            self.content_type = Some("multipart/form-data".to_string());
        }
        self.parts.push(part);
        self
    }

    /// All values of a header, case-insensitively, in arrival order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Path parameters use "last write wins" when a name repeats.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Decoded query pairs in order, repeated keys kept.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .into_owned()
            .collect()
    }

    /// Lower-cased media type without parameters (`application/json`).
    pub fn media_type(&self) -> Option<String> {
        self.content_type.as_deref().map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
    }
}

/// Split a `Cookie` header into name/value pairs.
pub fn parse_cookies(header: &str) -> HeaderVec {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().to_string();
            Some((Arc::from(name), value))
        })
        .collect()
}
