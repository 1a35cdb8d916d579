use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::fmt;
use std::io::{Cursor, Read};
use std::time::Duration;
use tracing::debug;

use crate::connection::Auth;
use crate::error::format_erddap_error;

const MAX_PREALLOC: u64 = 8 << 20;

/// Per-request options passed through to the transport.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the transport's default timeout.
    pub timeout: Option<Duration>,
    /// Extra query parameters appended to the URL.
    pub query: Vec<(String, String)>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A response body being read from the server.
pub struct Body {
    /// Expected length in bytes, when the server announced it.
    pub content_length: Option<u64>,
    pub reader: Box<dyn Read + Send>,
}

impl Body {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        Self {
            content_length: Some(bytes.len() as u64),
            reader: Box::new(Cursor::new(bytes)),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Blocking HTTP GET used by connections.
///
/// Failures are returned as is: there is no retry at this layer.
pub trait Transport: fmt::Debug + Send + Sync {
    /// Starts a GET request and returns the body as a stream.
    fn open(&self, url: &str, auth: Option<&Auth>, options: &RequestOptions) -> Result<Body>;

    /// Performs a GET request and returns the whole body.
    fn get(&self, url: &str, auth: Option<&Auth>, options: &RequestOptions) -> Result<Vec<u8>> {
        let mut body = self.open(url, auth, options)?;
        // Content-Length is only a hint; never reserve more than 8 MiB up front.
        let hint = body.content_length.unwrap_or(0).min(MAX_PREALLOC);
        let mut out = Vec::with_capacity(hint as usize);
        body.reader
            .read_to_end(&mut out)
            .with_context(|| format!("failed to read response body from {}", url))?;
        Ok(out)
    }
}

/// [`Transport`] backed by `reqwest::blocking`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(verify: bool, timeout: Duration) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("erddap-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("erddap-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(timeout);

        if !verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str, auth: Option<&Auth>, options: &RequestOptions) -> Result<Body> {
        let mut req = self.http.get(url);
        if let Some(auth) = auth {
            req = req.basic_auth(&auth.username, Some(&auth.password));
        }
        if let Some(timeout) = options.timeout {
            req = req.timeout(timeout);
        }
        if !options.query.is_empty() {
            req = req.query(&options.query);
        }
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name {:?}", name))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {}", name))?;
            req = req.header(name, value);
        }

        debug!(url, "GET");
        let resp = req
            .send()
            .with_context(|| format!("request to {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().unwrap_or_default();
            return Err(format_erddap_error(status, url, &text));
        }

        Ok(Body {
            content_length: resp.content_length(),
            reader: Box::new(resp),
        })
    }
}
