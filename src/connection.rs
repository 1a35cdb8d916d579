use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

use crate::config::load_config;
use crate::servers;
use crate::transport::{HttpTransport, RequestOptions, Transport};
use crate::util::{guess_filename_from_url, urljoin};

/// Basic-auth credentials for servers that need them.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub username: String,
    pub password: String,
}

impl Auth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Anything that names an ERDDAP server: a URL string or another [`Connection`].
pub trait ServerLike {
    fn as_server(&self) -> &str;
}

impl ServerLike for str {
    fn as_server(&self) -> &str {
        self
    }
}

impl ServerLike for String {
    fn as_server(&self) -> &str {
        self
    }
}

impl ServerLike for Connection {
    fn as_server(&self) -> &str {
        &self.server
    }
}

impl<T: ServerLike + ?Sized> ServerLike for &T {
    fn as_server(&self) -> &str {
        (**self).as_server()
    }
}

impl From<&str> for Connection {
    fn from(server: &str) -> Self {
        Connection::new(server)
    }
}

impl From<String> for Connection {
    fn from(server: String) -> Self {
        Connection::new(server)
    }
}

/// Copies the connection, auth and transport included.
impl From<&Connection> for Connection {
    fn from(conn: &Connection) -> Self {
        conn.clone()
    }
}

/// Connection to one ERDDAP server.
///
/// Most servers are reachable through a bare URL; some require authentication.
/// Requests go through a [`Transport`], `reqwest` by default.
#[derive(Debug, Clone)]
pub struct Connection {
    server: String,
    auth: Option<Auth>,
    transport: Option<Arc<dyn Transport>>,
    progress: bool,
}

static DEFAULT_TRANSPORT: OnceLock<Arc<dyn Transport>> = OnceLock::new();

fn default_transport() -> Result<Arc<dyn Transport>> {
    if let Some(t) = DEFAULT_TRANSPORT.get() {
        return Ok(t.clone());
    }
    let t: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(true, HttpTransport::DEFAULT_TIMEOUT)?);
    Ok(DEFAULT_TRANSPORT.get_or_init(|| t).clone())
}

impl Connection {
    pub fn new(server: impl ServerLike) -> Self {
        Self {
            server: Self::canonical_server(server),
            auth: None,
            transport: None,
            progress: false,
        }
    }

    /// Like [`Connection::new`], but also accepts builtin short names such as `NGDAC`.
    pub fn for_server(name_or_url: &str) -> Self {
        match servers::lookup(name_or_url) {
            Some(s) => Self::new(s.url),
            None => Self::new(name_or_url),
        }
    }

    /// Creates a connection using environment variables and/or `.erddaprc`.
    ///
    /// This is equivalent to `Connection::from_config(None, None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::from_config(None, None, None)
    }

    /// Creates a connection using (in order of precedence):
    /// - explicit arguments
    /// - environment variables `ERDDAP_SERVER` / `ERDDAP_USERNAME` / `ERDDAP_PASSWORD`
    /// - config file from `ERDDAP_RC` or `.erddaprc`
    pub fn from_config(
        server: Option<String>,
        auth: Option<Auth>,
        verify: Option<bool>,
    ) -> Result<Self> {
        let cfg = load_config(server, auth, verify)?;
        let transport = HttpTransport::new(cfg.verify, HttpTransport::DEFAULT_TIMEOUT)?;

        let mut conn = Self::for_server(&cfg.server).with_transport(Arc::new(transport));
        conn.auth = cfg.auth;
        Ok(conn)
    }

    /// Returns the canonical form of a server identifier: trailing slashes stripped.
    pub fn canonical_server(value: impl ServerLike) -> String {
        value.as_server().trim_end_matches('/').to_string()
    }

    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Shows a progress bar on stderr during [`Connection::download`].
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn set_server(&mut self, value: impl ServerLike) {
        self.server = Self::canonical_server(value);
    }

    pub fn auth(&self) -> Option<&Auth> {
        self.auth.as_ref()
    }

    pub fn set_auth(&mut self, auth: Option<Auth>) {
        self.auth = auth;
    }

    /// Full URL for `path`; absolute URLs are returned unchanged.
    pub fn url(&self, path: &str) -> String {
        urljoin(&self.server, path)
    }

    fn transport(&self) -> Result<Arc<dyn Transport>> {
        match &self.transport {
            Some(t) => Ok(t.clone()),
            None => default_transport(),
        }
    }

    /// Requests `path` from the server and returns the raw body.
    pub fn get(&self, path: &str, options: &RequestOptions) -> Result<Vec<u8>> {
        let url = self.url(path);
        let body = self.transport()?.get(&url, self.auth.as_ref(), options)?;
        debug!(url = %url, bytes = body.len(), "fetched");
        Ok(body)
    }

    /// Like [`Connection::get`], decoding the body as UTF-8 (lossily).
    pub fn get_text(&self, path: &str, options: &RequestOptions) -> Result<String> {
        let body = self.get(path, options)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    /// Runs `f` with the path of a fresh temporary file.
    ///
    /// The file is closed and removed when `f` returns, fails or panics. Nothing is
    /// written to it here: callers fill it, e.g. with [`Connection::download`].
    pub fn open<T, F>(&self, path: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let tmp = tempfile::Builder::new()
            .prefix("erddap_")
            .suffix(".tmp")
            .tempfile()
            .context("failed to create temporary file")?;
        debug!(url = %self.url(path), tmp = %tmp.path().display(), "opened scratch file");
        f(tmp.path())
    }

    /// Streams `path` into `target` and returns the written file's path.
    ///
    /// An empty `target` is replaced by the file name found in the URL. When the
    /// transfer fails or comes up short, `target` is left untouched.
    pub fn download(&self, path: &str, target: &Path) -> Result<PathBuf> {
        let url = self.url(path);
        let target = if target.as_os_str().is_empty() {
            guess_filename_from_url(&url)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("download"))
        } else {
            target.to_path_buf()
        };

        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
                parent.to_path_buf()
            }
            _ => PathBuf::from("."),
        };

        let mut body = self
            .transport()?
            .open(&url, self.auth.as_ref(), &RequestOptions::default())?;

        let pb = if self.progress {
            let pb = match body.content_length {
                Some(len) => ProgressBar::new(len),
                None => ProgressBar::new_spinner(),
            };
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
            );
            Some(pb)
        } else {
            None
        };

        // Written next to the target and renamed into place only once complete.
        let mut out = tempfile::Builder::new()
            .prefix(".erddap_")
            .suffix(".part")
            .tempfile_in(&dir)
            .with_context(|| format!("failed to create a temporary file in {}", dir.display()))?;

        let mut downloaded: u64 = 0;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = body
                .reader
                .read(&mut buf)
                .with_context(|| format!("download interrupted ({})", url))?;
            if n == 0 {
                break;
            }
            out.write_all(&buf[..n])?;
            downloaded += n as u64;
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }
        out.flush()?;

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }

        if let Some(expected) = body.content_length {
            if downloaded < expected {
                bail!(
                    "download failed: downloaded {} byte(s) out of {}",
                    downloaded,
                    expected
                );
            }
        }

        out.persist(&target)
            .map_err(|e| e.error)
            .with_context(|| format!("failed to write {}", target.display()))?;

        info!(url = %url, target = %target.display(), bytes = downloaded, "downloaded");
        Ok(target)
    }
}
