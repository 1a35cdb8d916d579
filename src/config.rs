use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

use crate::connection::Auth;

/// Resolved connection settings.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionConfig {
    /// ERDDAP server URL, e.g. `https://gliders.ioos.us/erddap`.
    pub(crate) server: String,
    /// Optional basic-auth credentials.
    pub(crate) auth: Option<Auth>,
    /// Whether to verify TLS certificates.
    pub(crate) verify: bool,
}

#[derive(Debug, Default)]
struct RcConfig {
    server: Option<String>,
    username: Option<String>,
    password: Option<String>,
    verify: Option<bool>,
}

pub(crate) fn load_config(
    server: Option<String>,
    auth: Option<Auth>,
    verify: Option<bool>,
) -> Result<ConnectionConfig> {
    let mut server = server.or_else(|| std::env::var("ERDDAP_SERVER").ok());
    let mut username = auth
        .as_ref()
        .map(|a| a.username.clone())
        .or_else(|| std::env::var("ERDDAP_USERNAME").ok());
    let mut password = auth
        .as_ref()
        .map(|a| a.password.clone())
        .or_else(|| std::env::var("ERDDAP_PASSWORD").ok());

    let rc_candidates = rc_candidates();
    let mut file_verify: Option<bool> = None;

    if server.is_none() || username.is_none() || password.is_none() || verify.is_none() {
        for rc_path in &rc_candidates {
            if rc_path.exists() {
                let cfg = read_rc(rc_path).with_context(|| {
                    format!("failed to read configuration file {}", rc_path.display())
                })?;

                if server.is_none() {
                    server = cfg.server;
                }
                if username.is_none() {
                    username = cfg.username;
                }
                if password.is_none() {
                    password = cfg.password;
                }
                file_verify = cfg.verify;
                break;
            }
        }
    }

    let server = match server {
        Some(v) => v,
        None => {
            if !rc_candidates.is_empty() {
                bail!(
                    "Missing configuration: server (set ERDDAP_SERVER or put `server:` in one of: {})",
                    rc_candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            bail!("Missing configuration: server (set ERDDAP_SERVER or create .erddaprc)");
        }
    };

    let auth = match (username, password) {
        (Some(username), Some(password)) => Some(Auth { username, password }),
        (None, None) => None,
        (Some(_), None) => bail!("Missing configuration: password for the configured username"),
        (None, Some(_)) => bail!("Missing configuration: username for the configured password"),
    };

    let verify = verify.or(file_verify).unwrap_or(true);

    Ok(ConnectionConfig {
        server,
        auth,
        verify,
    })
}

fn read_rc(path: &Path) -> Result<RcConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_rc(&text))
}

fn parse_rc(text: &str) -> RcConfig {
    let mut cfg = RcConfig::default();

    // Support formatting where `password:` is on one line and the value is on the next line.
    let mut pending_key: Option<&str> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pk) = pending_key.take() {
            // Continuation value line. A URL contains a colon, so only `key: value`
            // shaped lines end the continuation.
            if !looks_like_entry(line) {
                cfg.set(pk, strip_quotes(line));
                continue;
            }
        }

        if let Some((k, v)) = line.split_once(':') {
            let k = k.trim();
            let v = strip_quotes(v.trim());
            match k {
                "server" | "username" | "password" => {
                    if !v.is_empty() {
                        cfg.set(k, v);
                    } else {
                        pending_key = Some(k);
                    }
                }
                "verify" => {
                    if !v.is_empty() {
                        cfg.verify = Some(v != "0");
                    }
                }
                _ => {}
            }
        }
    }

    cfg
}

impl RcConfig {
    fn set(&mut self, key: &str, value: &str) {
        match key {
            "server" => self.server = Some(value.to_string()),
            "username" => self.username = Some(value.to_string()),
            "password" => self.password = Some(value.to_string()),
            _ => {}
        }
    }
}

fn looks_like_entry(line: &str) -> bool {
    line.split_once(':').is_some_and(|(k, _)| {
        matches!(k.trim(), "server" | "username" | "password" | "verify")
    })
}

fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if (s.starts_with('"') && s.ends_with('"') && s.len() >= 2)
        || (s.starts_with('\'') && s.ends_with('\'') && s.len() >= 2)
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

fn rc_candidates() -> Vec<PathBuf> {
    // Search order:
    // 1) ERDDAP_RC (explicit)
    // 2) ./.erddaprc
    // 3) ~/.erddaprc
    if let Ok(p) = std::env::var("ERDDAP_RC") {
        return vec![PathBuf::from(p)];
    }

    let mut v = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        v.push(cwd.join(".erddaprc"));
    }
    if let Some(home) = dirs::home_dir() {
        v.push(home.join(".erddaprc"));
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rc_entries() {
        let cfg = parse_rc(
            "# private server\nserver: https://erddap.example.org/erddap/\nusername: 'alice'\npassword: \"s3cret\"\nverify: 0\n",
        );
        assert_eq!(
            cfg.server.as_deref(),
            Some("https://erddap.example.org/erddap/")
        );
        assert_eq!(cfg.username.as_deref(), Some("alice"));
        assert_eq!(cfg.password.as_deref(), Some("s3cret"));
        assert_eq!(cfg.verify, Some(false));
    }

    #[test]
    fn parses_value_on_next_line() {
        let cfg = parse_rc("server:\n  https://x.org/erddap\npassword:\n  abc:def\nverify: 1\n");
        assert_eq!(cfg.server.as_deref(), Some("https://x.org/erddap"));
        assert_eq!(cfg.password.as_deref(), Some("abc:def"));
        assert_eq!(cfg.verify, Some(true));
    }

    #[test]
    fn empty_continuation_is_dropped() {
        let cfg = parse_rc("username:\nserver: https://x.org/erddap\n");
        assert_eq!(cfg.username, None);
        assert_eq!(cfg.server.as_deref(), Some("https://x.org/erddap"));
    }

    #[test]
    fn explicit_arguments_win() {
        let cfg = load_config(
            Some("https://explicit.org/erddap".to_string()),
            Some(Auth::new("bob", "pw")),
            Some(false),
        )
        .unwrap();
        assert_eq!(cfg.server, "https://explicit.org/erddap");
        assert_eq!(cfg.auth, Some(Auth::new("bob", "pw")));
        assert!(!cfg.verify);
    }
}
