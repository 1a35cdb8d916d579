use anyhow::anyhow;
use reqwest::StatusCode;

/// Error payload returned by ERDDAP, e.g.
///
/// ```text
/// Error {
///     code=404;
///     message="Not Found: Your query produced no matching results. (nRows = 0)";
/// }
/// ```
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ErddapErrorResponse {
    pub(crate) code: Option<u16>,
    pub(crate) message: Option<String>,
}

impl ErddapErrorResponse {
    pub(crate) fn parse(body: &str) -> Option<Self> {
        let body = body.trim();
        if !body.starts_with("Error") {
            return None;
        }

        let mut out = Self::default();
        for raw in body.lines() {
            let line = raw.trim().trim_end_matches(';');
            if let Some(code) = line.strip_prefix("code=") {
                out.code = code.trim().parse().ok();
            } else if let Some(message) = line.strip_prefix("message=") {
                let message = message.trim();
                let message = message
                    .strip_prefix('"')
                    .and_then(|m| m.strip_suffix('"'))
                    .unwrap_or(message);
                out.message = Some(message.replace("\\\"", "\""));
            }
        }

        if out.code.is_none() && out.message.is_none() {
            None
        } else {
            Some(out)
        }
    }
}

pub(crate) fn format_erddap_error(status: StatusCode, url: &str, body: &str) -> anyhow::Error {
    let parsed = ErddapErrorResponse::parse(body);
    let message = parsed
        .as_ref()
        .and_then(|e| e.message.as_deref())
        .unwrap_or_else(|| body.trim());
    let status_in_body = parsed
        .as_ref()
        .and_then(|e| e.code)
        .unwrap_or(status.as_u16());

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return anyhow!(
            "ERDDAP authentication/authorization failed (HTTP {}).\n- Check the username/password given to the connection (or ERDDAP_USERNAME / ERDDAP_PASSWORD)\n- Some datasets are private and need an account on that server\n\nServer message: {}\nrequest: {}",
            status_in_body,
            message,
            url
        );
    }

    if status == StatusCode::NOT_FOUND {
        // ERDDAP also answers 404 for valid queries that match no rows.
        if message.contains("no matching results") {
            return anyhow!(
                "ERDDAP query matched no rows (HTTP 404).\n- Relax the constraints or check the variable names\n\nServer message: {}\nrequest: {}",
                message,
                url
            );
        }
        return anyhow!(
            "ERDDAP resource not found (HTTP 404).\n- Check the server URL and the dataset id\n\nServer message: {}\nrequest: {}",
            message,
            url
        );
    }

    anyhow!(
        "ERDDAP request failed: HTTP {} for url ({})\n{}",
        status_in_body,
        url,
        message
    )
}
