//! Builders for ERDDAP request URLs and the inverse URL parser.

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use reqwest::Url;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::protocol::Protocol;
use crate::util::quote_plus;

/// Constraint key (`time>=`, or `>=time`) to bound.
///
/// String values are quoted in the URL, numbers are not.
pub type Constraints = BTreeMap<String, Value>;

/// Server-side expressions such as `time>` = `now-7days`, appended verbatim.
pub type RelativeConstraints = BTreeMap<String, String>;

const OPERATORS: [&str; 7] = ["=~", "!=", ">=", "<=", ">", "<", "="];

/// Inputs of [`download_url`].
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    pub server: &'a str,
    pub dataset_id: &'a str,
    pub protocol: Protocol,
    pub variables: Option<&'a [String]>,
    pub constraints: Option<&'a Constraints>,
    pub relative_constraints: Option<&'a RelativeConstraints>,
    /// File type, e.g. `csv`, `nc`, `htmlTable`, or `opendap`.
    pub response: &'a str,
    /// Appends `&distinct()` so the server drops duplicate rows.
    pub distinct: bool,
}

impl<'a> DownloadRequest<'a> {
    pub fn new(server: &'a str, dataset_id: &'a str, protocol: Protocol, response: &'a str) -> Self {
        Self {
            server,
            dataset_id,
            protocol,
            variables: None,
            constraints: None,
            relative_constraints: None,
            response,
            distinct: false,
        }
    }
}

/// Builds `<server>/<protocol>/<dataset_id>.<response>?<variables><constraints>`.
///
/// The result ends with `?` when neither variables nor constraints are given.
pub fn download_url(req: &DownloadRequest<'_>) -> Result<String> {
    if req.dataset_id.is_empty() {
        bail!("Please specify a valid `dataset_id`, got an empty string");
    }
    let segment = req.protocol.segment().ok_or_else(|| {
        anyhow!(
            "Please specify a valid `protocol` (tabledap or griddap) for dataset {}",
            req.dataset_id
        )
    })?;

    let server = req.server.trim_end_matches('/');

    // OPeNDAP is only served unconstrained.
    if req.response == "opendap" {
        return Ok(format!("{}/{}/{}", server, segment, req.dataset_id));
    }

    let mut url = format!("{}/{}/{}.{}?", server, segment, req.dataset_id, req.response);

    if let Some(variables) = req.variables {
        url.push_str(&variables.join(","));
    }

    if let Some(constraints) = req.constraints {
        for (key, value) in constraints {
            url.push_str(&format_constraint(key, value)?);
        }
    }

    if let Some(relative) = req.relative_constraints {
        for (key, value) in relative {
            url.push('&');
            url.push_str(key);
            url.push_str(value);
        }
    }

    if req.distinct {
        url.push_str("&distinct()");
    }

    Ok(url)
}

/// Splits `>=time` or `time>=` into `("time", ">=")`.
fn split_constraint_key(key: &str) -> (&str, &str) {
    for op in OPERATORS {
        if let Some(variable) = key.strip_prefix(op) {
            return (variable, op);
        }
    }
    for op in OPERATORS {
        if let Some(variable) = key.strip_suffix(op) {
            return (variable, op);
        }
    }
    (key, "")
}

fn format_constraint(key: &str, value: &Value) -> Result<String> {
    let (variable, op) = split_constraint_key(key);
    let rendered = match value {
        Value::String(s) if variable.starts_with("time") => match parse_dates(s) {
            Ok(seconds) => seconds.to_string(),
            Err(_) => format!("\"{}\"", s),
        },
        Value::String(s) => format!("\"{}\"", s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NaN".to_string(),
        Value::Array(_) | Value::Object(_) => {
            bail!("constraint {} must be a string or a number, got {}", key, value)
        }
    };
    Ok(format!("&{}{}{}", variable, op, rendered))
}

/// Seconds since 1970-01-01T00:00:00Z for an ISO-like date string.
///
/// Strings without an offset are read as UTC.
pub fn parse_dates(date_time: &str) -> Result<f64> {
    let s = date_time.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp_millis() as f64 / 1000.0);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.timestamp_millis() as f64 / 1000.0);
        }
    }
    let naive = s.trim_end_matches('Z');
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y/%m/%d %H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt.and_utc().timestamp_millis() as f64 / 1000.0);
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(naive, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc().timestamp_millis() as f64 / 1000.0);
            }
        }
    }

    bail!("could not parse date {:?}", date_time)
}

/// `<server>/info/<dataset_id>/index.<response>`.
pub fn info_url(server: &str, dataset_id: &str, response: &str) -> Result<String> {
    if dataset_id.is_empty() {
        bail!("You must specify a valid dataset_id, got an empty string");
    }
    Ok(format!(
        "{}/info/{}/index.{}",
        server.trim_end_matches('/'),
        dataset_id,
        response
    ))
}

/// `<server>/categorize/<by>[/<value>]/index.<response>`.
pub fn categorize_url(server: &str, categorize_by: &str, value: Option<&str>, response: &str) -> String {
    let server = server.trim_end_matches('/');
    match value {
        Some(value) => format!(
            "{}/categorize/{}/{}/index.{}",
            server, categorize_by, value, response
        ),
        None => format!("{}/categorize/{}/index.{}", server, categorize_by, response),
    }
}

/// Advanced-search parameters. Unset fields are sent as `(ANY)`.
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// "Google-like" full text search; quote phrases, prefix `-` to exclude.
    pub search_for: Option<String>,
    pub response: String,
    pub protocol: Option<Protocol>,
    pub items_per_page: u32,
    pub page: u32,
    pub cdm_data_type: Option<String>,
    pub institution: Option<String>,
    pub ioos_category: Option<String>,
    pub keywords: Option<String>,
    pub long_name: Option<String>,
    pub standard_name: Option<String>,
    pub variable_name: Option<String>,
    pub min_lon: Option<f64>,
    pub max_lon: Option<f64>,
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    /// Any date accepted by [`parse_dates`].
    pub min_time: Option<String>,
    pub max_time: Option<String>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            search_for: None,
            response: "html".to_string(),
            protocol: None,
            items_per_page: 1000,
            page: 1,
            cdm_data_type: None,
            institution: None,
            ioos_category: None,
            keywords: None,
            long_name: None,
            standard_name: None,
            variable_name: None,
            min_lon: None,
            max_lon: None,
            min_lat: None,
            max_lat: None,
            min_time: None,
            max_time: None,
        }
    }
}

/// `<server>/search/advanced.<response>?...`
pub fn search_url(server: &str, params: &SearchParams) -> Result<String> {
    const ANY: &str = "(ANY)";

    let lower = |v: &Option<String>| v.as_deref().map_or(ANY.to_string(), str::to_lowercase);
    let num = |v: Option<f64>| v.map_or(ANY.to_string(), |x| x.to_string());
    let time = |v: &Option<String>| -> Result<Option<String>> {
        v.as_deref()
            .map(|t| parse_dates(t).map(|s| s.to_string()))
            .transpose()
    };

    let protocol = params
        .protocol
        .and_then(Protocol::segment)
        .unwrap_or(ANY);

    let mut url = format!(
        "{}/search/advanced.{}?page={}&itemsPerPage={}&protocol={}",
        server.trim_end_matches('/'),
        params.response,
        params.page,
        params.items_per_page,
        protocol
    );
    for (name, value) in [
        ("cdm_data_type", lower(&params.cdm_data_type)),
        ("institution", lower(&params.institution)),
        ("ioos_category", lower(&params.ioos_category)),
        ("keywords", lower(&params.keywords)),
        ("long_name", lower(&params.long_name)),
        ("standard_name", lower(&params.standard_name)),
        ("variableName", lower(&params.variable_name)),
        ("minLon", num(params.min_lon)),
        ("maxLon", num(params.max_lon)),
        ("minLat", num(params.min_lat)),
        ("maxLat", num(params.max_lat)),
    ] {
        url.push_str(&format!("&{}={}", name, value));
    }

    // ERDDAP 2.10+ rejects the (ANY) placeholder for times.
    if let Some(t) = time(&params.min_time)? {
        url.push_str(&format!("&minTime={}", t));
    }
    if let Some(t) = time(&params.max_time)? {
        url.push_str(&format!("&maxTime={}", t));
    }

    if let Some(search_for) = params.search_for.as_deref().filter(|s| !s.is_empty()) {
        url.push_str(&format!("&searchFor={}", quote_plus(search_for)));
    }

    Ok(url)
}

/// Pieces of a dataset URL, see [`parse_url`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlComponents {
    pub server: String,
    pub protocol: Protocol,
    pub dataset_id: String,
    pub extension: Option<String>,
}

/// Splits a dataset URL such as
/// `https://x.org/erddap/tabledap/ds1.csv?time,temp` into its components.
///
/// The path segment before the last one is the protocol. When it is neither
/// `tabledap` nor `griddap`, the protocol is [`Protocol::Generic`] and the server
/// is everything before the last segment.
pub fn parse_url(url: &str) -> Result<UrlComponents> {
    let base = url.split(['?', '#']).next().unwrap_or(url);
    let parsed = Url::parse(base).with_context(|| format!("invalid url {:?}", url))?;
    if parsed.cannot_be_a_base() {
        bail!("invalid url {:?}: not a server address", url);
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        bail!(
            "invalid url for host {}: credentials in the url are not supported, pass them with Connection::with_auth",
            parsed.host_str().unwrap_or("")
        );
    }
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "invalid url {:?}: ERDDAP is served over http or https, not {}",
            url,
            parsed.scheme()
        );
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();
    let Some((last, rest)) = segments.split_last() else {
        bail!("no dataset id found in url {:?}", url);
    };

    let (protocol, server_segments) = match rest.split_last() {
        Some((segment, before)) if Protocol::from_segment(segment) != Protocol::Generic => {
            (Protocol::from_segment(segment), before)
        }
        _ => (Protocol::Generic, rest),
    };

    let mut server = parsed.origin().ascii_serialization();
    for segment in server_segments {
        server.push('/');
        server.push_str(segment);
    }

    let (dataset_id, extension) = match last.split_once('.') {
        Some((id, ext)) if !ext.is_empty() => (id, Some(ext.to_string())),
        Some((id, _)) => (id, None),
        None => (*last, None),
    };

    Ok(UrlComponents {
        server,
        protocol,
        dataset_id: dataset_id.to_string(),
        extension,
    })
}
