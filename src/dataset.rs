use anyhow::{Result, bail};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::connection::Connection;
use crate::metadata::{self, Metadata};
use crate::protocol::Protocol;
use crate::table::Table;
use crate::transport::RequestOptions;
use crate::url::{Constraints, DownloadRequest, download_url, info_url, parse_url};

/// Response format used when none is given.
pub const DEFAULT_EXTENSION: &str = "htmlTable";

/// One dataset on an ERDDAP server.
///
/// Variables and constraints may be given up front. When they are not, the
/// first access derives them from the dataset metadata, which is fetched once
/// and then kept for the lifetime of the value.
#[derive(Debug, Clone)]
pub struct Dataset {
    dataset_id: String,
    connection: Connection,
    protocol: Protocol,
    variables: Option<Vec<String>>,
    constraints: Option<Constraints>,
    extension: String,
    meta: Option<Metadata>,
}

impl Dataset {
    pub fn new(
        dataset_id: impl Into<String>,
        connection: impl Into<Connection>,
        protocol: Protocol,
    ) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            connection: connection.into(),
            protocol,
            variables: None,
            constraints: None,
            extension: DEFAULT_EXTENSION.to_string(),
            meta: None,
        }
    }

    /// A `tabledap` dataset.
    pub fn table(dataset_id: impl Into<String>, connection: impl Into<Connection>) -> Self {
        Self::new(dataset_id, connection, Protocol::Table)
    }

    /// A `griddap` dataset.
    pub fn grid(dataset_id: impl Into<String>, connection: impl Into<Connection>) -> Self {
        Self::new(dataset_id, connection, Protocol::Grid)
    }

    /// Builds a dataset from a full request URL such as
    /// `https://gliders.ioos.us/erddap/tabledap/ru29-20150623T1046.csv`.
    ///
    /// The protocol segment picks the dataset kind; the file extension becomes the
    /// response format. A [`Connection`] argument keeps its auth and transport.
    pub fn from_url(url: impl Into<Connection>) -> Result<Self> {
        let mut connection = url.into();
        let parts = parse_url(connection.server())?;
        connection.set_server(parts.server.as_str());

        debug!(
            server = connection.server(),
            dataset_id = %parts.dataset_id,
            protocol = %parts.protocol,
            "parsed dataset url"
        );

        let mut dataset = Self::new(parts.dataset_id, connection, parts.protocol);
        if let Some(extension) = parts.extension {
            dataset.extension = extension;
        }
        Ok(dataset)
    }

    pub fn with_variables<I, S>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.variables = Some(variables.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn set_extension(&mut self, extension: impl Into<String>) {
        self.extension = extension.into();
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn set_connection(&mut self, connection: impl Into<Connection>) {
        self.connection = connection.into();
    }

    /// Replaces the variable selection; `None` derives it from metadata again.
    pub fn set_variables(&mut self, variables: Option<Vec<String>>) {
        self.variables = variables;
    }

    /// Replaces the constraints; `None` derives them from metadata again.
    pub fn set_constraints(&mut self, constraints: Option<Constraints>) {
        self.constraints = constraints;
    }

    /// Download URL for the current selection and response format.
    ///
    /// Fails for [`Protocol::Generic`] datasets, which have no access segment.
    pub fn get_download_url(&mut self) -> Result<String> {
        let extension = self.extension.clone();
        self.url(&extension)
    }

    /// Like [`Dataset::get_download_url`] with another file type.
    ///
    /// Auth or header requirements of the server are not reflected in the URL.
    pub fn url(&mut self, file_type: &str) -> Result<String> {
        if self.protocol.segment().is_none() {
            bail!(
                "dataset {} has no access protocol (tabledap or griddap); cannot build a download url",
                self.dataset_id
            );
        }

        let variables = self.variables()?.to_vec();
        let constraints = self.constraints()?.clone();

        let mut req = DownloadRequest::new(
            self.connection.server(),
            &self.dataset_id,
            self.protocol,
            file_type,
        );
        req.variables = Some(&variables);
        req.constraints = Some(&constraints);

        let url = download_url(&req)?;
        Ok(url.trim_end_matches('?').to_string())
    }

    /// [`Dataset::url`] without the server, e.g. `tabledap/ds1.csv?time,temp`.
    pub fn url_segment(&mut self, file_type: &str) -> Result<String> {
        let url = self.url(file_type)?;
        let prefix = format!("{}/", self.connection.server());
        if let Some(segment) = url.strip_prefix(prefix.as_str()) {
            return Ok(segment.to_string());
        }
        Ok(url)
    }

    /// Unconstrained OPeNDAP endpoint of the dataset.
    pub fn opendap_url(&self) -> Result<String> {
        if !self.protocol.capabilities().opendap {
            bail!(
                "dataset {} ({}) has no OPeNDAP endpoint",
                self.dataset_id,
                self.protocol
            );
        }
        download_url(&DownloadRequest::new(
            self.connection.server(),
            &self.dataset_id,
            self.protocol,
            "opendap",
        ))
    }

    /// Requests the current selection as `file_type` and returns the raw body.
    pub fn get(&mut self, file_type: &str) -> Result<Vec<u8>> {
        let url = self.url(file_type)?;
        self.connection.get(&url, &RequestOptions::default())
    }

    /// Runs `f` with a scratch file for a `file_type` request, see [`Connection::open`].
    pub fn open<T, F>(&mut self, file_type: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let url = self.url(file_type)?;
        self.connection.open(&url, f)
    }

    /// Downloads the current selection as `file_type` (e.g. `nc`) into `target`.
    pub fn download(&mut self, file_type: &str, target: &Path) -> Result<PathBuf> {
        let url = self.url(file_type)?;
        self.connection.download(&url, target)
    }

    /// Reads the current selection into a [`Table`]. `tabledap` only.
    pub fn to_table(&mut self) -> Result<Table> {
        if !self.protocol.capabilities().table {
            bail!(
                "dataset {} ({}) cannot be read as a table",
                self.dataset_id,
                self.protocol
            );
        }
        // csvp puts units in the header ("temp (degree_C)") instead of a second line.
        let body = self.get("csvp")?;
        Table::from_csv(&body)
    }

    fn fetch_meta(&self) -> Result<Metadata> {
        let url = info_url(self.connection.server(), &self.dataset_id, "csv")?;
        let body = self.connection.get(&url, &RequestOptions::default())?;
        let meta = metadata::from_info_table(&Table::from_csv(&body)?)?;
        info!(
            dataset_id = %self.dataset_id,
            variables = meta.len(),
            "fetched dataset metadata"
        );
        Ok(meta)
    }

    /// Dataset metadata, fetched from the server on first use only.
    pub fn get_meta(&mut self) -> Result<&Metadata> {
        let meta = match self.meta.take() {
            Some(meta) => meta,
            None => self.fetch_meta()?,
        };
        Ok(&*self.meta.insert(meta))
    }

    pub fn meta(&mut self) -> Result<&Metadata> {
        self.get_meta()
    }

    /// Selected variables, defaulting to every variable in the metadata.
    pub fn variables(&mut self) -> Result<&[String]> {
        let variables = match self.variables.take() {
            Some(variables) => variables,
            None => self.get_meta()?.keys().cloned().collect(),
        };
        Ok(self.variables.insert(variables).as_slice())
    }

    /// Constraints, defaulting to the `actual_range` of every variable that has one.
    pub fn constraints(&mut self) -> Result<&Constraints> {
        let constraints = match self.constraints.take() {
            Some(constraints) => constraints,
            None => range_constraints(self.get_meta()?)?,
        };
        Ok(&*self.constraints.insert(constraints))
    }

    /// Variables whose attribute `name` equals `value`,
    /// e.g. `("standard_name", "sea_water_temperature")`.
    pub fn variables_by_attribute(&mut self, name: &str, value: &str) -> Result<Vec<String>> {
        self.variables_by_attribute_with(name, |v| v == Some(value))
    }

    /// Variables for which `pred` accepts the value of attribute `name`
    /// (`None` when the variable lacks it).
    pub fn variables_by_attribute_with<F>(&mut self, name: &str, pred: F) -> Result<Vec<String>>
    where
        F: Fn(Option<&str>) -> bool,
    {
        Ok(self
            .get_meta()?
            .iter()
            .filter(|(_, attrs)| pred(attrs.get(name).map(String::as_str)))
            .map(|(variable, _)| variable.clone())
            .collect())
    }
}

/// `>=var` / `<=var` bounds for every variable with an `actual_range`.
///
/// Bounds are kept as text, exactly as the server reported them.
pub fn range_constraints(meta: &Metadata) -> Result<Constraints> {
    let mut constraints = Constraints::new();
    for (variable, attributes) in meta {
        if let Some(range) = attributes.get("actual_range") {
            let (low, high) = metadata::parse_actual_range(range)?;
            constraints.insert(format!(">={}", variable), Value::String(low));
            constraints.insert(format!("<={}", variable), Value::String(high));
        }
    }
    Ok(constraints)
}
