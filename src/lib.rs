//! A small Rust client for ERDDAP scientific data servers.
//!
//! ERDDAP serves datasets over plain HTTP: every request is a URL naming the
//! dataset, the access protocol (`tabledap` for tables, `griddap` for grids), a
//! response format and an optional selection of variables and constraints.
//! This crate builds those URLs, fetches dataset metadata and hands the
//! responses back as bytes, files or simple tables.
//!
//! ## Quick start
//! - Point a [`Connection`] at a server (a URL, or a builtin short name like `NGDAC`),
//!   or configure it via environment variables (`ERDDAP_SERVER`, `ERDDAP_USERNAME`,
//!   `ERDDAP_PASSWORD`) or a `.erddaprc` file.
//! - Create a [`Dataset`] and ask for its URL, metadata or data.
//!
//! ```no_run
//! use anyhow::Result;
//! use erddap::{Connection, Dataset};
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let conn = Connection::for_server("NGDAC");
//!     let mut dataset = Dataset::table("whoi_406-20160902T1700", &conn)
//!         .with_variables(["time", "latitude", "longitude", "temperature"])
//!         .with_constraints(
//!             [("time>=".to_string(), json!("2016-09-03T00:00:00Z"))]
//!                 .into_iter()
//!                 .collect(),
//!         )
//!         .with_extension("csv");
//!
//!     println!("{}", dataset.get_download_url()?);
//!     let table = dataset.to_table()?;
//!     println!("{} rows", table.len());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod config;
mod connection;
mod dataset;
mod error;
pub mod metadata;
mod protocol;
pub mod servers;
mod table;
mod transport;
pub mod url;
mod util;

pub use connection::{Auth, Connection, ServerLike};
pub use dataset::{DEFAULT_EXTENSION, Dataset, range_constraints};
pub use metadata::{Attributes, Metadata};
pub use protocol::{Capabilities, Protocol};
pub use table::Table;
pub use transport::{Body, HttpTransport, RequestOptions, Transport};
pub use url::{Constraints, RelativeConstraints};
