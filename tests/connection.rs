mod common;

use anyhow::bail;
use common::{SERVER, StubTransport, connection};
use erddap::{Auth, Body, Connection, RequestOptions, Transport};
use std::io::Cursor;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;

/// Answers every request with `payload` but announces `content_length` bytes.
#[derive(Debug)]
struct MislabelledTransport {
    content_length: u64,
    payload: &'static [u8],
}

impl Transport for MislabelledTransport {
    fn open(
        &self,
        _url: &str,
        _auth: Option<&Auth>,
        _options: &RequestOptions,
    ) -> anyhow::Result<Body> {
        Ok(Body {
            content_length: Some(self.content_length),
            reader: Box::new(Cursor::new(self.payload)),
        })
    }
}

fn mislabelled(content_length: u64, payload: &'static [u8]) -> Connection {
    Connection::new(SERVER).with_transport(Arc::new(MislabelledTransport {
        content_length,
        payload,
    }))
}

#[test]
fn canonical_server_is_idempotent() {
    for s in [
        "https://x.org/erddap",
        "https://x.org/erddap/",
        "https://x.org/erddap//",
        "http://bmlsc.ucdavis.edu:8080/erddap/",
    ] {
        let once = Connection::canonical_server(s);
        assert_eq!(once, Connection::canonical_server(s.trim_end_matches('/')));
        assert_eq!(Connection::canonical_server(&once), once);
        assert!(!once.ends_with('/'));
    }
}

#[test]
fn connection_of_connection_round_trips() {
    let conn = Connection::new(Connection::new("https://x.org/erddap/"));
    assert_eq!(conn.server(), "https://x.org/erddap");
}

#[test]
fn get_joins_path_and_forwards_auth() {
    let stub = Arc::new(
        StubTransport::default().with(&format!("{}/info/ds1/index.csv", SERVER), b"hello"),
    );
    let conn = connection(&stub).with_auth(Auth::new("user", "pw"));

    let text = conn
        .get_text("/info/ds1/index.csv", &RequestOptions::default())
        .unwrap();
    assert_eq!(text, "hello");

    // absolute URLs are used as given
    let body = conn
        .get(
            &format!("{}/info/ds1/index.csv", SERVER),
            &RequestOptions::default(),
        )
        .unwrap();
    assert_eq!(body, b"hello");

    assert_eq!(
        stub.auth_seen(),
        vec![Some(Auth::new("user", "pw")), Some(Auth::new("user", "pw"))]
    );
}

#[test]
fn transport_errors_propagate() {
    let stub = Arc::new(StubTransport::default());
    let err = connection(&stub)
        .get("tabledap/none.csv", &RequestOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("no stub response"));
}

#[test]
fn open_yields_empty_scratch_file_and_removes_it() {
    let stub = Arc::new(StubTransport::default());
    let conn = connection(&stub);

    let path: PathBuf = conn
        .open("tabledap/ds1.nc", |path| {
            assert!(path.exists());
            assert_eq!(std::fs::metadata(path)?.len(), 0);
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            assert!(name.starts_with("erddap_"));
            assert!(name.ends_with(".tmp"));
            Ok(path.to_path_buf())
        })
        .unwrap();
    assert!(!path.exists());
    assert!(stub.calls().is_empty());
}

#[test]
fn open_removes_file_on_error() {
    let stub = Arc::new(StubTransport::default());
    let conn = connection(&stub);

    let mut seen: Option<PathBuf> = None;
    let result: anyhow::Result<()> = conn.open("tabledap/ds1.nc", |path| {
        seen = Some(path.to_path_buf());
        bail!("reader failed")
    });
    assert!(result.is_err());
    assert!(!seen.unwrap().exists());
}

#[test]
fn open_removes_file_on_panic() {
    let stub = Arc::new(StubTransport::default());
    let conn = connection(&stub);

    let mut seen: Option<PathBuf> = None;
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        conn.open("tabledap/ds1.nc", |path| -> anyhow::Result<()> {
            seen = Some(path.to_path_buf());
            panic!("reader panicked")
        })
    }));
    assert!(outcome.is_err());
    let path = seen.unwrap();
    assert!(!path.exists(), "{} survived the panic", path.display());
}

#[test]
fn get_ignores_oversized_content_length() {
    let conn = mislabelled(u64::MAX / 2, b"abc");
    let body = conn
        .get("info/ds1/index.csv", &RequestOptions::default())
        .unwrap();
    assert_eq!(body, b"abc");
}

#[test]
fn short_download_leaves_no_file() {
    let conn = mislabelled(10, b"abcd");
    let dir = tempfile::Builder::new()
        .prefix("erddap-test-")
        .tempdir()
        .unwrap();
    let target = dir.path().join("ds1.nc");

    let err = conn.download("tabledap/ds1.nc", &target).unwrap_err();
    assert!(err.to_string().contains("4 byte(s) out of 10"));
    assert!(!target.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn failed_download_keeps_previous_file() {
    let conn = mislabelled(10, b"abcd");
    let dir = tempfile::Builder::new()
        .prefix("erddap-test-")
        .tempdir()
        .unwrap();
    let target = dir.path().join("ds1.nc");
    std::fs::write(&target, b"previous").unwrap();

    assert!(conn.download("tabledap/ds1.nc", &target).is_err());
    assert_eq!(std::fs::read(&target).unwrap(), b"previous");
}

#[test]
fn download_writes_target() {
    let url = format!("{}/tabledap/ds1.csv?time", SERVER);
    let stub = Arc::new(StubTransport::default().with(&url, b"time\nUTC\n"));
    let conn = connection(&stub);

    let dir = tempfile::Builder::new()
        .prefix("erddap-test-")
        .tempdir()
        .unwrap();
    let target = dir.path().join("nested").join("ds1.csv");
    let written = conn.download("tabledap/ds1.csv?time", &target).unwrap();
    assert_eq!(written, target);
    assert_eq!(std::fs::read(&target).unwrap(), b"time\nUTC\n");
}
