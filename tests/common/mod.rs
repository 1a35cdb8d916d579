#![allow(dead_code)]

use anyhow::{Result, bail};
use erddap::{Auth, Body, Connection, RequestOptions, Transport};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const SERVER: &str = "https://example.com/erddap";

/// Serves canned bodies by URL and records every request.
#[derive(Debug, Default)]
pub struct StubTransport {
    responses: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<(String, Option<Auth>)>>,
}

impl StubTransport {
    pub fn with(mut self, url: &str, body: &[u8]) -> Self {
        self.responses.insert(url.to_string(), body.to_vec());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn auth_seen(&self) -> Vec<Option<Auth>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, auth)| auth.clone())
            .collect()
    }
}

impl Transport for StubTransport {
    fn open(&self, url: &str, auth: Option<&Auth>, _options: &RequestOptions) -> Result<Body> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), auth.cloned()));
        match self.responses.get(url) {
            Some(body) => Ok(Body::from_bytes(body.clone())),
            None => bail!("no stub response for {}", url),
        }
    }
}

pub fn connection(stub: &Arc<StubTransport>) -> Connection {
    Connection::new(SERVER).with_transport(stub.clone())
}

pub fn info_url(dataset_id: &str) -> String {
    format!("{}/info/{}/index.csv", SERVER, dataset_id)
}

pub const INFO_HEADER: &str = "Row Type,Variable Name,Attribute Name,Data Type,Value\n";
