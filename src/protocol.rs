use std::fmt;

/// ERDDAP access protocol of a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// `tabledap`: tabular data, one row per observation.
    Table,
    /// `griddap`: gridded data addressed by dimension indices.
    Grid,
    /// No access protocol known; such a dataset cannot build download URLs.
    #[default]
    Generic,
}

/// Format-specific operations a protocol supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Responses can be read as a [`crate::Table`].
    pub table: bool,
    /// The dataset has an OPeNDAP endpoint.
    pub opendap: bool,
}

impl Protocol {
    /// URL path segment, e.g. `tabledap`.
    pub fn segment(self) -> Option<&'static str> {
        match self {
            Protocol::Table => Some("tabledap"),
            Protocol::Grid => Some("griddap"),
            Protocol::Generic => None,
        }
    }

    /// Maps a URL path segment back to a protocol; unknown segments map to `Generic`.
    pub fn from_segment(segment: &str) -> Self {
        match segment {
            "tabledap" => Protocol::Table,
            "griddap" => Protocol::Grid,
            _ => Protocol::Generic,
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            Protocol::Table => Capabilities {
                table: true,
                opendap: true,
            },
            Protocol::Grid => Capabilities {
                table: false,
                opendap: true,
            },
            Protocol::Generic => Capabilities {
                table: false,
                opendap: false,
            },
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment().unwrap_or("generic"))
    }
}
