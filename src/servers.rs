//! Short names for well-known public ERDDAP servers.

/// A builtin server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Server {
    pub name: &'static str,
    pub description: &'static str,
    pub url: &'static str,
}

pub const SERVERS: &[Server] = &[
    Server {
        name: "MDA",
        description: "Marine Domain Awareness (MDA) - Italy",
        url: "https://bluehub.jrc.ec.europa.eu/erddap/",
    },
    Server {
        name: "MII",
        description: "Marine Institute - Ireland",
        url: "https://erddap.marine.ie/erddap/",
    },
    Server {
        name: "CSCGOM",
        description: "CoastWatch Caribbean/Gulf of Mexico Node",
        url: "http://cwcgom.aoml.noaa.gov/erddap/",
    },
    Server {
        name: "CSWC",
        description: "CoastWatch West Coast Node",
        url: "https://coastwatch.pfeg.noaa.gov/erddap/",
    },
    Server {
        name: "CeNCOOS",
        description: "Central & Northern California Ocean Observing System",
        url: "http://erddap.axiomalaska.com/erddap/",
    },
    Server {
        name: "NERACOOS",
        description: "Northeastern Regional Association of Coastal Ocean Observing Systems",
        url: "http://www.neracoos.org/erddap/",
    },
    Server {
        name: "NGDAC",
        description: "National Glider Data Assembly Center",
        url: "https://gliders.ioos.us/erddap/",
    },
    Server {
        name: "PacIOOS",
        description: "Pacific Islands Ocean Observing System",
        url: "http://oos.soest.hawaii.edu/erddap/",
    },
    Server {
        name: "SECOORA",
        description: "Southeast Coastal Ocean Observing Regional Association",
        url: "http://erddap.secoora.org/erddap/",
    },
    Server {
        name: "NCEI",
        description: "National Centers for Environmental Information",
        url: "https://ecowatch.ncddc.noaa.gov/erddap/",
    },
    Server {
        name: "OSMC",
        description: "Observing System Monitoring Center",
        url: "http://osmc.noaa.gov/erddap/",
    },
    Server {
        name: "UAF",
        description: "Unified Access Framework",
        url: "https://upwell.pfeg.noaa.gov/erddap/",
    },
    Server {
        name: "ONC",
        description: "Ocean Networks Canada",
        url: "http://dap.onc.uvic.ca/erddap/",
    },
    Server {
        name: "BMLSC",
        description: "UC Davis BML",
        url: "http://bmlsc.ucdavis.edu:8080/erddap/",
    },
    Server {
        name: "RTECH",
        description: "RTECH",
        url: "https://meteo.rtech.fr/erddap/",
    },
    Server {
        name: "IFREMER",
        description: "French Research Institute for the Exploitation of the Sea",
        url: "http://www.ifremer.fr/erddap/",
    },
    Server {
        name: "UBC",
        description: "UBC Earth, Ocean & Atmospheric Sciences",
        url: "https://salishsea.eos.ubc.ca/erddap/",
    },
];

/// Looks up a builtin server by its short name (case sensitive).
pub fn lookup(name: &str) -> Option<&'static Server> {
    SERVERS.iter().find(|s| s.name == name)
}
