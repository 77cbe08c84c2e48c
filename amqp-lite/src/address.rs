//! `amqp[s]://[user:[password]@]host[:port][/path]` addresses

use std::{borrow::Cow, fmt::Display, str::FromStr};

use amqp_lite_types::definitions::{PORT, SECURE_PORT};
use percent_encoding::percent_decode_str;
use url::Url;

use crate::Error;

/// Scheme of plain AMQP addresses
pub const AMQP_SCHEME: &str = "amqp";

/// Scheme of AMQP over TLS addresses
pub const AMQPS_SCHEME: &str = "amqps";

/// A parsed AMQP address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Host name or IP address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Path, `/` if absent
    pub path: String,
    /// Lower case scheme
    pub scheme: String,
    /// Whether the scheme is `amqps`
    pub use_tls: bool,
    /// Percent-decoded user name
    pub user: Option<String>,
    /// Percent-decoded password
    pub password: Option<String>,
}

impl Address {
    /// Parses an address
    pub fn parse(address: &str) -> Result<Self, Error> {
        let url = Url::parse(address)?;
        Self::try_from(&url)
    }

    /// Creates an address from its parts
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: Option<String>,
        password: Option<String>,
        path: impl Into<String>,
        scheme: &str,
    ) -> Result<Self, Error> {
        let scheme = scheme.to_ascii_lowercase();
        let use_tls = match scheme.as_str() {
            AMQP_SCHEME => false,
            AMQPS_SCHEME => true,
            _ => return Err(Error::InvalidAddress(format!("unsupported scheme {}", scheme))),
        };
        let path = path.into();
        Ok(Self {
            host: host.into(),
            port,
            path: if path.is_empty() { "/".into() } else { path },
            scheme,
            use_tls,
            user,
            password,
        })
    }

    /// Default port of a scheme
    pub fn default_port(use_tls: bool) -> u16 {
        if use_tls {
            SECURE_PORT
        } else {
            PORT
        }
    }
}

impl TryFrom<&Url> for Address {
    type Error = Error;

    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        let scheme = url.scheme().to_ascii_lowercase();
        let use_tls = match scheme.as_str() {
            AMQP_SCHEME => false,
            AMQPS_SCHEME => true,
            _ => return Err(Error::InvalidAddress(format!("unsupported scheme {}", scheme))),
        };
        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| Error::InvalidAddress("missing host".into()))?;
        let host = decode(host)?;
        let user = match url.username() {
            "" => None,
            user => Some(decode(user)?),
        };
        let password = url.password().map(decode).transpose()?;
        let port = url.port().unwrap_or_else(|| Address::default_port(use_tls));

        Self::new(host, port, user, password, url.path(), &scheme)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Address {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

fn decode(segment: &str) -> Result<String, Error> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| Error::InvalidAddress(format!("{} is not valid utf-8", segment)))
}
