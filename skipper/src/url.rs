use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Parsed endpoint URL of the form
/// `<scheme>[+<transport>]://[user@]host[:port][/path]`.
///
/// The scheme (including the optional `+transport` suffix) selects which
/// adaptors are candidates for the endpoint; comparison against registered
/// schemes is case-insensitive, so the scheme is stored lowercased.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EndpointUrl {
    scheme: String,
    user: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
}

impl EndpointUrl {
    /// Parse an endpoint URL.
    ///
    /// Fails with [`ErrorKind::BadParameter`](crate::ErrorKind::BadParameter)
    /// when the string has no scheme separator, an empty or malformed
    /// scheme, or an unparsable port.
    pub fn parse(input: &str) -> Result<Self> {
        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| Error::bad_parameter(format!("'{input}' is not a valid URL")))?;

        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        {
            return Err(Error::bad_parameter(format!(
                "'{input}' has an invalid URL scheme"
            )));
        }

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(rest[idx..].to_string())),
            None => (rest, None),
        };

        let (user, host_port) = match authority.split_once('@') {
            Some((user, host_port)) => (Some(user.to_string()), host_port),
            None => (None, authority),
        };

        let (host, port) = match host_port.split_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|e| {
                    Error::bad_parameter(format!("'{input}' has an invalid port")).with_cause(e)
                })?;
                (host, Some(port))
            }
            None => (host_port, None),
        };

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            user,
            host: (!host.is_empty()).then(|| host.to_string()),
            port,
            path,
        })
    }

    /// The full lowercased scheme, including any `+transport` suffix
    /// (e.g. `pbs+ssh`). This is the registry lookup key.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The scheme without the transport suffix (`pbs` for `pbs+ssh`).
    pub fn base_scheme(&self) -> &str {
        self.scheme
            .split_once('+')
            .map_or(self.scheme.as_str(), |(base, _)| base)
    }

    /// The transport suffix, when present (`ssh` for `pbs+ssh`).
    pub fn transport(&self) -> Option<&str> {
        self.scheme.split_once('+').map(|(_, transport)| transport)
    }

    /// The user component, when present.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The host component, when present.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The port component, when present.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The path component, when present (leading slash included).
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        if let Some(host) = &self.host {
            f.write_str(host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        if let Some(path) = &self.path {
            f.write_str(path)?;
        }
        Ok(())
    }
}

impl FromStr for EndpointUrl {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
