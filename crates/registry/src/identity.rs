use std::{collections::HashMap, fmt, str::FromStr, sync::LazyLock};

use jiff::{Timestamp, civil::DateTime, tz::TimeZone};
use regex::Regex;
use serde::{Deserialize, Serialize};

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.-]{0,63}$").expect("client name pattern must compile"));

pub(crate) const FIELD_CREATED: &str = "created";
pub(crate) const FIELD_PROTOCOL: &str = "protocol";

/// A client name that is safe to pass to backend tools and to use as a file stem.
///
/// Starts with an ASCII letter or digit, followed by up to 63 letters, digits,
/// `_`, `.` or `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ClientName(String);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid client name '{0}': use 1-64 letters, digits, '_', '.' or '-', starting with a letter or digit")]
pub struct NameError(pub String);

impl ClientName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ClientName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if NAME_PATTERN.is_match(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(NameError(s.to_string()))
        }
    }
}

impl fmt::Display for ClientName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Protocols a client identity can be provisioned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Protocol {
    /// Certificate based. Each client gets its own certificate and config file.
    OpenVpn,
    /// One shared secret for all clients.
    Shadowsocks,
    /// One shared UUID for all clients.
    V2Ray,
}

impl Protocol {
    /// Whether the protocol issues a per-client certificate and artifact.
    pub fn is_certificate_based(self) -> bool {
        match self {
            Protocol::OpenVpn => true,
            Protocol::Shadowsocks | Protocol::V2Ray => false,
        }
    }
}

/// A client tracked by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientIdentity {
    pub name: ClientName,
    pub protocol: Protocol,
    #[serde(rename = "created")]
    pub created_at: Timestamp,
}

impl ClientIdentity {
    pub fn new(name: ClientName, protocol: Protocol) -> Self {
        Self {
            name,
            protocol,
            created_at: Timestamp::now(),
        }
    }

    pub(crate) fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            (FIELD_CREATED, self.created_at.to_string()),
            (FIELD_PROTOCOL, self.protocol.to_string()),
        ]
    }

    /// Rebuilds an identity from its stored hash fields.
    ///
    /// Returns `None` when a field is missing or unreadable.
    pub(crate) fn from_fields(name: ClientName, fields: &HashMap<String, String>) -> Option<Self> {
        let protocol = fields.get(FIELD_PROTOCOL)?.parse().ok()?;
        let created_at = parse_created(fields.get(FIELD_CREATED)?)?;

        Some(Self {
            name,
            protocol,
            created_at,
        })
    }
}

/// Accepts RFC 3339 timestamps and zone-less ISO datetimes, the latter read as UTC.
fn parse_created(value: &str) -> Option<Timestamp> {
    if let Ok(timestamp) = value.parse::<Timestamp>() {
        return Some(timestamp);
    }

    let datetime = value.parse::<DateTime>().ok()?;
    datetime.to_zoned(TimeZone::UTC).ok().map(|zoned| zoned.timestamp())
}
