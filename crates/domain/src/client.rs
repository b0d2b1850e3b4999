//! Client address derivation from reverse-proxy headers.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Sentinel used when no forwarding header identifies the client.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Network origin of a request as reported by the trusted reverse proxy.
///
/// Clients without forwarding headers all collapse into [`ClientAddress::Unknown`]
/// and therefore share one rate limit bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientAddress {
    /// Address taken from `x-forwarded-for` or `x-real-ip`.
    Forwarded(String),
    /// No usable forwarding header was present.
    Unknown,
}

impl ClientAddress {
    /// Resolves the client from raw `x-forwarded-for` and `x-real-ip` values.
    ///
    /// The first non-empty entry of `x-forwarded-for` wins, then `x-real-ip`.
    #[must_use]
    pub fn from_forwarding_headers(forwarded_for: Option<&str>, real_ip: Option<&str>) -> Self {
        let forwarded = forwarded_for
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        let real_ip = real_ip.map(str::trim).filter(|value| !value.is_empty());

        forwarded
            .or(real_ip)
            .map_or(Self::Unknown, |value| Self::Forwarded(value.to_owned()))
    }

    /// Returns the textual form used in rate limit keys and logs.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Forwarded(address) => address.as_str(),
            Self::Unknown => UNKNOWN_CLIENT,
        }
    }
}

impl Display for ClientAddress {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
