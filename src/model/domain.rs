//! Domain object snapshot.

use serde::{Deserialize, Serialize};

use super::ObjectMeta;

/// Full domain snapshot as returned by `domain_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Fully qualified domain name
    pub name: String,
    /// Registration period in years (create only)
    pub period: Option<u32>,
    /// EPP domain status values (e.g. `clientHold`)
    #[serde(default)]
    pub statuses: Vec<String>,
    /// Statuses reported through extensions, prefixed with their namespace
    /// (`rgp:redemptionPeriod`, `extdom:noRegistrar`). Read-only.
    #[serde(default)]
    pub registry_statuses: Vec<String>,
    /// Registrant contact handle
    pub registrant: Option<String>,
    /// Admin contact handles
    #[serde(default)]
    pub admin_contacts: Vec<String>,
    /// Tech contact handles
    #[serde(default)]
    pub tech_contacts: Vec<String>,
    /// Delegated nameservers
    #[serde(default)]
    pub nameservers: Vec<NameServer>,
    /// Nameservers awaiting registry DNS validation. Read-only.
    #[serde(default)]
    pub nameservers_to_validate: Vec<NameServer>,
    /// Authorization password
    pub auth_info_pw: Option<String>,
    /// Registry-maintained attributes
    #[serde(default)]
    pub meta: ObjectMeta,
}

impl Domain {
    /// Create a domain snapshot with only its name set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Nameserver with optional glue addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameServer {
    /// Host name
    pub name: String,
    /// IPv4 glue
    #[serde(default)]
    pub ipv4: Vec<String>,
    /// IPv6 glue
    #[serde(default)]
    pub ipv6: Vec<String>,
}

impl NameServer {
    /// Nameserver without glue.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add an IPv4 glue address.
    pub fn with_ipv4(mut self, addr: impl Into<String>) -> Self {
        self.ipv4.push(addr.into());
        self
    }

    /// Add an IPv6 glue address.
    pub fn with_ipv6(mut self, addr: impl Into<String>) -> Self {
        self.ipv6.push(addr.into());
        self
    }
}
