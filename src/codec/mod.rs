//! EPP XML codec.
//!
//! [`encode`] turns a [`Command`] into a request document and [`decode`]
//! turns a registry document into a [`Frame`]. The session layer never looks
//! at XML directly.
//!
//! Supported object mappings: contact, domain, RGP restore, and the
//! registry `extcon` / `extdom` extensions.

mod command;
mod response;
mod xml;

pub use command::{encode, Command, Login, Trade};
pub use response::{decode, EppResponse, Frame};

/// EPP envelope namespace
pub const NS_EPP: &str = "urn:ietf:params:xml:ns:epp-1.0";
/// Domain mapping namespace
pub const NS_DOMAIN: &str = "urn:ietf:params:xml:ns:domain-1.0";
/// Contact mapping namespace
pub const NS_CONTACT: &str = "urn:ietf:params:xml:ns:contact-1.0";
/// Redemption grace period extension namespace
pub const NS_RGP: &str = "urn:ietf:params:xml:ns:rgp-1.0";
/// Registry contact extension namespace
pub const NS_EXTCON: &str = "http://www.nic.it/ITNIC-EPP/extcon-1.0";
/// Registry domain extension namespace
pub const NS_EXTDOM: &str = "http://www.nic.it/ITNIC-EPP/extdom-1.0";
