//! Session cookies, handled by hand rather than through a client jar.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Set of `name=value` cookie pairs carried on every request.
///
/// Cookies are compared as a set, so attribute noise (`Path`, `HttpOnly`,
/// ordering of headers) never counts as a session change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieSet(BTreeSet<String>);

impl CookieSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw `Set-Cookie` header values, keeping only `name=value`.
    pub fn from_set_cookie<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        Self(
            headers
                .into_iter()
                .filter_map(|header| {
                    let pair = header.split(';').next()?.trim();
                    pair.contains('=').then(|| pair.to_string())
                })
                .collect(),
        )
    }

    /// Value for the `Cookie` request header, `None` when empty.
    pub fn header_value(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.iter().cloned().collect::<Vec<_>>().join("; "))
        }
    }

    /// No cookies held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of cookies.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate `name=value` pairs.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for CookieSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.iter().cloned().collect::<Vec<_>>().join(", "))
    }
}
