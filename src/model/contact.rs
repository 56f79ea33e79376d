//! Contact object snapshot.

use serde::{Deserialize, Serialize};

use super::ObjectMeta;

/// Full contact snapshot as returned by `contact_info`.
///
/// Postal information is always sent with type `loc`. The registrant fields
/// (`consent_for_publishing`, `nationality_code`, `entity_type`, `reg_code`)
/// travel in the registry's contact extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Client-assigned contact handle
    pub id: String,
    /// Status values (e.g. `clientDeleteProhibited`)
    #[serde(default)]
    pub statuses: Vec<String>,
    /// Contact name
    pub name: String,
    /// Organization
    pub org: Option<String>,
    /// Street line
    pub street: Option<String>,
    /// City
    pub city: Option<String>,
    /// State or province
    pub sp: Option<String>,
    /// Postal code
    pub pc: Option<String>,
    /// Country code
    pub cc: Option<String>,
    /// Voice phone (`+CC.NUMBER`)
    pub voice: Option<String>,
    /// Fax
    pub fax: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Authorization password
    pub auth_info_pw: Option<String>,
    /// Consent to publish personal data
    pub consent_for_publishing: Option<bool>,
    /// Registrant nationality (ISO 3166)
    pub nationality_code: Option<String>,
    /// Registrant entity type (1..=7)
    pub entity_type: Option<u8>,
    /// Registrant registration / tax code
    pub reg_code: Option<String>,
    /// Registry-maintained attributes
    #[serde(default)]
    pub meta: ObjectMeta,
}

impl Contact {
    /// Create a contact with only the mandatory fields set.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether any registrant extension field is present.
    pub fn is_registrant(&self) -> bool {
        self.entity_type.is_some() || self.nationality_code.is_some() || self.reg_code.is_some()
    }
}
