//! Change-sets for contacts and domains.

use serde::{Deserialize, Serialize};

use super::{diff_members, diff_scalar, ChangeSet, Clause, Diffable};
use crate::model::{Contact, Domain, NameServer};

/// Contact change-set.
pub type ContactChangeSet = ChangeSet<ContactMembers, ContactChg>;

/// Domain change-set.
pub type DomainChangeSet = ChangeSet<DomainMembers, DomainChg>;

/// Multi-valued contact fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMembers {
    /// Status values
    pub statuses: Vec<String>,
}

impl Clause for ContactMembers {
    fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

/// Changed contact scalars, named after the [`Contact`] fields they mirror.
/// `Some(None)` clears an optional field.
#[allow(missing_docs)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactChg {
    pub name: Option<String>,
    pub org: Option<Option<String>>,
    pub street: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub sp: Option<Option<String>>,
    pub pc: Option<Option<String>>,
    pub cc: Option<Option<String>>,
    pub voice: Option<Option<String>>,
    pub fax: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub auth_info_pw: Option<Option<String>>,
    pub consent_for_publishing: Option<Option<bool>>,
    pub nationality_code: Option<Option<String>>,
    pub entity_type: Option<Option<u8>>,
    pub reg_code: Option<Option<String>>,
}

impl ContactChg {
    /// Any `addr` field changed.
    pub fn has_addr(&self) -> bool {
        self.street.is_some()
            || self.city.is_some()
            || self.sp.is_some()
            || self.pc.is_some()
            || self.cc.is_some()
    }

    /// Any `postalInfo` field changed.
    pub fn has_postal_info(&self) -> bool {
        self.name.is_some() || self.org.is_some() || self.has_addr()
    }

    /// Any registrant extension field changed.
    pub fn has_registrant(&self) -> bool {
        self.nationality_code.is_some() || self.entity_type.is_some() || self.reg_code.is_some()
    }

    /// Anything carried by the registry contact extension changed.
    pub fn has_extension(&self) -> bool {
        self.consent_for_publishing.is_some() || self.has_registrant()
    }

    /// Anything carried by the core `contact:chg` element changed.
    pub fn has_core(&self) -> bool {
        self.has_postal_info()
            || self.voice.is_some()
            || self.fax.is_some()
            || self.email.is_some()
            || self.auth_info_pw.is_some()
    }
}

impl Clause for ContactChg {
    fn is_empty(&self) -> bool {
        !self.has_core() && !self.has_extension()
    }
}

impl Diffable for Contact {
    type Members = ContactMembers;
    type Chg = ContactChg;

    fn diff(old: &Self, new: &Self) -> ContactChangeSet {
        let (add_statuses, rem_statuses) = diff_members(&old.statuses, &new.statuses);

        ChangeSet {
            add: ContactMembers {
                statuses: add_statuses,
            },
            chg: ContactChg {
                name: diff_scalar(&old.name, &new.name),
                org: diff_scalar(&old.org, &new.org),
                street: diff_scalar(&old.street, &new.street),
                city: diff_scalar(&old.city, &new.city),
                sp: diff_scalar(&old.sp, &new.sp),
                pc: diff_scalar(&old.pc, &new.pc),
                cc: diff_scalar(&old.cc, &new.cc),
                voice: diff_scalar(&old.voice, &new.voice),
                fax: diff_scalar(&old.fax, &new.fax),
                email: diff_scalar(&old.email, &new.email),
                auth_info_pw: diff_scalar(&old.auth_info_pw, &new.auth_info_pw),
                consent_for_publishing: diff_scalar(
                    &old.consent_for_publishing,
                    &new.consent_for_publishing,
                ),
                nationality_code: diff_scalar(&old.nationality_code, &new.nationality_code),
                entity_type: diff_scalar(&old.entity_type, &new.entity_type),
                reg_code: diff_scalar(&old.reg_code, &new.reg_code),
            },
            rem: ContactMembers {
                statuses: rem_statuses,
            },
        }
    }
}

/// Multi-valued domain fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainMembers {
    /// Status values
    pub statuses: Vec<String>,
    /// Admin contact handles
    pub admin_contacts: Vec<String>,
    /// Tech contact handles
    pub tech_contacts: Vec<String>,
    /// Nameservers
    pub nameservers: Vec<NameServer>,
}

impl DomainMembers {
    /// Any contact association present.
    pub fn has_contacts(&self) -> bool {
        !self.admin_contacts.is_empty() || !self.tech_contacts.is_empty()
    }
}

impl Clause for DomainMembers {
    fn is_empty(&self) -> bool {
        self.statuses.is_empty() && !self.has_contacts() && self.nameservers.is_empty()
    }
}

/// Changed domain scalars.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainChg {
    /// New registrant
    pub registrant: Option<Option<String>>,
    /// New authorization password
    pub auth_info_pw: Option<Option<String>>,
}

impl Clause for DomainChg {
    fn is_empty(&self) -> bool {
        self.registrant.is_none() && self.auth_info_pw.is_none()
    }
}

impl Diffable for Domain {
    type Members = DomainMembers;
    type Chg = DomainChg;

    fn diff(old: &Self, new: &Self) -> DomainChangeSet {
        let (add_statuses, rem_statuses) = diff_members(&old.statuses, &new.statuses);
        let (add_admin, rem_admin) = diff_members(&old.admin_contacts, &new.admin_contacts);
        let (add_tech, rem_tech) = diff_members(&old.tech_contacts, &new.tech_contacts);
        let (add_ns, rem_ns) = diff_members(&old.nameservers, &new.nameservers);

        ChangeSet {
            add: DomainMembers {
                statuses: add_statuses,
                admin_contacts: add_admin,
                tech_contacts: add_tech,
                nameservers: add_ns,
            },
            chg: DomainChg {
                registrant: diff_scalar(&old.registrant, &new.registrant),
                auth_info_pw: diff_scalar(&old.auth_info_pw, &new.auth_info_pw),
            },
            rem: DomainMembers {
                statuses: rem_statuses,
                admin_contacts: rem_admin,
                tech_contacts: rem_tech,
                nameservers: rem_ns,
            },
        }
    }
}
