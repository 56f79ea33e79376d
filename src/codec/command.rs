//! Command tree and its XML encoding.

use super::xml::XmlWriter;
use super::{NS_CONTACT, NS_DOMAIN, NS_EPP, NS_EXTCON, NS_EXTDOM, NS_RGP};
use crate::diff::{ContactChangeSet, ContactChg, ContactMembers, DomainChangeSet, DomainMembers};
use crate::error::Result;
use crate::model::{Contact, Domain, NameServer, TransferOp};

/// Login parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    /// Registrar tag
    pub cl_id: String,
    /// Current password
    pub pw: String,
    /// Password to switch to on success
    pub new_pw: Option<String>,
    /// Protocol version
    pub version: String,
    /// Response language
    pub lang: String,
    /// Object service URIs
    pub services: Vec<String>,
    /// Extension URIs
    pub extensions: Vec<String>,
}

/// Registrant change carried on a transfer request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    /// Contact taking over the domain
    pub new_registrant: String,
    /// Authorization password after the trade
    pub new_auth_pw: String,
}

/// Every command the session can send.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `<hello/>`
    Hello,
    /// `<login>`
    Login(Login),
    /// `<logout/>`
    Logout,
    /// `<contact:check>`
    ContactCheck {
        /// Contact handles
        ids: Vec<String>,
    },
    /// `<contact:info>`
    ContactInfo {
        /// Contact handle
        id: String,
        /// Auth password for non-sponsored contacts
        auth_pw: Option<String>,
    },
    /// `<contact:create>`
    ContactCreate(Box<Contact>),
    /// `<contact:update>`
    ContactUpdate {
        /// Contact handle
        id: String,
        /// Changes to apply
        changes: Box<ContactChangeSet>,
    },
    /// `<contact:delete>`
    ContactDelete {
        /// Contact handle
        id: String,
    },
    /// `<domain:check>`
    DomainCheck {
        /// Domain names
        names: Vec<String>,
    },
    /// `<domain:info>`
    DomainInfo {
        /// Domain name
        name: String,
        /// Auth password for non-sponsored domains
        auth_pw: Option<String>,
    },
    /// `<domain:create>`
    DomainCreate(Box<Domain>),
    /// `<domain:update>`
    DomainUpdate {
        /// Domain name
        name: String,
        /// Changes to apply
        changes: Box<DomainChangeSet>,
    },
    /// `<domain:delete>`
    DomainDelete {
        /// Domain name
        name: String,
    },
    /// RGP restore request on a domain in redemption
    DomainRestore {
        /// Domain name
        name: String,
    },
    /// `<transfer op=...>`
    DomainTransfer {
        /// Transfer operation
        op: TransferOp,
        /// Domain name
        name: String,
        /// Domain auth password
        auth_pw: Option<String>,
        /// Registrant trade (request only)
        trade: Option<Trade>,
    },
    /// `<poll op="req"/>`
    PollRequest,
    /// `<poll op="ack"/>`
    PollAck {
        /// Message to acknowledge
        msg_id: String,
    },
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::Login(_) => "login",
            Self::Logout => "logout",
            Self::ContactCheck { .. } => "contact:check",
            Self::ContactInfo { .. } => "contact:info",
            Self::ContactCreate(_) => "contact:create",
            Self::ContactUpdate { .. } => "contact:update",
            Self::ContactDelete { .. } => "contact:delete",
            Self::DomainCheck { .. } => "domain:check",
            Self::DomainInfo { .. } => "domain:info",
            Self::DomainCreate(_) => "domain:create",
            Self::DomainUpdate { .. } => "domain:update",
            Self::DomainDelete { .. } => "domain:delete",
            Self::DomainRestore { .. } => "domain:restore",
            Self::DomainTransfer { .. } => "domain:transfer",
            Self::PollRequest => "poll:req",
            Self::PollAck { .. } => "poll:ack",
        }
    }
}

/// Encode a command as an EPP document.
///
/// `cl_tr_id` is ignored for `Hello`, which carries no transaction ID.
pub fn encode(command: &Command, cl_tr_id: &str) -> Result<String> {
    let mut w = XmlWriter::new();
    w.open("epp", &[("xmlns", NS_EPP)]);

    if let Command::Hello = command {
        w.empty("hello", &[]);
        return w.finish();
    }

    w.open("command", &[]);
    match command {
        Command::Hello => {}
        Command::Login(login) => write_login(&mut w, login),
        Command::Logout => {
            w.empty("logout", &[]);
        }
        Command::ContactCheck { ids } => {
            w.open("check", &[]).open("contact:check", &[("xmlns:contact", NS_CONTACT)]);
            for id in ids {
                w.leaf("contact:id", id);
            }
            w.close().close();
        }
        Command::ContactInfo { id, auth_pw } => {
            w.open("info", &[]).open("contact:info", &[("xmlns:contact", NS_CONTACT)]);
            w.leaf("contact:id", id);
            if let Some(pw) = auth_pw {
                w.open("contact:authInfo", &[]).leaf("contact:pw", pw).close();
            }
            w.close().close();
        }
        Command::ContactCreate(contact) => write_contact_create(&mut w, contact),
        Command::ContactUpdate { id, changes } => write_contact_update(&mut w, id, changes),
        Command::ContactDelete { id } => {
            w.open("delete", &[]).open("contact:delete", &[("xmlns:contact", NS_CONTACT)]);
            w.leaf("contact:id", id).close().close();
        }
        Command::DomainCheck { names } => {
            w.open("check", &[]).open("domain:check", &[("xmlns:domain", NS_DOMAIN)]);
            for name in names {
                w.leaf("domain:name", name);
            }
            w.close().close();
        }
        Command::DomainInfo { name, auth_pw } => {
            w.open("info", &[]).open("domain:info", &[("xmlns:domain", NS_DOMAIN)]);
            w.leaf_with("domain:name", &[("hosts", "all")], name);
            if let Some(pw) = auth_pw {
                w.open("domain:authInfo", &[]).leaf("domain:pw", pw).close();
            }
            w.close().close();
        }
        Command::DomainCreate(domain) => write_domain_create(&mut w, domain),
        Command::DomainUpdate { name, changes } => write_domain_update(&mut w, name, changes),
        Command::DomainDelete { name } => {
            w.open("delete", &[]).open("domain:delete", &[("xmlns:domain", NS_DOMAIN)]);
            w.leaf("domain:name", name).close().close();
        }
        Command::DomainRestore { name } => {
            // RGP requires an update with an empty chg to carry the restore.
            w.open("update", &[]).open("domain:update", &[("xmlns:domain", NS_DOMAIN)]);
            w.leaf("domain:name", name).empty("domain:chg", &[]).close().close();
            w.open("extension", &[]).open("rgp:update", &[("xmlns:rgp", NS_RGP)]);
            w.empty("rgp:restore", &[("op", "request")]).close().close();
        }
        Command::DomainTransfer {
            op,
            name,
            auth_pw,
            trade,
        } => {
            w.open("transfer", &[("op", op.as_str())])
                .open("domain:transfer", &[("xmlns:domain", NS_DOMAIN)]);
            w.leaf("domain:name", name);
            if let Some(pw) = auth_pw {
                w.open("domain:authInfo", &[]).leaf("domain:pw", pw).close();
            }
            w.close().close();
            if let Some(trade) = trade {
                w.open("extension", &[])
                    .open("extdom:trade", &[("xmlns:extdom", NS_EXTDOM)])
                    .open("extdom:transferTrade", &[]);
                w.leaf("extdom:newRegistrant", &trade.new_registrant);
                w.open("extdom:newAuthInfo", &[])
                    .leaf("extdom:pw", &trade.new_auth_pw)
                    .close();
                w.close().close().close();
            }
        }
        Command::PollRequest => {
            w.empty("poll", &[("op", "req")]);
        }
        Command::PollAck { msg_id } => {
            w.empty("poll", &[("op", "ack"), ("msgID", msg_id.as_str())]);
        }
    }
    w.leaf("clTRID", cl_tr_id);
    w.finish()
}

fn write_login(w: &mut XmlWriter, login: &Login) {
    w.open("login", &[]);
    w.leaf("clID", &login.cl_id).leaf("pw", &login.pw);
    w.leaf_opt("newPW", login.new_pw.as_deref());
    w.open("options", &[])
        .leaf("version", &login.version)
        .leaf("lang", &login.lang)
        .close();
    w.open("svcs", &[]);
    for uri in &login.services {
        w.leaf("objURI", uri);
    }
    if !login.extensions.is_empty() {
        w.open("svcExtension", &[]);
        for uri in &login.extensions {
            w.leaf("extURI", uri);
        }
        w.close();
    }
    w.close().close();
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn write_contact_create(w: &mut XmlWriter, c: &Contact) {
    w.open("create", &[]).open("contact:create", &[("xmlns:contact", NS_CONTACT)]);
    w.leaf("contact:id", &c.id);
    w.open("contact:postalInfo", &[("type", "loc")]);
    w.leaf("contact:name", &c.name).leaf_opt("contact:org", c.org.as_deref());
    w.open("contact:addr", &[])
        .leaf_opt("contact:street", c.street.as_deref())
        .leaf_opt("contact:city", c.city.as_deref())
        .leaf_opt("contact:sp", c.sp.as_deref())
        .leaf_opt("contact:pc", c.pc.as_deref())
        .leaf_opt("contact:cc", c.cc.as_deref())
        .close();
    w.close();
    w.leaf_opt("contact:voice", c.voice.as_deref())
        .leaf_opt("contact:fax", c.fax.as_deref())
        .leaf_opt("contact:email", c.email.as_deref());
    w.open("contact:authInfo", &[])
        .leaf("contact:pw", c.auth_info_pw.as_deref().unwrap_or_default())
        .close();
    w.close().close();

    if c.consent_for_publishing.is_some() || c.is_registrant() {
        w.open("extension", &[])
            .open("extcon:create", &[("xmlns:extcon", NS_EXTCON)]);
        if let Some(consent) = c.consent_for_publishing {
            w.leaf("extcon:consentForPublishing", bool_text(consent));
        }
        if c.is_registrant() {
            let entity_type = c.entity_type.map(|t| t.to_string());
            w.open("extcon:registrant", &[])
                .leaf_opt("extcon:nationalityCode", c.nationality_code.as_deref())
                .leaf_opt("extcon:entityType", entity_type.as_deref())
                .leaf_opt("extcon:regCode", c.reg_code.as_deref())
                .close();
        }
        w.close().close();
    }
}

/// `Some(None)` clears a field with an empty element.
fn leaf_change(w: &mut XmlWriter, tag: &str, change: &Option<Option<String>>) {
    match change {
        Some(Some(value)) => {
            w.leaf(tag, value);
        }
        Some(None) => {
            w.empty(tag, &[]);
        }
        None => {}
    }
}

fn write_contact_statuses(w: &mut XmlWriter, tag: &str, members: Option<&ContactMembers>) {
    if let Some(members) = members {
        w.open(tag, &[]);
        for status in &members.statuses {
            w.empty("contact:status", &[("s", status.as_str()), ("lang", "en")]);
        }
        w.close();
    }
}

fn write_contact_update(w: &mut XmlWriter, id: &str, changes: &ContactChangeSet) {
    w.open("update", &[]).open("contact:update", &[("xmlns:contact", NS_CONTACT)]);
    w.leaf("contact:id", id);
    write_contact_statuses(w, "contact:add", changes.add_clause());
    write_contact_statuses(w, "contact:rem", changes.rem_clause());

    let chg = &changes.chg;
    if chg.has_core() {
        w.open("contact:chg", &[]);
        if chg.has_postal_info() {
            w.open("contact:postalInfo", &[("type", "loc")]);
            if let Some(name) = &chg.name {
                w.leaf("contact:name", name);
            }
            leaf_change(w, "contact:org", &chg.org);
            if chg.has_addr() {
                w.open("contact:addr", &[]);
                leaf_change(w, "contact:street", &chg.street);
                leaf_change(w, "contact:city", &chg.city);
                leaf_change(w, "contact:sp", &chg.sp);
                leaf_change(w, "contact:pc", &chg.pc);
                leaf_change(w, "contact:cc", &chg.cc);
                w.close();
            }
            w.close();
        }
        leaf_change(w, "contact:voice", &chg.voice);
        leaf_change(w, "contact:fax", &chg.fax);
        leaf_change(w, "contact:email", &chg.email);
        if let Some(pw) = &chg.auth_info_pw {
            w.open("contact:authInfo", &[])
                .leaf("contact:pw", pw.as_deref().unwrap_or_default())
                .close();
        }
        w.close();
    }
    w.close().close();

    if chg.has_extension() {
        write_contact_update_extension(w, chg);
    }
}

fn write_contact_update_extension(w: &mut XmlWriter, chg: &ContactChg) {
    w.open("extension", &[])
        .open("extcon:update", &[("xmlns:extcon", NS_EXTCON)]);
    if let Some(consent) = chg.consent_for_publishing {
        // Clearing consent is the same as withdrawing it.
        w.leaf(
            "extcon:consentForPublishing",
            bool_text(consent.unwrap_or(false)),
        );
    }
    if chg.has_registrant() {
        let entity_type = chg.entity_type.map(|t| t.map(|t| t.to_string()));
        w.open("extcon:registrant", &[]);
        leaf_change(w, "extcon:nationalityCode", &chg.nationality_code);
        leaf_change(w, "extcon:entityType", &entity_type);
        leaf_change(w, "extcon:regCode", &chg.reg_code);
        w.close();
    }
    w.close().close();
}

fn write_host_attrs(w: &mut XmlWriter, nameservers: &[NameServer]) {
    if nameservers.is_empty() {
        return;
    }
    w.open("domain:ns", &[]);
    for ns in nameservers {
        w.open("domain:hostAttr", &[]).leaf("domain:hostName", &ns.name);
        for addr in &ns.ipv4 {
            w.leaf_with("domain:hostAddr", &[("ip", "v4")], addr);
        }
        for addr in &ns.ipv6 {
            w.leaf_with("domain:hostAddr", &[("ip", "v6")], addr);
        }
        w.close();
    }
    w.close();
}

fn write_domain_contacts(w: &mut XmlWriter, admin: &[String], tech: &[String]) {
    for id in admin {
        w.leaf_with("domain:contact", &[("type", "admin")], id);
    }
    for id in tech {
        w.leaf_with("domain:contact", &[("type", "tech")], id);
    }
}

fn write_domain_create(w: &mut XmlWriter, d: &Domain) {
    w.open("create", &[]).open("domain:create", &[("xmlns:domain", NS_DOMAIN)]);
    w.leaf("domain:name", &d.name);
    if let Some(period) = d.period {
        w.leaf_with("domain:period", &[("unit", "y")], &period.to_string());
    }
    write_host_attrs(w, &d.nameservers);
    w.leaf_opt("domain:registrant", d.registrant.as_deref());
    write_domain_contacts(w, &d.admin_contacts, &d.tech_contacts);
    w.open("domain:authInfo", &[])
        .leaf("domain:pw", d.auth_info_pw.as_deref().unwrap_or_default())
        .close();
    w.close().close();
}

fn write_domain_members(w: &mut XmlWriter, tag: &str, members: Option<&DomainMembers>) {
    if let Some(members) = members {
        w.open(tag, &[]);
        write_host_attrs(w, &members.nameservers);
        write_domain_contacts(w, &members.admin_contacts, &members.tech_contacts);
        for status in &members.statuses {
            w.empty("domain:status", &[("s", status.as_str()), ("lang", "en")]);
        }
        w.close();
    }
}

fn write_domain_update(w: &mut XmlWriter, name: &str, changes: &DomainChangeSet) {
    w.open("update", &[]).open("domain:update", &[("xmlns:domain", NS_DOMAIN)]);
    w.leaf("domain:name", name);
    write_domain_members(w, "domain:add", changes.add_clause());
    write_domain_members(w, "domain:rem", changes.rem_clause());
    if let Some(chg) = changes.chg_clause() {
        w.open("domain:chg", &[]);
        leaf_change(w, "domain:registrant", &chg.registrant);
        if let Some(pw) = &chg.auth_info_pw {
            w.open("domain:authInfo", &[])
                .leaf("domain:pw", pw.as_deref().unwrap_or_default())
                .close();
        }
        w.close();
    }
    w.close().close();
}
