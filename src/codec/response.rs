//! Response decoding.

use chrono::{DateTime, FixedOffset};

use super::xml::{parse, Node};
use crate::error::{EppError, ProtocolError, Result};
use crate::model::{
    CheckItem, CheckResult, Contact, CreateReceipt, Domain, EppResult, Greeting, MessageQueue,
    NameServer, ObjectMeta, TransferReceipt,
};

/// A decoded EPP document.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Answer to `<hello/>`
    Greeting(Greeting),
    /// Answer to a `<command>`
    Response(EppResponse),
}

/// Decoded `<response>`.
///
/// The result line, queue and transaction IDs are decoded eagerly; the
/// operation payload is extracted on demand by the typed accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct EppResponse {
    /// First `<result>` of the response
    pub result: EppResult,
    /// Message queue head, when present
    pub queue: Option<MessageQueue>,
    /// Echoed client transaction ID
    pub cl_tr_id: Option<String>,
    /// Server transaction ID
    pub sv_tr_id: Option<String>,
    res_data: Option<Node>,
    extension: Option<Node>,
}

/// Decode an EPP document.
pub fn decode(xml: &str) -> Result<Frame> {
    let root = parse(xml)?;
    if root.name != "epp" {
        return Err(EppError::Codec(format!("unexpected root <{}>", root.name)));
    }

    if let Some(greeting) = root.child("greeting") {
        return Ok(Frame::Greeting(Greeting {
            server_id: greeting.child_text("svID"),
            server_date: greeting.child_text("svDate"),
        }));
    }

    let response = root
        .child("response")
        .ok_or_else(|| EppError::Codec("document has neither greeting nor response".to_string()))?;
    Ok(Frame::Response(decode_response(response)?))
}

fn decode_response(response: &Node) -> Result<EppResponse> {
    let result = response
        .child("result")
        .ok_or_else(|| EppError::Codec("response without result".to_string()))?;
    let code = result
        .attr("code")
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| EppError::Codec("result without numeric code".to_string()))?;
    let reason_code = result
        .children_named("extValue")
        .find_map(|ext| ext.find("reasonCode"))
        .and_then(|node| node.text().parse().ok());

    let queue = match response.child("msgQ") {
        Some(msgq) => Some(MessageQueue {
            count: msgq.attr("count").and_then(|c| c.parse().ok()).unwrap_or(0),
            id: msgq.attr("id").unwrap_or_default().to_string(),
            queued_at: date(msgq, "qDate")?,
            message: msgq.child_text("msg"),
        }),
        None => None,
    };

    let tr_id = response.child("trID");
    Ok(EppResponse {
        result: EppResult {
            code,
            message: result.child_text("msg").unwrap_or_default(),
            reason_code,
        },
        queue,
        cl_tr_id: tr_id.and_then(|t| t.child_text("clTRID")),
        sv_tr_id: tr_id.and_then(|t| t.child_text("svTRID")),
        res_data: response.child("resData").cloned(),
        extension: response.child("extension").cloned(),
    })
}

fn date(node: &Node, name: &str) -> Result<Option<DateTime<FixedOffset>>> {
    node.child_text(name)
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map_err(|e| EppError::Codec(format!("bad <{name}> date {text:?}: {e}")))
        })
        .transpose()
}

fn attr_bool(node: &Node, name: &str) -> bool {
    matches!(node.attr(name), Some("1" | "true"))
}

impl EppResponse {
    fn res_data(&self, name: &str) -> Result<&Node> {
        self.res_data
            .as_ref()
            .and_then(|rd| rd.child(name))
            .ok_or_else(|| EppError::Codec(format!("response has no <{name}> payload")))
    }

    fn ext(&self, name: &str) -> Option<&Node> {
        self.extension.as_ref().and_then(|ext| ext.child(name))
    }

    /// The result as a [`ProtocolError`] when its code is in the error family.
    pub fn error(&self) -> Option<ProtocolError> {
        (!self.result.is_success()).then(|| ProtocolError {
            code: self.result.code,
            message: self.result.message.clone(),
            reason_code: self.result.reason_code,
        })
    }

    /// `<chkData>` of a contact or domain check.
    pub fn check_result(&self) -> Result<CheckResult> {
        let items = self
            .res_data("chkData")?
            .children_named("cd")
            .filter_map(|cd| {
                let id = cd.child("id").or_else(|| cd.child("name"))?;
                Some(CheckItem {
                    id: id.text().to_string(),
                    avail: attr_bool(id, "avail"),
                    reason: cd.child_text("reason"),
                })
            })
            .collect();
        Ok(CheckResult { items })
    }

    /// `<creData>` of a contact or domain create.
    pub fn create_receipt(&self) -> Result<CreateReceipt> {
        let data = self.res_data("creData")?;
        let id = data
            .child_text("id")
            .or_else(|| data.child_text("name"))
            .ok_or_else(|| EppError::Codec("creData without id".to_string()))?;
        Ok(CreateReceipt {
            id,
            cr_date: date(data, "crDate")?,
            ex_date: date(data, "exDate")?,
        })
    }

    /// `<trnData>` of a domain transfer.
    pub fn transfer_receipt(&self) -> Result<TransferReceipt> {
        let data = self.res_data("trnData")?;
        Ok(TransferReceipt {
            name: data.child_text("name").unwrap_or_default(),
            tr_status: data.child_text("trStatus").unwrap_or_default(),
            re_id: data.child_text("reID"),
            re_date: date(data, "reDate")?,
            ac_id: data.child_text("acID"),
            ac_date: date(data, "acDate")?,
            ex_date: date(data, "exDate")?,
        })
    }

    /// `<infData>` of a contact info, with the registry contact extension.
    pub fn contact_info(&self) -> Result<Contact> {
        let data = self.res_data("infData")?;
        let postal = data.child("postalInfo");
        let addr = postal.and_then(|p| p.child("addr"));
        let text = |node: Option<&Node>, name: &str| node.and_then(|n| n.child_text(name));

        let mut contact = Contact {
            id: data.child_text("id").unwrap_or_default(),
            statuses: statuses(data, "status"),
            name: text(postal, "name").unwrap_or_default(),
            org: text(postal, "org"),
            street: text(addr, "street"),
            city: text(addr, "city"),
            sp: text(addr, "sp"),
            pc: text(addr, "pc"),
            cc: text(addr, "cc"),
            voice: data.child_text("voice"),
            fax: data.child_text("fax"),
            email: data.child_text("email"),
            auth_info_pw: data.path(&["authInfo", "pw"]).map(|n| n.text().to_string()),
            meta: meta(data)?,
            ..Default::default()
        };

        if let Some(ext) = self.ext("infData") {
            contact.consent_for_publishing = ext
                .child_text("consentForPublishing")
                .map(|v| v == "true" || v == "1");
            if let Some(registrant) = ext.child("registrant") {
                contact.nationality_code = registrant.child_text("nationalityCode");
                contact.entity_type = registrant
                    .child_text("entityType")
                    .and_then(|t| t.parse().ok());
                contact.reg_code = registrant.child_text("regCode");
            }
        }
        Ok(contact)
    }

    /// `<infData>` of a domain info, with RGP and registry extension statuses.
    pub fn domain_info(&self) -> Result<Domain> {
        let data = self.res_data("infData")?;
        let contacts = |kind: &str| -> Vec<String> {
            data.children_named("contact")
                .filter(|c| c.attr("type") == Some(kind))
                .map(|c| c.text().to_string())
                .collect()
        };

        let mut domain = Domain {
            name: data.child_text("name").unwrap_or_default(),
            statuses: statuses(data, "status"),
            registrant: data.child_text("registrant"),
            admin_contacts: contacts("admin"),
            tech_contacts: contacts("tech"),
            nameservers: data.child("ns").map(nameservers).unwrap_or_default(),
            auth_info_pw: data.path(&["authInfo", "pw"]).map(|n| n.text().to_string()),
            meta: meta(data)?,
            ..Default::default()
        };

        if let Some(ext) = self.extension.as_ref() {
            for inf in ext.children_named("infData") {
                domain
                    .registry_statuses
                    .extend(statuses(inf, "rgpStatus").into_iter().map(|s| format!("rgp:{s}")));
                domain
                    .registry_statuses
                    .extend(statuses(inf, "ownStatus").into_iter().map(|s| format!("extdom:{s}")));
            }
            if let Some(pending) = ext.child("infNsToValidateData") {
                domain.nameservers_to_validate = pending
                    .children_named("nsToValidate")
                    .flat_map(nameservers)
                    .collect();
            }
        }
        Ok(domain)
    }
}

fn statuses(node: &Node, name: &str) -> Vec<String> {
    node.children_named(name)
        .filter_map(|s| s.attr("s"))
        .map(str::to_string)
        .collect()
}

fn nameservers(ns: &Node) -> Vec<NameServer> {
    let mut out: Vec<NameServer> = ns
        .children_named("hostAttr")
        .map(|host| {
            let addrs = |ip: &str| -> Vec<String> {
                host.children_named("hostAddr")
                    .filter(|a| a.attr("ip").unwrap_or("v4") == ip)
                    .map(|a| a.text().to_string())
                    .collect()
            };
            NameServer {
                name: host.child_text("hostName").unwrap_or_default(),
                ipv4: addrs("v4"),
                ipv6: addrs("v6"),
            }
        })
        .collect();
    out.extend(
        ns.children_named("hostObj")
            .map(|host| NameServer::new(host.text())),
    );
    out
}

fn meta(data: &Node) -> Result<ObjectMeta> {
    Ok(ObjectMeta {
        roid: data.child_text("roid"),
        cl_id: data.child_text("clID"),
        cr_id: data.child_text("crID"),
        cr_date: date(data, "crDate")?,
        up_id: data.child_text("upID"),
        up_date: date(data, "upDate")?,
        ex_date: date(data, "exDate")?,
        tr_date: date(data, "trDate")?,
    })
}
