//! Typed object operations, all sent through [`Session::dispatch`].

use super::{Session, SessionStore};
use crate::codec::{Command, EppResponse, Trade};
use crate::diff::{diff, ContactChangeSet, DomainChangeSet};
use crate::error::{EppError, Result};
use crate::model::{
    CheckResult, Contact, CreateReceipt, Domain, PollOutcome, Reply, TransferOp, TransferReceipt,
};
use crate::transport::Transport;

fn extract<U>(
    reply: Reply<EppResponse>,
    f: impl FnOnce(&EppResponse) -> Result<U>,
) -> Result<Reply<U>> {
    let data = f(&reply.data)?;
    Ok(reply.map(|_| data))
}

impl<T: Transport, S: SessionStore> Session<T, S> {
    async fn send_unit(&mut self, command: Command) -> Result<Reply<()>> {
        Ok(self.dispatch(&command).await?.map(|_| ()))
    }

    /// Check contact handle availability.
    pub async fn contact_check(&mut self, ids: &[&str]) -> Result<Reply<CheckResult>> {
        let command = Command::ContactCheck {
            ids: ids.iter().map(|id| id.to_string()).collect(),
        };
        extract(self.dispatch(&command).await?, EppResponse::check_result)
    }

    /// Fetch a contact snapshot.
    pub async fn contact_info(&mut self, id: &str, auth_pw: Option<&str>) -> Result<Reply<Contact>> {
        let command = Command::ContactInfo {
            id: id.to_string(),
            auth_pw: auth_pw.map(str::to_string),
        };
        extract(self.dispatch(&command).await?, EppResponse::contact_info)
    }

    /// Create a contact.
    pub async fn contact_create(&mut self, contact: &Contact) -> Result<Reply<CreateReceipt>> {
        let command = Command::ContactCreate(Box::new(contact.clone()));
        extract(self.dispatch(&command).await?, EppResponse::create_receipt)
    }

    /// Apply a contact change-set.
    pub async fn contact_update(&mut self, id: &str, changes: &ContactChangeSet) -> Result<Reply<()>> {
        self.send_unit(Command::ContactUpdate {
            id: id.to_string(),
            changes: Box::new(changes.clone()),
        })
        .await
    }

    /// Update a contact from two snapshots, sending only what changed.
    pub async fn contact_update_with_old(&mut self, old: &Contact, new: &Contact) -> Result<Reply<()>> {
        if old.id != new.id {
            return Err(EppError::Usage(format!(
                "cannot diff contact {} against {}",
                old.id, new.id
            )));
        }
        self.contact_update(&new.id, &diff(old, new)).await
    }

    /// Delete a contact.
    pub async fn contact_delete(&mut self, id: &str) -> Result<Reply<()>> {
        self.send_unit(Command::ContactDelete { id: id.to_string() }).await
    }

    /// Check domain availability.
    pub async fn domain_check(&mut self, names: &[&str]) -> Result<Reply<CheckResult>> {
        let command = Command::DomainCheck {
            names: names.iter().map(|n| n.to_string()).collect(),
        };
        extract(self.dispatch(&command).await?, EppResponse::check_result)
    }

    /// Fetch a domain snapshot.
    pub async fn domain_info(&mut self, name: &str, auth_pw: Option<&str>) -> Result<Reply<Domain>> {
        let command = Command::DomainInfo {
            name: name.to_string(),
            auth_pw: auth_pw.map(str::to_string),
        };
        extract(self.dispatch(&command).await?, EppResponse::domain_info)
    }

    /// Register a domain.
    pub async fn domain_create(&mut self, domain: &Domain) -> Result<Reply<CreateReceipt>> {
        let command = Command::DomainCreate(Box::new(domain.clone()));
        extract(self.dispatch(&command).await?, EppResponse::create_receipt)
    }

    /// Apply a domain change-set.
    pub async fn domain_update(&mut self, name: &str, changes: &DomainChangeSet) -> Result<Reply<()>> {
        self.send_unit(Command::DomainUpdate {
            name: name.to_string(),
            changes: Box::new(changes.clone()),
        })
        .await
    }

    /// Update a domain from two snapshots, sending only what changed.
    pub async fn domain_update_with_old(&mut self, old: &Domain, new: &Domain) -> Result<Reply<()>> {
        if !old.name.eq_ignore_ascii_case(&new.name) {
            return Err(EppError::Usage(format!(
                "cannot diff domain {} against {}",
                old.name, new.name
            )));
        }
        self.domain_update(&new.name, &diff(old, new)).await
    }

    /// Delete a domain.
    pub async fn domain_delete(&mut self, name: &str) -> Result<Reply<()>> {
        self.send_unit(Command::DomainDelete {
            name: name.to_string(),
        })
        .await
    }

    /// Request restore of a domain in redemption.
    pub async fn domain_restore(&mut self, name: &str) -> Result<Reply<()>> {
        self.send_unit(Command::DomainRestore {
            name: name.to_string(),
        })
        .await
    }

    /// Run any transfer operation.
    pub async fn domain_transfer(
        &mut self,
        op: TransferOp,
        name: &str,
        auth_pw: Option<&str>,
        trade: Option<Trade>,
    ) -> Result<Reply<TransferReceipt>> {
        if trade.is_some() && op != TransferOp::Request {
            return Err(EppError::Usage(format!(
                "registrant trade only applies to transfer request, not {op}"
            )));
        }
        let command = Command::DomainTransfer {
            op,
            name: name.to_string(),
            auth_pw: auth_pw.map(str::to_string),
            trade,
        };
        extract(self.dispatch(&command).await?, EppResponse::transfer_receipt)
    }

    /// Query a pending transfer.
    pub async fn domain_transfer_query(&mut self, name: &str, auth_pw: Option<&str>) -> Result<Reply<TransferReceipt>> {
        self.domain_transfer(TransferOp::Query, name, auth_pw, None).await
    }

    /// Request a transfer, optionally trading the registrant.
    pub async fn domain_transfer_request(
        &mut self,
        name: &str,
        auth_pw: &str,
        trade: Option<Trade>,
    ) -> Result<Reply<TransferReceipt>> {
        self.domain_transfer(TransferOp::Request, name, Some(auth_pw), trade)
            .await
    }

    /// Cancel our own transfer request.
    pub async fn domain_transfer_cancel(&mut self, name: &str) -> Result<Reply<TransferReceipt>> {
        self.domain_transfer(TransferOp::Cancel, name, None, None).await
    }

    /// Approve an incoming transfer.
    pub async fn domain_transfer_approve(&mut self, name: &str) -> Result<Reply<TransferReceipt>> {
        self.domain_transfer(TransferOp::Approve, name, None, None).await
    }

    /// Reject an incoming transfer.
    pub async fn domain_transfer_reject(&mut self, name: &str) -> Result<Reply<TransferReceipt>> {
        self.domain_transfer(TransferOp::Reject, name, None, None).await
    }

    /// Read the head of the message queue.
    ///
    /// With `silence_empty` (or `silence_empty_polls` in the options) the
    /// exchange reaches the audit log only when a message came back or the
    /// call failed.
    pub async fn poll(&mut self, silence_empty: bool) -> Result<Reply<PollOutcome>> {
        let silence = silence_empty || self.options.silence_empty_polls;
        if silence {
            self.channel.audit_mut().begin_capture();
        }

        let result = self.dispatch(&Command::PollRequest).await;

        if silence {
            let keep = match &result {
                Ok(reply) => reply.data.queue.is_some(),
                Err(_) => true,
            };
            self.channel.audit_mut().end_capture(keep)?;
        }

        let reply = result?;
        let queue = reply.data.queue.clone();
        Ok(reply.map(|_| PollOutcome { queue }))
    }

    /// Acknowledge (dequeue) a message.
    pub async fn ack(&mut self, msg_id: &str) -> Result<Reply<PollOutcome>> {
        let reply = self
            .dispatch(&Command::PollAck {
                msg_id: msg_id.to_string(),
            })
            .await?;
        let queue = reply.data.queue.clone();
        Ok(reply.map(|_| PollOutcome { queue }))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::NameServer;
    use crate::session::{MemoryStore, ProtocolState, Session, SessionOptions, StoredSession};
    use crate::transport::mock::{self, ScriptedTransport};
    use crate::transport::CookieSet;
    use crate::{Contact, Domain, EppError};

    fn logged_in(script: &ScriptedTransport) -> Session<ScriptedTransport, MemoryStore> {
        let store = MemoryStore::with(StoredSession {
            cookies: CookieSet::from_set_cookie(["sid=1"]),
            state: ProtocolState::LoggedIn,
        });
        Session::new(script.clone(), store, SessionOptions::new("REG-A", "pw")).unwrap()
    }

    #[tokio::test]
    async fn test_domain_check_typed() {
        let script = ScriptedTransport::new();
        script.push_body(mock::response(1000, None).res_data(
            r#"<domain:chkData xmlns:domain="urn:ietf:params:xml:ns:domain-1.0"><domain:cd><domain:name avail="true">free.it</domain:name></domain:cd></domain:chkData>"#,
        ));
        let mut session = logged_in(&script);

        let reply = session.domain_check(&["free.it"]).await.unwrap();
        assert_eq!(reply.data.is_available("free.it"), Some(true));
        assert_eq!(reply.sv_tr_id.as_deref(), Some("SV-1"));
        assert!(script.requests()[0].body.contains("<domain:name>free.it</domain:name>"));
    }

    #[tokio::test]
    async fn test_update_with_old_sends_only_changes() {
        let script = ScriptedTransport::new();
        script.push_body(mock::response(1000, None));
        let mut session = logged_in(&script);

        let mut old = Domain::new("example.it");
        old.statuses = vec!["A".into(), "B".into()];
        old.nameservers = vec![NameServer::new("ns1.example.it")];
        let mut new = old.clone();
        new.statuses = vec!["B".into(), "C".into()];

        session.domain_update_with_old(&old, &new).await.unwrap();
        let body = &script.requests()[0].body;
        assert!(body.contains(r#"<domain:add><domain:status s="C" lang="en"/></domain:add>"#));
        assert!(body.contains(r#"<domain:rem><domain:status s="A" lang="en"/></domain:rem>"#));
        assert!(!body.contains("domain:chg"));
        assert!(!body.contains("domain:ns"));
    }

    #[tokio::test]
    async fn test_update_with_old_rejects_different_objects() {
        let script = ScriptedTransport::new();
        let mut session = logged_in(&script);
        let err = session
            .contact_update_with_old(&Contact::new("A", "x"), &Contact::new("B", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EppError::Usage(_)));
        assert_eq!(script.request_count(), 0);
    }

    #[tokio::test]
    async fn test_trade_only_on_request() {
        let script = ScriptedTransport::new();
        let mut session = logged_in(&script);
        let trade = crate::codec::Trade {
            new_registrant: "R2".into(),
            new_auth_pw: "pw2".into(),
        };
        let err = session
            .domain_transfer(crate::TransferOp::Approve, "a.it", None, Some(trade))
            .await
            .unwrap_err();
        assert!(matches!(err, EppError::Usage(_)));
    }

    #[tokio::test]
    async fn test_poll_reports_queue() {
        let script = ScriptedTransport::new();
        script.push_body(mock::response(1301, None).msg_q(2, "42", "Transfer approved"));
        script.push_body(mock::response(1000, None).msg_q(1, "43", "next"));
        let mut session = logged_in(&script);

        let polled = session.poll(false).await.unwrap();
        let queue = polled.data.queue.unwrap();
        assert_eq!(queue.id, "42");
        assert_eq!(queue.count, 2);

        let acked = session.ack(&queue.id).await.unwrap();
        assert!(acked.data.has_message());
        assert!(script.requests()[1].body.contains(r#"<poll op="ack" msgID="42"/>"#));
    }

    #[tokio::test]
    async fn test_silenced_empty_poll_not_audited() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("xml.log");
        let script = ScriptedTransport::new();
        script.push_body(mock::response(1300, None));
        script.push_body(mock::response(1301, None).msg_q(1, "7", "hello"));
        script.push_failure(crate::TransportError::HttpStatus(500));

        let store = MemoryStore::with(StoredSession {
            cookies: CookieSet::new(),
            state: ProtocolState::LoggedIn,
        });
        let options = SessionOptions::new("REG-A", "pw").with_xml_log(&log);
        let mut session = Session::new(script.clone(), store, options).unwrap();

        session.poll(true).await.unwrap();
        assert!(!log.exists());

        session.poll(true).await.unwrap();
        let text = std::fs::read_to_string(&log).unwrap();
        assert_eq!(text.matches("<!-- END -->").count(), 2);
        assert!(text.contains(r#"msgQ count="1""#));

        assert!(session.poll(true).await.is_err());
        let text = std::fs::read_to_string(&log).unwrap();
        assert_eq!(text.matches(" OUT ").count(), 2);
    }
}
