//! Scripted in-memory transport for tests.
//!
//! ```rust,ignore
//! use epp::transport::mock::{self, ScriptedTransport};
//!
//! let script = ScriptedTransport::new();
//! script.push_body(mock::greeting());
//! script.push_body(mock::response(1000, None));
//! // hand `script.clone()` to a Session, then inspect `script.requests()`
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{CookieSet, RawResponse, Transport};
use crate::error::TransportError;

/// A request as seen by the scripted transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRequest {
    /// Request document
    pub body: String,
    /// Cookies carried
    pub cookies: CookieSet,
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<Result<RawResponse, TransportError>>,
    sent: Vec<SentRequest>,
    connects: usize,
    disconnects: usize,
}

/// Transport that replays queued replies and records every request.
///
/// Clones share the same script, so a test can keep one handle while the
/// session owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    /// Empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before each reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a reply.
    pub fn push_reply(&self, reply: RawResponse) {
        self.lock().replies.push_back(Ok(reply));
    }

    /// Queue a reply body without cookies.
    pub fn push_body(&self, body: impl Into<String>) {
        self.push_reply(RawResponse::new(body));
    }

    /// Queue a transport failure.
    pub fn push_failure(&self, err: TransportError) {
        self.lock().replies.push_back(Err(err));
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<SentRequest> {
        self.lock().sent.clone()
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> usize {
        self.lock().sent.len()
    }

    /// Replies still queued.
    pub fn pending(&self) -> usize {
        self.lock().replies.len()
    }

    /// Calls to [`Transport::connect`].
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Calls to [`Transport::disconnect`].
    pub fn disconnects(&self) -> usize {
        self.lock().disconnects
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.lock().connects += 1;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.lock().disconnects += 1;
    }

    fn post<'a>(
        &'a mut self,
        body: String,
        cookies: &'a CookieSet,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let reply = {
                let mut script = self.lock();
                script.sent.push(SentRequest {
                    body,
                    cookies: cookies.clone(),
                });
                script.replies.pop_front()
            };
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            reply.unwrap_or_else(|| Err(TransportError::Client("script exhausted".to_string())))
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A `<greeting>` document.
pub fn greeting() -> String {
    r#"<?xml version="1.0" encoding="UTF-8"?><epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><greeting><svID>Scripted Registry</svID><svDate>2024-01-01T00:00:00.000Z</svDate></greeting></epp>"#
        .to_string()
}

/// A `<response>` with `code` and an optional registry reason code.
pub fn response(code: u32, reason_code: Option<u32>) -> ResponseXml {
    ResponseXml {
        code,
        reason_code,
        res_data: None,
        msg_q: None,
    }
}

/// Response document under construction; `Display`s as XML.
#[derive(Debug, Clone)]
pub struct ResponseXml {
    code: u32,
    reason_code: Option<u32>,
    res_data: Option<String>,
    msg_q: Option<String>,
}

impl ResponseXml {
    /// Attach raw `<resData>` content.
    pub fn res_data(mut self, xml: impl Into<String>) -> Self {
        self.res_data = Some(xml.into());
        self
    }

    /// Attach a message queue head.
    pub fn msg_q(mut self, count: u32, id: &str, msg: &str) -> Self {
        self.msg_q = Some(format!(
            r#"<msgQ count="{count}" id="{id}"><qDate>2024-01-01T00:00:00.000Z</qDate><msg>{msg}</msg></msgQ>"#
        ));
        self
    }
}

impl fmt::Display for ResponseXml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"<?xml version="1.0" encoding="UTF-8"?><epp xmlns="urn:ietf:params:xml:ns:epp-1.0"><response><result code="{}"><msg>scripted</msg>"#,
            self.code
        )?;
        if let Some(reason) = self.reason_code {
            write!(
                f,
                r#"<extValue><value><extepp:reasonCode xmlns:extepp="http://www.nic.it/ITNIC-EPP/extepp-2.0">{reason}</extepp:reasonCode></value><reason>scripted</reason></extValue>"#
            )?;
        }
        f.write_str("</result>")?;
        if let Some(msg_q) = &self.msg_q {
            f.write_str(msg_q)?;
        }
        if let Some(res_data) = &self.res_data {
            write!(f, "<resData>{res_data}</resData>")?;
        }
        f.write_str("<trID><clTRID>scripted</clTRID><svTRID>SV-1</svTRID></trID></response></epp>")
    }
}

impl From<ResponseXml> for String {
    fn from(xml: ResponseXml) -> Self {
        xml.to_string()
    }
}
