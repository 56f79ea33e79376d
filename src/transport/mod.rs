//! Transport layer.
//!
//! A [`Transport`] moves one XML document to the registry and brings the
//! reply back. It knows nothing about EPP state: the [`Channel`] wrapped
//! around it carries the session cookies, writes the audit log and enforces
//! the per-request deadline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                Session                   │
//! └──────────────────┬──────────────────────┘
//!                    │ send(xml)
//! ┌──────────────────▼──────────────────────┐
//! │   Channel: cookies · audit · deadline    │
//! └──────────────────┬──────────────────────┘
//!          ┌────────┴────────┐
//!          ▼                 ▼
//! ┌─────────────────┐ ┌───────────────────┐
//! │  HttpTransport  │ │ ScriptedTransport │
//! │    (reqwest)    │ │     (tests)       │
//! └─────────────────┘ └───────────────────┘
//! ```

mod audit;
mod cookie;
mod http;
pub mod mock;

pub use audit::{AuditLog, Direction};
pub use cookie::CookieSet;
pub use http::{HttpTransport, HttpTransportConfig, DEFAULT_USER_AGENT};

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Body and cookies of one registry reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Response document
    pub body: String,
    /// Cookies from `Set-Cookie`, `None` when the reply set none
    pub set_cookie: Option<CookieSet>,
}

impl RawResponse {
    /// Reply without cookies.
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            set_cookie: None,
        }
    }

    /// Reply that sets `cookies`.
    pub fn with_cookies(mut self, cookies: CookieSet) -> Self {
        self.set_cookie = Some(cookies);
        self
    }
}

/// Transport trait for pluggable network backends.
pub trait Transport: Send {
    /// Acquire the connection. Idempotent.
    fn connect(&mut self) -> std::result::Result<(), TransportError>;

    /// Release the connection. Idempotent.
    fn disconnect(&mut self);

    /// Send one document carrying `cookies` and return the reply.
    fn post<'a>(
        &'a mut self,
        body: String,
        cookies: &'a CookieSet,
    ) -> Pin<Box<dyn Future<Output = std::result::Result<RawResponse, TransportError>> + Send + 'a>>;

    /// Get the transport name for logging.
    fn name(&self) -> &'static str;
}

/// Outcome of [`Channel::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Response document
    pub body: String,
    /// The registry replaced the session cookies
    pub cookies_changed: bool,
}

/// A transport plus the per-session state that rides on every request.
#[derive(Debug)]
pub struct Channel<T> {
    transport: T,
    cookies: CookieSet,
    audit: AuditLog,
    deadline: Duration,
}

impl<T: Transport> Channel<T> {
    /// Wrap `transport`, starting with `cookies` restored from a store.
    pub fn new(transport: T, cookies: CookieSet, audit: AuditLog, deadline: Duration) -> Self {
        Self {
            transport,
            cookies,
            audit,
            deadline,
        }
    }

    /// Cookies currently held.
    pub fn cookies(&self) -> &CookieSet {
        &self.cookies
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Audit log, for capture control.
    pub fn audit_mut(&mut self) -> &mut AuditLog {
        &mut self.audit
    }

    /// Acquire the transport connection.
    pub fn connect(&mut self) -> Result<()> {
        self.transport.connect()?;
        Ok(())
    }

    /// Release the transport connection.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
    }

    /// Drop and re-acquire the connection after a failure.
    pub fn reconnect(&mut self) -> Result<()> {
        tracing::debug!(transport = self.transport.name(), "Reconnecting");
        self.transport.disconnect();
        self.connect()
    }

    /// Send one document and return the reply.
    ///
    /// When the reply carries a cookie set different from the one held, the
    /// held set is replaced and [`Exchange::cookies_changed`] is set.
    pub async fn send(&mut self, body: String) -> Result<Exchange> {
        self.audit.record(Direction::Out, &self.cookies, &body)?;
        let sent = body.len();

        let raw = tokio::time::timeout(self.deadline, self.transport.post(body, &self.cookies))
            .await
            .map_err(|_| TransportError::Timeout(self.deadline))??;

        self.audit.record(Direction::In, &self.cookies, &raw.body)?;
        tracing::debug!(sent, received = raw.body.len(), "Exchange complete");

        let cookies_changed = match raw.set_cookie {
            Some(cookies) if cookies != self.cookies => {
                tracing::debug!(old = %self.cookies, new = %cookies, "Session cookies replaced");
                self.cookies = cookies;
                true
            }
            _ => false,
        };

        Ok(Exchange {
            body: raw.body,
            cookies_changed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::mock::ScriptedTransport;
    use super::*;

    fn channel(script: &ScriptedTransport) -> Channel<ScriptedTransport> {
        Channel::new(
            script.clone(),
            CookieSet::new(),
            AuditLog::new(None),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_send_tracks_cookie_change() {
        let script = ScriptedTransport::new();
        let sid = CookieSet::from_set_cookie(["sid=1"]);
        script.push_reply(RawResponse::new("<a/>").with_cookies(sid.clone()));
        script.push_reply(RawResponse::new("<b/>").with_cookies(sid.clone()));
        script.push_reply(RawResponse::new("<c/>"));

        let mut channel = channel(&script);
        assert!(channel.send("<x/>".into()).await.unwrap().cookies_changed);
        assert!(!channel.send("<y/>".into()).await.unwrap().cookies_changed);
        assert!(!channel.send("<z/>".into()).await.unwrap().cookies_changed);
        assert_eq!(channel.cookies(), &sid);

        let sent = script.requests();
        assert!(sent[0].cookies.is_empty());
        assert_eq!(sent[1].cookies, sid);
    }

    #[tokio::test]
    async fn test_send_propagates_failure() {
        let script = ScriptedTransport::new();
        script.push_failure(TransportError::ConnectionLost("reset".into()));

        let mut channel = channel(&script);
        let err = channel.send("<x/>".into()).await.unwrap_err();
        assert!(err.is_retryable_transport());
    }

    #[tokio::test]
    async fn test_reconnect_cycles_transport() {
        let script = ScriptedTransport::new();
        let mut channel = channel(&script);
        channel.reconnect().unwrap();
        assert_eq!(script.disconnects(), 1);
        assert_eq!(script.connects(), 1);
    }

    #[tokio::test]
    async fn test_deadline_is_timeout() {
        let script = ScriptedTransport::new().with_delay(Duration::from_millis(200));
        script.push_reply(RawResponse::new("<late/>"));

        let mut channel = Channel::new(
            script,
            CookieSet::new(),
            AuditLog::new(None),
            Duration::from_millis(20),
        );
        let err = channel.send("<x/>".into()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::EppError::Transport(TransportError::Timeout(_))
        ));
        assert!(!err.is_retryable_transport());
    }
}
