//! EPP session state machine.
//!
//! A [`Session`] owns a transport [`Channel`] and a [`SessionStore`]. Every
//! public operation runs through one bounded retry loop:
//!
//! 1. ask [`SessionHandling::plan`] which of hello / login / the operation
//!    itself must be sent from the current state,
//! 2. send them in order,
//! 3. on failure, classify the error against a per-call [`RetryBudget`]:
//!    a lost connection reconnects and restarts at step 1, an expired
//!    registry session restarts at step 1 from `New` (auto handling only),
//!    anything else is returned.
//!
//! Each budget allows exactly one retry per top-level call. The transport
//! budget is shared by every request the call sends, including the hello
//! and login of a relogin.

mod ops;
mod state;
mod store;

pub use state::{Operation, Plan, ProtocolState, SessionHandling};
pub use store::{FileStore, MemoryStore, SessionStore, StoredSession};

use std::path::PathBuf;
use std::time::Duration;

use crate::codec::{self, Command, EppResponse, Frame, Login};
use crate::error::{EppError, ProtocolError, Result};
use crate::model::{Greeting, Reply};
use crate::transport::{AuditLog, Channel, CookieSet, Transport};

/// Default object services announced at login.
pub const DEFAULT_SERVICES: &[&str] = &[
    "urn:ietf:params:xml:ns:contact-1.0",
    "urn:ietf:params:xml:ns:domain-1.0",
    "urn:ietf:params:xml:ns:host-1.0",
];

/// Session parameters that are not transport concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Registrar tag (login `clID`)
    pub tag: String,
    /// Registrar password
    pub password: String,
    /// Policy
    pub handling: SessionHandling,
    /// Prefix of every client transaction ID
    pub cl_tr_id_prefix: String,
    /// Login `lang`
    pub lang: String,
    /// Login `version`
    pub version: String,
    /// Login object services
    pub services: Vec<String>,
    /// Login extension services
    pub extensions: Vec<String>,
    /// Audit every poll only when it returns a message
    pub silence_empty_polls: bool,
    /// XML audit log
    pub xml_log_file: Option<PathBuf>,
    /// Per-request deadline
    pub request_timeout: Duration,
}

impl SessionOptions {
    /// Defaults for a registrar credential.
    pub fn new(tag: impl Into<String>, password: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            cl_tr_id_prefix: format!("{tag}-"),
            tag,
            password: password.into(),
            handling: SessionHandling::Auto,
            lang: "en".to_string(),
            version: "1.0".to_string(),
            services: DEFAULT_SERVICES.iter().map(|s| s.to_string()).collect(),
            extensions: Vec::new(),
            silence_empty_polls: false,
            xml_log_file: None,
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Set session handling policy.
    pub fn with_handling(mut self, handling: SessionHandling) -> Self {
        self.handling = handling;
        self
    }

    /// Set the client transaction ID prefix.
    pub fn with_cl_tr_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cl_tr_id_prefix = prefix.into();
        self
    }

    /// Set the XML audit log file.
    pub fn with_xml_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.xml_log_file = Some(path.into());
        self
    }

    /// Set the per-request deadline.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Add a login extension URI.
    pub fn with_extension(mut self, uri: impl Into<String>) -> Self {
        self.extensions.push(uri.into());
        self
    }
}

/// Retries left for one top-level call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Reconnect-and-resend after a lost connection
    pub transport: u8,
    /// Hello-login-resend after the registry expired our session
    pub expiry: u8,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            transport: 1,
            expiry: 1,
        }
    }
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    /// Drop the connection, re-acquire it, start over
    Reconnect,
    /// Start over from `New`
    Relogin,
    /// Return the error
    GiveUp,
}

impl RetryBudget {
    /// Classify `err`, spending budget when a retry is granted.
    pub fn classify(&mut self, op: Operation, err: &EppError) -> Retry {
        if err.is_retryable_transport() && self.transport > 0 {
            self.transport -= 1;
            Retry::Reconnect
        } else if op == Operation::Command
            && err.as_protocol().is_some_and(|p| p.is_session_expired())
            && self.expiry > 0
        {
            self.expiry -= 1;
            Retry::Relogin
        } else {
            Retry::GiveUp
        }
    }
}

enum Request<'a> {
    Hello,
    Login { new_pw: Option<&'a str> },
    Logout,
    Command(&'a Command),
}

impl Request<'_> {
    fn operation(&self) -> Operation {
        match self {
            Self::Hello => Operation::Hello,
            Self::Login { .. } => Operation::Login,
            Self::Logout => Operation::Logout,
            Self::Command(_) => Operation::Command,
        }
    }
}

enum Answer {
    Greeting(Greeting),
    Response(Reply<EppResponse>),
}

/// An EPP session bound to one registrar credential.
#[derive(Debug)]
pub struct Session<T, S> {
    options: SessionOptions,
    state: ProtocolState,
    channel: Channel<T>,
    store: S,
}

impl<T: Transport, S: SessionStore> Session<T, S> {
    /// Create a session, resuming whatever `store` holds.
    pub fn new(transport: T, store: S, options: SessionOptions) -> Result<Self> {
        let stored = store.load()?.unwrap_or_default();
        tracing::debug!(
            tag = %options.tag,
            state = %stored.state,
            cookies = stored.cookies.len(),
            "Session restored"
        );
        let audit = AuditLog::new(options.xml_log_file.clone());
        let mut channel = Channel::new(transport, stored.cookies, audit, options.request_timeout);
        channel.connect()?;

        Ok(Self {
            state: stored.state,
            options,
            channel,
            store,
        })
    }

    /// Get current state
    pub fn status(&self) -> ProtocolState {
        self.state
    }

    /// Get session cookies
    pub fn cookies(&self) -> &CookieSet {
        self.channel.cookies()
    }

    /// Get session options
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    /// Release the transport connection.
    pub fn disconnect(&mut self) {
        self.channel.disconnect();
    }

    /// Exchange greetings. `None` when the policy made this a no-op.
    pub async fn hello(&mut self) -> Result<Option<Greeting>> {
        match self.run(Request::Hello).await? {
            Some(Answer::Greeting(greeting)) => Ok(Some(greeting)),
            _ => Ok(None),
        }
    }

    /// Authenticate, optionally switching to `new_password`.
    ///
    /// A "2002 already logged in" reply counts as success. `None` when the
    /// policy made this a no-op.
    pub async fn login(&mut self, new_password: Option<&str>) -> Result<Option<Reply<()>>> {
        let answer = self
            .run(Request::Login {
                new_pw: new_password,
            })
            .await?;
        Ok(Self::unit(answer))
    }

    /// End the authenticated session. `None` when the policy made this a no-op.
    pub async fn logout(&mut self) -> Result<Option<Reply<()>>> {
        let answer = self.run(Request::Logout).await?;
        Ok(Self::unit(answer))
    }

    /// Send any command, establishing state first as the policy dictates.
    pub async fn dispatch(&mut self, command: &Command) -> Result<Reply<EppResponse>> {
        match self.run(Request::Command(command)).await? {
            Some(Answer::Response(reply)) => Ok(reply),
            _ => Err(EppError::Codec(format!(
                "no response to {}",
                command.name()
            ))),
        }
    }

    fn unit(answer: Option<Answer>) -> Option<Reply<()>> {
        match answer {
            Some(Answer::Response(reply)) => Some(reply.map(|_| ())),
            _ => None,
        }
    }

    async fn run(&mut self, request: Request<'_>) -> Result<Option<Answer>> {
        let op = request.operation();
        let mut budget = RetryBudget::default();

        loop {
            let err = match self.attempt(&request).await {
                Ok(answer) => return Ok(answer),
                Err(err) => err,
            };

            match budget.classify(op, &err) {
                Retry::Reconnect => {
                    tracing::warn!(op = op.name(), error = %err, "Connection lost, reconnecting");
                    self.channel.reconnect()?;
                }
                Retry::Relogin if !self.options.handling.relogs_in() => return Err(err),
                Retry::Relogin => {
                    tracing::warn!(op = op.name(), "Registry session expired, logging in again");
                    self.set_state(ProtocolState::New)?;
                }
                Retry::GiveUp => return Err(err),
            }
        }
    }

    async fn attempt(&mut self, request: &Request<'_>) -> Result<Option<Answer>> {
        let op = request.operation();
        let plan = self.options.handling.plan(op, self.state)?;
        let mut answer = None;

        if plan.hello {
            let greeting = self.send_hello().await?;
            if op == Operation::Hello {
                answer = Some(Answer::Greeting(greeting));
            }
        }
        if plan.login {
            let new_pw = match request {
                Request::Login { new_pw } => *new_pw,
                _ => None,
            };
            let reply = self.send_login(new_pw).await?;
            if op == Operation::Login {
                answer = Some(Answer::Response(reply));
            }
        }
        if plan.target {
            let reply = match request {
                Request::Logout => self.send_logout().await?,
                Request::Command(command) => self.send_command(command).await?,
                Request::Hello | Request::Login { .. } => return Ok(answer),
            };
            answer = Some(Answer::Response(reply));
        }
        Ok(answer)
    }

    async fn send_hello(&mut self) -> Result<Greeting> {
        match self.exchange(&Command::Hello).await? {
            (Frame::Greeting(greeting), _) => {
                self.set_state(ProtocolState::Helloed)?;
                Ok(greeting)
            }
            (Frame::Response(_), _) => Err(EppError::Codec(
                "expected greeting, got response".to_string(),
            )),
        }
    }

    async fn send_login(&mut self, new_pw: Option<&str>) -> Result<Reply<EppResponse>> {
        let command = Command::Login(Login {
            cl_id: self.options.tag.clone(),
            pw: self.options.password.clone(),
            new_pw: new_pw.map(str::to_string),
            version: self.options.version.clone(),
            lang: self.options.lang.clone(),
            services: self.options.services.clone(),
            extensions: self.options.extensions.clone(),
        });
        let reply = self.response(&command).await?;

        match reply.data.error() {
            None => {
                if let Some(pw) = new_pw {
                    self.options.password = pw.to_string();
                    tracing::info!(tag = %self.options.tag, "Password changed");
                }
            }
            Some(err) if err.is_already_logged_in() => {
                tracing::info!(tag = %self.options.tag, "Registry reports already logged in");
            }
            Some(err) => return self.reject(err),
        }

        self.set_state(ProtocolState::LoggedIn)?;
        Ok(reply)
    }

    async fn send_logout(&mut self) -> Result<Reply<EppResponse>> {
        let reply = self.response(&Command::Logout).await?;
        if let Some(err) = reply.data.error() {
            return self.reject(err);
        }
        self.set_state(ProtocolState::Helloed)?;
        Ok(reply)
    }

    async fn send_command(&mut self, command: &Command) -> Result<Reply<EppResponse>> {
        let reply = self.response(command).await?;
        if let Some(err) = reply.data.error() {
            return self.reject(err);
        }
        Ok(reply)
    }

    /// Fail with a registry error. An expired session drops back to `New`.
    fn reject<R>(&mut self, err: ProtocolError) -> Result<R> {
        if err.is_session_expired() {
            self.set_state(ProtocolState::New)?;
        }
        Err(err.into())
    }

    async fn response(&mut self, command: &Command) -> Result<Reply<EppResponse>> {
        match self.exchange(command).await? {
            (Frame::Response(response), raw) => Ok(Reply {
                result: response.result.clone(),
                cl_tr_id: response.cl_tr_id.clone(),
                sv_tr_id: response.sv_tr_id.clone(),
                data: response,
                raw,
            }),
            (Frame::Greeting(_), _) => Err(EppError::Codec(format!(
                "expected response to {}, got greeting",
                command.name()
            ))),
        }
    }

    async fn exchange(&mut self, command: &Command) -> Result<(Frame, String)> {
        let cl_tr_id = self.next_cl_tr_id();
        let xml = codec::encode(command, &cl_tr_id)?;
        tracing::debug!(command = command.name(), cl_tr_id = %cl_tr_id, "Sending");

        let exchange = self.channel.send(xml).await?;
        if exchange.cookies_changed {
            tracing::info!(cookies = %self.channel.cookies(), "Registry issued a new session");
            self.set_state(ProtocolState::New)?;
        }

        let frame = codec::decode(&exchange.body)?;
        if let Frame::Response(response) = &frame {
            tracing::debug!(
                command = command.name(),
                code = response.result.code,
                sv_tr_id = response.sv_tr_id.as_deref().unwrap_or(""),
                "Received"
            );
        }
        Ok((frame, exchange.body))
    }

    fn next_cl_tr_id(&self) -> String {
        format!("{}{}", self.options.cl_tr_id_prefix, uuid::Uuid::new_v4())
    }

    fn set_state(&mut self, state: ProtocolState) -> Result<()> {
        if state != self.state {
            tracing::info!(from = %self.state, to = %state, "Session state changed");
        }
        self.state = state;
        self.persist()
    }

    fn persist(&mut self) -> Result<()> {
        self.store.save(&StoredSession {
            cookies: self.channel.cookies().clone(),
            state: self.state,
        })
    }
}
