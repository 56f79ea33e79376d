//! # EPP Tunnel - EPP over HTTP for registrars
//!
//! Client side of the Extensible Provisioning Protocol tunneled over HTTP
//! POST, for automating contact and domain lifecycles against a registry
//! gateway.
//!
//! ## Features
//!
//! - **Session state machine**: hello / login / logout driven automatically,
//!   manually, or not at all
//! - **Bounded recovery**: one reconnect after a lost connection and one
//!   relogin after a registry-side session expiry, per call
//! - **Persistent sessions**: cookies and state survive process restarts, so
//!   a new process resumes the registry session instead of logging in again
//! - **Minimal updates**: the diff engine turns two snapshots into an
//!   `add` / `chg` / `rem` change-set and empty groups are never sent
//! - **Audit log**: every request and response appended to an XML log
//!
//! ## Architecture
//!
//! ```text
//! caller ──> Session ──plan──> SessionHandling
//!               │
//!               ├──encode/decode──> codec
//!               ├──send──────────> Channel ──> Transport (HTTP / scripted)
//!               └──save──────────> SessionStore (file / memory)
//! ```
//!
//! ### State Machine
//!
//! ```text
//!            hello                 login
//!   [New] ──────────> [Helloed] ──────────> [LoggedIn]
//!     ^                   ^                      │
//!     │                   └────── logout ────────┘
//!     │
//!     └── new cookies from the registry, or "session expired" (2002/4015)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use epp::{Config, Domain};
//!
//! let config = Config::from_file("epp.toml")?.apply_env();
//! let mut session = config.open_session()?;
//!
//! // Hello and login happen on demand.
//! let check = session.domain_check(&["example.it"]).await?;
//! if check.data.is_available("example.it") == Some(false) {
//!     let old = session.domain_info("example.it", None).await?.data;
//!     let mut new = old.clone();
//!     new.statuses.push("clientTransferProhibited".to_string());
//!     session.domain_update_with_old(&old, &new).await?;
//! }
//! ```

pub mod codec;
pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod session;
pub mod transport;

pub use codec::{Command, EppResponse, Frame};
pub use config::Config;
pub use diff::{diff, ChangeSet, ContactChangeSet, DomainChangeSet};
pub use error::{EppError, ProtocolError, Result, TransportError};
pub use model::{
    CheckResult, Contact, CreateReceipt, Domain, EppResult, Greeting, MessageQueue, NameServer,
    PollOutcome, Reply, TransferOp, TransferReceipt,
};
pub use session::{
    FileStore, MemoryStore, ProtocolState, Session, SessionHandling, SessionOptions, SessionStore,
};
pub use transport::{CookieSet, HttpTransport, HttpTransportConfig, Transport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
