//! Registry object snapshots and typed command results.
//!
//! Snapshots ([`Contact`], [`Domain`]) are what `info` returns and what
//! `create` / `update_with_old` consume. Every operation result is wrapped in
//! a [`Reply`] carrying the registry's result line and transaction IDs.

mod contact;
mod domain;
mod reply;

pub use contact::Contact;
pub use domain::{Domain, NameServer};
pub use reply::{
    CheckItem, CheckResult, CreateReceipt, EppResult, Greeting, MessageQueue, PollOutcome, Reply,
    TransferOp, TransferReceipt,
};

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Server-maintained attributes common to contacts and domains.
///
/// Never part of a diff; the registry owns these.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Repository object ID
    pub roid: Option<String>,
    /// Sponsoring client
    pub cl_id: Option<String>,
    /// Creating client
    pub cr_id: Option<String>,
    /// Creation date
    pub cr_date: Option<DateTime<FixedOffset>>,
    /// Last updating client
    pub up_id: Option<String>,
    /// Last update date
    pub up_date: Option<DateTime<FixedOffset>>,
    /// Expiration date (domains only)
    pub ex_date: Option<DateTime<FixedOffset>>,
    /// Last transfer date
    pub tr_date: Option<DateTime<FixedOffset>>,
}
