//! Typed results, one per operation.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Result line of an EPP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EppResult {
    /// Result code (`1xxx` success, `2xxx` error)
    pub code: u32,
    /// Result message
    pub message: String,
    /// Registry sub-reason code from `extValue`
    pub reason_code: Option<u32>,
}

impl EppResult {
    /// Codes below 2000 are the success family.
    pub fn is_success(&self) -> bool {
        self.code < 2000
    }
}

/// A completed command: result line, transaction IDs and typed payload.
#[derive(Debug, Clone, Serialize)]
pub struct Reply<T> {
    /// Result line
    pub result: EppResult,
    /// Echoed client transaction ID
    pub cl_tr_id: Option<String>,
    /// Server transaction ID
    pub sv_tr_id: Option<String>,
    /// Operation payload
    pub data: T,
    /// Raw response XML
    #[serde(skip)]
    pub raw: String,
}

impl<T> Reply<T> {
    /// Replace the payload, keeping the envelope.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        Reply {
            result: self.result,
            cl_tr_id: self.cl_tr_id,
            sv_tr_id: self.sv_tr_id,
            data: f(self.data),
            raw: self.raw,
        }
    }
}

/// Server greeting returned by `hello`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeting {
    /// Server identifier
    pub server_id: Option<String>,
    /// Server clock
    pub server_date: Option<String>,
}

/// Availability of one checked object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckItem {
    /// Contact ID or domain name
    pub id: String,
    /// Object can be provisioned
    pub avail: bool,
    /// Reason when unavailable
    pub reason: Option<String>,
}

/// Result of `contact_check` / `domain_check`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// One entry per checked object, in response order
    pub items: Vec<CheckItem>,
}

impl CheckResult {
    /// Look up a checked object by ID.
    pub fn get(&self, id: &str) -> Option<&CheckItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Availability of `id`, if it was checked.
    pub fn is_available(&self, id: &str) -> Option<bool> {
        self.get(id).map(|item| item.avail)
    }
}

/// Receipt of a successful create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReceipt {
    /// Created contact ID or domain name
    pub id: String,
    /// Creation date
    pub cr_date: Option<DateTime<FixedOffset>>,
    /// Expiration date (domains only)
    pub ex_date: Option<DateTime<FixedOffset>>,
}

/// Transfer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferOp {
    /// Query pending transfer status
    Query,
    /// Request a transfer (gaining registrar)
    Request,
    /// Cancel own request
    Cancel,
    /// Approve (losing registrar)
    Approve,
    /// Reject (losing registrar)
    Reject,
}

impl TransferOp {
    /// Wire value of the `op` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Request => "request",
            Self::Cancel => "cancel",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for TransferOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransferOp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "query" => Ok(Self::Query),
            "request" => Ok(Self::Request),
            "cancel" => Ok(Self::Cancel),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            _ => Err(format!("Unknown transfer op: {}", s)),
        }
    }
}

/// Transfer state as reported by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Domain name
    pub name: String,
    /// `pending`, `clientApproved`, `serverCancelled`, ...
    pub tr_status: String,
    /// Requesting client
    pub re_id: Option<String>,
    /// Request date
    pub re_date: Option<DateTime<FixedOffset>>,
    /// Acting client
    pub ac_id: Option<String>,
    /// Action deadline
    pub ac_date: Option<DateTime<FixedOffset>>,
    /// New expiration date
    pub ex_date: Option<DateTime<FixedOffset>>,
}

/// Head of the registry message queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageQueue {
    /// Messages waiting, including this one
    pub count: u32,
    /// Message ID to acknowledge
    pub id: String,
    /// Enqueue date
    pub queued_at: Option<DateTime<FixedOffset>>,
    /// Message text
    pub message: Option<String>,
}

/// Result of `poll` / `ack`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOutcome {
    /// `None` when the queue is empty
    pub queue: Option<MessageQueue>,
}

impl PollOutcome {
    /// Whether the registry returned a message.
    pub fn has_message(&self) -> bool {
        self.queue.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_lookup() {
        let result = CheckResult {
            items: vec![
                CheckItem {
                    id: "a.it".to_string(),
                    avail: true,
                    reason: None,
                },
                CheckItem {
                    id: "b.it".to_string(),
                    avail: false,
                    reason: Some("In use".to_string()),
                },
            ],
        };
        assert_eq!(result.is_available("a.it"), Some(true));
        assert_eq!(result.is_available("b.it"), Some(false));
        assert_eq!(result.is_available("c.it"), None);
    }

    #[test]
    fn test_transfer_op_from_str() {
        assert_eq!("Approve".parse::<TransferOp>().unwrap(), TransferOp::Approve);
        assert!("steal".parse::<TransferOp>().is_err());
    }
}
