//! Protocol state and the session-handling policy.
//!
//! Every Auto/Manual/Disabled decision lives in [`SessionHandling::plan`];
//! the session consults it once per attempt and runs whatever steps it
//! returns.

use serde::{Deserialize, Serialize};

use crate::error::{EppError, Result};

/// Protocol state, ordered `New < Helloed < LoggedIn`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolState {
    /// No greeting exchanged, or the registry dropped our session
    #[default]
    New,
    /// Greeting exchanged, not authenticated
    Helloed,
    /// Authenticated
    LoggedIn,
}

impl ProtocolState {
    /// Get descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Helloed => "helloed",
            Self::LoggedIn => "logged_in",
        }
    }
}

impl std::fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Who drives hello / login / logout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionHandling {
    /// Prerequisites are established silently before each operation
    #[default]
    Auto,
    /// The caller drives the protocol; wrong-state calls are usage errors
    Manual,
    /// Requests go out as-is (conformance testing)
    Disabled,
}

impl SessionHandling {
    /// Get descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Disabled => "disabled",
        }
    }

    /// Whether the session may hello and log in again on its own after the
    /// registry expires it.
    pub fn relogs_in(self) -> bool {
        self == Self::Auto
    }

    /// Steps needed to perform `op` from `state`.
    ///
    /// An empty plan means the operation is a no-op.
    pub fn plan(self, op: Operation, state: ProtocolState) -> Result<Plan> {
        use Operation as Op;
        use ProtocolState as St;

        let plan = match self {
            Self::Auto => match (op, state) {
                (Op::Hello, St::New) => Plan::HELLO,
                (Op::Hello, _) => Plan::NOTHING,
                (Op::Login, St::New) => Plan::HELLO.and_login(),
                (Op::Login, St::Helloed) => Plan::LOGIN,
                (Op::Login, St::LoggedIn) => Plan::NOTHING,
                (Op::Logout, St::LoggedIn) => Plan::TARGET,
                (Op::Logout, _) => Plan::NOTHING,
                (Op::Command, St::New) => Plan::HELLO.and_login().and_target(),
                (Op::Command, St::Helloed) => Plan::LOGIN.and_target(),
                (Op::Command, St::LoggedIn) => Plan::TARGET,
            },
            Self::Manual => match (op, state) {
                (Op::Hello, _) => Plan::HELLO,
                (Op::Login, St::Helloed) => Plan::LOGIN,
                (Op::Logout | Op::Command, St::LoggedIn) => Plan::TARGET,
                _ => {
                    return Err(EppError::Usage(format!(
                        "{} not valid in state {}",
                        op.name(),
                        state
                    )))
                }
            },
            Self::Disabled => match op {
                Op::Hello => Plan::HELLO,
                Op::Login => Plan::LOGIN,
                Op::Logout | Op::Command => Plan::TARGET,
            },
        };
        Ok(plan)
    }
}

impl std::fmt::Display for SessionHandling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for SessionHandling {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            _ => Err(format!("Unknown session handling: {}", s)),
        }
    }
}

/// Top-level session operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `hello()`
    Hello,
    /// `login()`
    Login,
    /// `logout()`
    Logout,
    /// Any object or poll command
    Command,
}

impl Operation {
    /// Get descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Command => "command",
        }
    }
}

/// Requests to send, in order: hello, login, then the operation's own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Plan {
    /// Send `<hello/>`
    pub hello: bool,
    /// Send `<login>`
    pub login: bool,
    /// Send the logout or command itself
    pub target: bool,
}

impl Plan {
    const NOTHING: Self = Self {
        hello: false,
        login: false,
        target: false,
    };
    const HELLO: Self = Self {
        hello: true,
        ..Self::NOTHING
    };
    const LOGIN: Self = Self {
        login: true,
        ..Self::NOTHING
    };
    const TARGET: Self = Self {
        target: true,
        ..Self::NOTHING
    };

    const fn and_login(self) -> Self {
        Self {
            login: true,
            ..self
        }
    }

    const fn and_target(self) -> Self {
        Self {
            target: true,
            ..self
        }
    }

    /// Nothing to send.
    pub fn is_empty(&self) -> bool {
        !self.hello && !self.login && !self.target
    }

    /// Number of requests this plan sends.
    pub fn len(&self) -> usize {
        usize::from(self.hello) + usize::from(self.login) + usize::from(self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_state_order() {
        assert!(ProtocolState::New < ProtocolState::Helloed);
        assert!(ProtocolState::Helloed < ProtocolState::LoggedIn);
        assert_eq!(ProtocolState::default(), ProtocolState::New);
    }

    #[test]
    fn test_handling_from_str() {
        assert_eq!(
            SessionHandling::from_str("AUTO").unwrap(),
            SessionHandling::Auto
        );
        assert_eq!(
            SessionHandling::from_str("manual").unwrap(),
            SessionHandling::Manual
        );
        assert_eq!(
            SessionHandling::from_str("disabled").unwrap(),
            SessionHandling::Disabled
        );
        assert!(SessionHandling::from_str("sometimes").is_err());
    }

    #[test]
    fn test_auto_command_plan_sizes() {
        let auto = SessionHandling::Auto;
        assert_eq!(auto.plan(Operation::Command, ProtocolState::New).unwrap().len(), 3);
        assert_eq!(auto.plan(Operation::Command, ProtocolState::Helloed).unwrap().len(), 2);
        assert_eq!(auto.plan(Operation::Command, ProtocolState::LoggedIn).unwrap().len(), 1);
    }

    #[test]
    fn test_auto_noops() {
        let auto = SessionHandling::Auto;
        assert!(auto.plan(Operation::Hello, ProtocolState::Helloed).unwrap().is_empty());
        assert!(auto.plan(Operation::Hello, ProtocolState::LoggedIn).unwrap().is_empty());
        assert!(auto.plan(Operation::Login, ProtocolState::LoggedIn).unwrap().is_empty());
        assert!(auto.plan(Operation::Logout, ProtocolState::Helloed).unwrap().is_empty());
        assert!(auto.plan(Operation::Logout, ProtocolState::New).unwrap().is_empty());
    }

    #[test]
    fn test_auto_login_from_new_hellos_first() {
        let plan = SessionHandling::Auto
            .plan(Operation::Login, ProtocolState::New)
            .unwrap();
        assert!(plan.hello && plan.login && !plan.target);
    }

    #[test]
    fn test_manual_gates() {
        let manual = SessionHandling::Manual;
        assert_eq!(manual.plan(Operation::Hello, ProtocolState::LoggedIn).unwrap(), Plan::HELLO);
        assert_eq!(manual.plan(Operation::Login, ProtocolState::Helloed).unwrap(), Plan::LOGIN);
        assert!(matches!(
            manual.plan(Operation::Login, ProtocolState::New),
            Err(EppError::Usage(_))
        ));
        assert!(matches!(
            manual.plan(Operation::Logout, ProtocolState::Helloed),
            Err(EppError::Usage(_))
        ));
        assert!(matches!(
            manual.plan(Operation::Command, ProtocolState::Helloed),
            Err(EppError::Usage(_))
        ));
        assert_eq!(manual.plan(Operation::Command, ProtocolState::LoggedIn).unwrap(), Plan::TARGET);
    }

    #[test]
    fn test_disabled_never_gates() {
        let disabled = SessionHandling::Disabled;
        for state in [ProtocolState::New, ProtocolState::Helloed, ProtocolState::LoggedIn] {
            assert_eq!(disabled.plan(Operation::Command, state).unwrap(), Plan::TARGET);
            assert_eq!(disabled.plan(Operation::Logout, state).unwrap(), Plan::TARGET);
            assert_eq!(disabled.plan(Operation::Login, state).unwrap(), Plan::LOGIN);
        }
    }

    #[test]
    fn test_state_serde() {
        assert_eq!(
            serde_json::to_string(&ProtocolState::LoggedIn).unwrap(),
            "\"logged_in\""
        );
        let handling: SessionHandling = serde_json::from_str("\"manual\"").unwrap();
        assert_eq!(handling, SessionHandling::Manual);
    }
}
