//! Session roles.

use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

/// Logical participant type in an aggregator session.
///
/// Immutable once a connection starts; each role owns its own connection
/// slot and its own history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Agent,
    Presenter,
    Audience,
}

impl Role {
    /// All roles the aggregator issues OTPs for.
    pub const ALL: [Role; 3] = [Role::Agent, Role::Presenter, Role::Audience];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Agent => "agent",
            Role::Presenter => "presenter",
            Role::Audience => "audience",
        }
    }

    /// Request type tag of the one registration frame sent after transport open.
    pub fn registration_request_type(self) -> String {
        format!("REGIST_{}", self.as_str().to_ascii_uppercase())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClientError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "agent" => Ok(Role::Agent),
            "presenter" => Ok(Role::Presenter),
            "audience" => Ok(Role::Audience),
            other => Err(ClientError::UnknownRole(other.to_string())),
        }
    }
}
