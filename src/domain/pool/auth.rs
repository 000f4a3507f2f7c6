//! Admin capability for the pool's administrative entry points

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;
use uuid::Uuid;

use crate::shared::errors::AuthError;

/// Proof of authority over one pool, handed out once at deployment
#[derive(Debug, PartialEq, Eq)]
pub struct AdminCap {
    id: Uuid,
}

impl AdminCap {
    pub(crate) fn mint() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for AdminCap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl FromStr for AdminCap {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { id: s.trim().parse()? })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Authorization<'a> {
    Capability(&'a AdminCap),
    Anonymous,
}

impl<'a> From<Option<&'a AdminCap>> for Authorization<'a> {
    fn from(cap: Option<&'a AdminCap>) -> Self {
        cap.map_or(Authorization::Anonymous, Authorization::Capability)
    }
}

/// Default-deny check guarding `withdraw_all` and `reinitialize`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPolicy {
    cap_id: Uuid,
    /// Lets anyone call admin operations, like the original demo contract
    unsafe_demo_mode: bool,
}

impl AdminPolicy {
    pub fn new(cap: &AdminCap, unsafe_demo_mode: bool) -> Self {
        Self {
            cap_id: cap.id,
            unsafe_demo_mode,
        }
    }

    pub fn unsafe_demo_mode(&self) -> bool {
        self.unsafe_demo_mode
    }

    pub fn authorize(&self, auth: Authorization<'_>, operation: &str) -> Result<(), AuthError> {
        match auth {
            Authorization::Capability(cap) if cap.id == self.cap_id => Ok(()),
            Authorization::Capability(_) => Err(AuthError::WrongCapability),
            Authorization::Anonymous if self.unsafe_demo_mode => {
                warn!("{} called without a capability, allowed by unsafe demo mode", operation);
                Ok(())
            }
            Authorization::Anonymous => Err(AuthError::MissingCapability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_deny() {
        let cap = AdminCap::mint();
        let policy = AdminPolicy::new(&cap, false);

        assert!(policy.authorize(Authorization::Capability(&cap), "withdraw_all").is_ok());
        assert_eq!(
            policy.authorize(Authorization::Anonymous, "withdraw_all"),
            Err(AuthError::MissingCapability)
        );
        let other = AdminCap::mint();
        assert_eq!(
            policy.authorize(Authorization::Capability(&other), "withdraw_all"),
            Err(AuthError::WrongCapability)
        );
    }

    #[test]
    fn test_unsafe_demo_mode_allows_anonymous() {
        let cap = AdminCap::mint();
        let policy = AdminPolicy::new(&cap, true);
        assert!(policy.authorize(Authorization::Anonymous, "reinitialize").is_ok());
        // A wrong capability is still refused
        assert!(policy.authorize(Authorization::Capability(&AdminCap::mint()), "reinitialize").is_err());
    }

    #[test]
    fn test_capability_parses_from_text() {
        let cap = AdminCap::mint();
        let parsed: AdminCap = cap.to_string().parse().unwrap();
        assert_eq!(parsed, cap);
    }
}
