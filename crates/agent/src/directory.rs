use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::types::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Creator,
    Analyzer,
    Audience,
    Feedback,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Creator, Role::Analyzer, Role::Audience, Role::Feedback];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Creator => "creator",
            Role::Analyzer => "analyzer",
            Role::Audience => "audience",
            Role::Feedback => "feedback",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// Role → address map handed to every agent at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    addresses: BTreeMap<Role, AgentId>,
}

impl Directory {
    pub fn new() -> Self {
        Self {
            addresses: Role::ALL
                .into_iter()
                .map(|role| (role, AgentId::new(role.as_str())))
                .collect(),
        }
    }

    pub fn with_address(mut self, role: Role, address: AgentId) -> Self {
        self.addresses.insert(role, address);
        self
    }

    pub fn address(&self, role: Role) -> AgentId {
        self.addresses
            .get(&role)
            .cloned()
            .unwrap_or_else(|| AgentId::new(role.as_str()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &AgentId)> {
        self.addresses.iter().map(|(role, id)| (*role, id))
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_addresses() {
        let dir = Directory::default();
        assert_eq!(dir.address(Role::Creator), AgentId::new("creator"));
        assert_eq!(dir.address(Role::Feedback), AgentId::new("feedback"));
    }

    #[test]
    fn test_override() {
        let dir = Directory::new().with_address(Role::Analyzer, AgentId::new("platform@sim"));
        assert_eq!(dir.address(Role::Analyzer), AgentId::new("platform@sim"));
        assert_eq!(dir.iter().count(), 4);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("Audience".parse::<Role>(), Ok(Role::Audience));
        assert!("platform".parse::<Role>().is_err());
    }
}
