// ABOUTME: Actors and their capabilities as handed over by the identity system
// ABOUTME: Capabilities are opaque grants; roles are resolved before reaching this crate

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Author or owner: may change content and structure, submit and withdraw
    Edit,
    /// May approve, request changes, and recall approved documents
    Review,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Edit => f.write_str("edit"),
            Capability::Review => f.write_str("review"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub capabilities: HashSet<Capability>,
}

impl Actor {
    pub fn new(id: impl Into<String>, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            id: id.into(),
            capabilities: capabilities.into_iter().collect(),
        }
    }

    pub fn editor(id: impl Into<String>) -> Self {
        Self::new(id, [Capability::Edit])
    }

    pub fn reviewer(id: impl Into<String>) -> Self {
        Self::new(id, [Capability::Review])
    }

    pub fn can(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
