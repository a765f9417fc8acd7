// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Server identities and the rosters that maintain a ledger chain.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerIdentity {
    pub name: String,
    /// Base URL the node serves its HTTP API on.
    pub address: String,
}

impl ServerIdentity {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub members: Vec<ServerIdentity>,
}

impl Roster {
    pub fn new(members: Vec<ServerIdentity>) -> Self {
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServerIdentity> {
        self.members.iter()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.members.iter().any(|m| m.address == address)
    }

    pub fn random_member<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&ServerIdentity> {
        self.members.choose(rng)
    }
}
