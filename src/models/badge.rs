//! Reputation badges and the set that holds them

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Badge {
    Beginner,
    Helper,
    Expert,
    Master,
}

impl Badge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Badge::Beginner => "Beginner",
            Badge::Helper => "Helper",
            Badge::Expert => "Expert",
            Badge::Master => "Master",
        }
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Badge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beginner" => Ok(Badge::Beginner),
            "Helper" => Ok(Badge::Helper),
            "Expert" => Ok(Badge::Expert),
            "Master" => Ok(Badge::Master),
            other => Err(format!("Unknown badge: {}", other)),
        }
    }
}

/// Badges held by a user. Serializes as a JSON array of labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeSet(BTreeSet<Badge>);

impl BadgeSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Add a badge. Returns false if it was already held.
    pub fn insert(&mut self, badge: Badge) -> bool {
        self.0.insert(badge)
    }

    pub fn contains(&self, badge: Badge) -> bool {
        self.0.contains(&badge)
    }

    pub fn iter(&self) -> impl Iterator<Item = Badge> + '_ {
        self.0.iter().copied()
    }

    /// Labels for storage in a text array column
    pub fn labels(&self) -> Vec<String> {
        self.iter().map(|b| b.as_str().to_string()).collect()
    }
}

impl FromIterator<Badge> for BadgeSet {
    fn from_iter<I: IntoIterator<Item = Badge>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
