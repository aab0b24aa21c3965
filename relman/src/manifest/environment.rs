//! Promotion target environments

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ManifestError;

/// A statically known promotion target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Qa,
    Prod,
}

impl Environment {
    /// All environments, in promotion order
    pub const ALL: [Environment; 2] = [Environment::Qa, Environment::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Qa => "qa",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qa" => Ok(Environment::Qa),
            "prod" => Ok(Environment::Prod),
            other => Err(ManifestError::InvalidEnvironment(other.to_string())),
        }
    }
}
