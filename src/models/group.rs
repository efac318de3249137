//! Group record schema and expansion directives

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Capability;
use crate::types::GatehouseError;

/// A named collection of entities, itself a capability-bearing subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default = "unassigned_number")]
    pub number: i32,

    /// Group whose members may manage this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,

    /// Expansion directives in `MODE:groupName` form, applied in order.
    #[serde(default)]
    pub expansions: Vec<String>,

    #[serde(default)]
    pub capabilities: Vec<Capability>,

    #[serde(default)]
    pub untyped_meta: Vec<String>,
}

fn unassigned_number() -> i32 {
    -1
}

impl Default for Group {
    fn default() -> Self {
        Self {
            name: String::new(),
            display_name: None,
            number: -1,
            managed_by: None,
            expansions: Vec::new(),
            capabilities: Vec::new(),
            untyped_meta: Vec::new(),
        }
    }
}

/// Mode of a single expansion directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionMode {
    Include,
    Exclude,
    Drop,
}

impl fmt::Display for ExpansionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpansionMode::Include => write!(f, "INCLUDE"),
            ExpansionMode::Exclude => write!(f, "EXCLUDE"),
            ExpansionMode::Drop => write!(f, "DROP"),
        }
    }
}

/// A parsed `MODE:groupName` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub mode: ExpansionMode,
    pub target: String,
}

impl Expansion {
    pub fn new(mode: ExpansionMode, target: impl Into<String>) -> Self {
        Self {
            mode,
            target: target.into(),
        }
    }
}

impl fmt::Display for Expansion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.mode, self.target)
    }
}

impl FromStr for Expansion {
    type Err = GatehouseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mode, target) = s.split_once(':').ok_or_else(|| {
            GatehouseError::MalformedRequest(format!("bad expansion directive: {}", s))
        })?;
        if target.is_empty() {
            return Err(GatehouseError::MalformedRequest(format!(
                "bad expansion directive: {}",
                s
            )));
        }
        let mode = match mode {
            "INCLUDE" => ExpansionMode::Include,
            "EXCLUDE" => ExpansionMode::Exclude,
            "DROP" => ExpansionMode::Drop,
            _ => {
                return Err(GatehouseError::MalformedRequest(format!(
                    "bad expansion mode: {}",
                    mode
                )))
            }
        };
        Ok(Expansion::new(mode, target))
    }
}
