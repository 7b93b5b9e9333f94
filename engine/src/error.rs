use thiserror::Error;

use crate::session::Step;

/// A record that breaks a data-model invariant. Raised before any rule runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Prefix the field path, e.g. `ranges` → `weapon[3].ranges`.
    pub fn within(mut self, parent: impl AsRef<str>) -> Self {
        self.field = format!("{}.{}", parent.as_ref(), self.field);
        self
    }
}

/// Which session list an index points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Character,
    Weapon,
    Armor,
}

impl std::fmt::Display for ListKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ListKind::Character => "character",
            ListKind::Weapon => "weapon",
            ListKind::Armor => "armor",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("index {index} out of range for {list} list (len {len})")]
    OutOfRange {
        list: ListKind,
        index: usize,
        len: usize,
    },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Why a stage of the calculation could not run yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("no {0} selected")]
    NoSelection(&'static str),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("{what}: need {needed} roll(s), have {got}")]
    MissingRolls {
        what: &'static str,
        needed: usize,
        got: usize,
    },
    #[error("{what}: roll {value} does not fit a d{sides}")]
    RollOutOfRange {
        what: &'static str,
        value: u32,
        sides: u32,
    },
    #[error("deviation roll must be a d12 clock direction, got {0:?}")]
    MissingDeviation(Option<u32>),
    #[error("explosive was not fired: {0}")]
    NotFired(&'static str),
    #[error("calculation stopped at {0:?}")]
    Incomplete(Step),
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("log entry {0} does not exist")]
    NoSuchLogEntry(usize),
    #[error(transparent)]
    Calc(#[from] CalcError),
}
