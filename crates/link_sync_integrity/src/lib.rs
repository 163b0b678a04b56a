use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

pub mod impls;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ExpressionProof {
    pub signature: String,
    pub key: String,
    #[serde(default)]
    pub valid: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{} -[{}]-> {}", source, predicate, target)]
pub struct Triple {
    pub source: String,
    pub predicate: String,
    pub target: String,
}

#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq, Hash)]
pub struct LinkExpression {
    pub author: String,
    pub data: Triple,
    pub timestamp: DateTime<Utc>,
    pub proof: ExpressionProof,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PerspectiveDiff {
    pub additions: Vec<LinkExpression>,
    pub removals: Vec<LinkExpression>,
}

impl PerspectiveDiff {
    pub fn new() -> Self {
        Self {
            additions: Vec::new(),
            removals: Vec::new(),
        }
    }
    pub fn total_diff_number(&self) -> usize {
        self.additions.len() + self.removals.len()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq, From)]
pub struct Perspective {
    pub links: Vec<LinkExpression>,
}
