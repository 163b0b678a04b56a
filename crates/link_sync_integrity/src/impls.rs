use chrono::{DateTime, Utc};

use crate::{ExpressionProof, LinkExpression, Perspective, PerspectiveDiff, Triple};

impl Triple {
    pub fn new(source: &str, predicate: &str, target: &str) -> Self {
        Triple {
            source: String::from(source),
            predicate: String::from(predicate),
            target: String::from(target),
        }
    }
}

impl ExpressionProof {
    pub fn unsigned() -> Self {
        ExpressionProof {
            signature: String::new(),
            key: String::new(),
            valid: false,
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }
}

impl LinkExpression {
    pub fn new(author: &str, timestamp: DateTime<Utc>, data: Triple, proof: ExpressionProof) -> Self {
        LinkExpression {
            author: String::from(author),
            data,
            timestamp,
            proof,
        }
    }
}

impl PerspectiveDiff {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }
}

impl Perspective {
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains(&self, data: &Triple) -> bool {
        self.links.iter().any(|link| &link.data == data)
    }
}
