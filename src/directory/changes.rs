use std::fmt::{Display, Formatter};

/// Directory modification operation, mirroring the protocol-level modify
/// semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Add,
    Replace,
    Delete,
}

impl Display for ChangeOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeOp::Add => write!(f, "add"),
            ChangeOp::Replace => write!(f, "replace"),
            ChangeOp::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeChange {
    op: ChangeOp,
    attribute: String,
    values: Vec<String>,
}

impl AttributeChange {
    pub fn new(op: ChangeOp, attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            op,
            attribute: attribute.into(),
            values,
        }
    }

    pub fn op(&self) -> ChangeOp {
        self.op
    }

    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Ordered set of attribute changes against one directory entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<AttributeChange>,
}

impl ChangeSet {
    pub fn push(&mut self, change: AttributeChange) {
        self.changes.push(change);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeChange> {
        self.changes.iter()
    }
}

impl Display for ChangeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for change in &self.changes {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}({})", change.op, change.attribute)?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<AttributeChange> for ChangeSet {
    fn from_iter<T: IntoIterator<Item = AttributeChange>>(iter: T) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}
