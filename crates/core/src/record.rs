//! Nested record values.
//!
//! A [`Record`] is either a leaf [`Value`] or an ordered list of named
//! members. Member order is declaration order and is what the schema
//! extractor walks, so it is kept in a `Vec` rather than a map.
//!
//! Members are addressed by dot-delimited paths from the root, e.g.
//! `status.errorCode`.

use crate::value::Value;

/// Separator between member names in a field path.
pub const SEPARATOR: char = '.';

/// A structured value with named members, or a single leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Leaf(Value),
    Nested(Vec<(String, Record)>),
}

impl Record {
    /// An empty nested record.
    pub fn nested() -> Self {
        Record::Nested(Vec::new())
    }

    /// Append a member, builder style.
    ///
    /// A leaf is replaced by a record holding only the new member.
    pub fn with(mut self, name: impl Into<String>, member: impl Into<Record>) -> Self {
        self.push(name, member);
        self
    }

    /// Append a member in place.
    pub fn push(&mut self, name: impl Into<String>, member: impl Into<Record>) {
        let entry = (name.into(), member.into());
        match self {
            Record::Nested(members) => members.push(entry),
            Record::Leaf(_) => *self = Record::Nested(vec![entry]),
        }
    }

    pub fn members(&self) -> Option<&[(String, Record)]> {
        match self {
            Record::Nested(members) => Some(members),
            Record::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&Value> {
        match self {
            Record::Leaf(value) => Some(value),
            Record::Nested(_) => None,
        }
    }

    /// Direct member by name.
    pub fn member(&self, name: &str) -> Option<&Record> {
        self.members()?
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, record)| record)
    }

    /// Member at a dotted path.
    pub fn get(&self, path: &str) -> Option<&Record> {
        path.split(SEPARATOR)
            .try_fold(self, |record, name| record.member(name))
    }

    /// Leaf value at a dotted path.
    pub fn leaf(&self, path: &str) -> Option<&Value> {
        self.get(path)?.as_leaf()
    }

    /// Set the leaf at a dotted path, creating intermediate records.
    ///
    /// New members are appended, so inserting paths in schema order rebuilds
    /// the original declaration order. Anything already at the path, or a
    /// leaf standing where an intermediate record is needed, is replaced.
    pub fn insert_path(&mut self, path: &str, value: Value) {
        let mut node = self;
        let mut names = path.split(SEPARATOR).peekable();

        while let Some(name) = names.next() {
            if matches!(node, Record::Leaf(_)) {
                *node = Record::nested();
            }
            let Record::Nested(members) = node else {
                return;
            };

            let index = match members.iter().position(|(member, _)| member == name) {
                Some(index) => index,
                None => {
                    members.push((name.to_string(), Record::nested()));
                    members.len() - 1
                }
            };

            if names.peek().is_none() {
                members[index].1 = Record::Leaf(value);
                return;
            }
            node = &mut members[index].1;
        }
    }

    /// Number of leaves under this record.
    pub fn leaf_count(&self) -> usize {
        match self {
            Record::Leaf(_) => 1,
            Record::Nested(members) => members.iter().map(|(_, r)| r.leaf_count()).sum(),
        }
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Record::Leaf(value)
    }
}
