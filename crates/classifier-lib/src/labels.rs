//! Class labels and the append-only label set

use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A discrete class identifier as it appears on the stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Boolean(bool),
    Integer(i64),
    Text(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Boolean(b) => write!(f, "{}", b),
            Label::Integer(i) => write!(f, "{}", i),
            Label::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Text(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Text(s)
    }
}

impl From<i64> for Label {
    fn from(i: i64) -> Self {
        Label::Integer(i)
    }
}

impl From<i32> for Label {
    fn from(i: i32) -> Self {
        Label::Integer(i as i64)
    }
}

impl From<bool> for Label {
    fn from(b: bool) -> Self {
        Label::Boolean(b)
    }
}

/// Ordered set of labels indexed `0..K` in first-seen order
///
/// Labels are never removed, so an index handed out once stays valid for
/// the lifetime of the model.
#[derive(Debug, Clone, Default)]
pub struct LabelSet {
    labels: Vec<Label>,
    index: HashMap<Label, usize>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn index_of(&self, label: &Label) -> Option<usize> {
        self.index.get(label).copied()
    }

    /// Decode a class index back to its label
    pub fn label(&self, index: usize) -> Result<&Label> {
        self.labels
            .get(index)
            .ok_or(ClassifierError::UnknownClassIndex {
                index,
                classes: self.labels.len(),
            })
    }

    /// Return the index of `label`, appending it if unseen
    ///
    /// The boolean is `true` when the label was added by this call.
    pub fn intern(&mut self, label: &Label) -> (usize, bool) {
        if let Some(idx) = self.index.get(label) {
            return (*idx, false);
        }
        let idx = self.labels.len();
        self.labels.push(label.clone());
        self.index.insert(label.clone(), idx);
        (idx, true)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.labels.iter()
    }

    pub fn to_vec(&self) -> Vec<Label> {
        self.labels.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_seen_order() {
        let mut set = LabelSet::new();
        assert_eq!(set.intern(&"b".into()), (0, true));
        assert_eq!(set.intern(&"a".into()), (1, true));
        assert_eq!(set.intern(&"b".into()), (0, false));
        assert_eq!(set.len(), 2);
        assert_eq!(set.label(1).unwrap(), &Label::from("a"));
    }

    #[test]
    fn test_unknown_index() {
        let mut set = LabelSet::new();
        set.intern(&Label::from(7));
        match set.label(3) {
            Err(ClassifierError::UnknownClassIndex { index, classes }) => {
                assert_eq!(index, 3);
                assert_eq!(classes, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_label_kinds_are_distinct() {
        let mut set = LabelSet::new();
        set.intern(&Label::from(1));
        set.intern(&Label::from("1"));
        set.intern(&Label::from(true));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_label_json_forms() {
        let labels: Vec<Label> = serde_json::from_str(r#"["A", 3, false]"#).unwrap();
        assert_eq!(
            labels,
            vec![Label::from("A"), Label::from(3), Label::from(false)]
        );
        assert_eq!(Label::from("spam").to_string(), "spam");
    }
}
