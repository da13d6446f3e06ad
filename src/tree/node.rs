//! Category tree nodes.

use std::collections::BTreeMap;
use std::sync::Arc;

use ahash::AHashMap;

use crate::classifier::{KnnClassifier, NaiveBayesClassifier, TextClassifier};
use crate::index::document::category_id;

/// Name of the sentinel root node.
pub const ROOT_NAME: &str = "root";

/// Handle of a node in its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The trained classifier pair of a node for one language.
#[derive(Debug, Clone)]
pub struct NodeClassifiers {
    pub bayes: NaiveBayesClassifier,
    pub knn: KnnClassifier,
}

impl NodeClassifiers {
    pub fn get(&self, use_knn: bool) -> &dyn TextClassifier {
        if use_knn { &self.knn } else { &self.bayes }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryNode {
    pub(crate) name: Arc<str>,
    pub(crate) id: i32,
    pub(crate) k: usize,
    pub(crate) depth: usize,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: BTreeMap<Arc<str>, NodeId>,
    pub(crate) reverse: AHashMap<i32, Arc<str>>,
    pub(crate) classifiers: AHashMap<String, NodeClassifiers>,
    pub(crate) labels: BTreeMap<String, String>,
}

impl CategoryNode {
    pub(crate) fn new(name: Arc<str>, k: usize, depth: usize, parent: Option<NodeId>) -> Self {
        CategoryNode {
            id: category_id(&name),
            name,
            k,
            depth,
            parent,
            children: BTreeMap::new(),
            reverse: AHashMap::new(),
            classifiers: AHashMap::new(),
            labels: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shared_name(&self) -> &Arc<str> {
        &self.name
    }

    /// Numeric category id of the name.
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Category level, 1 to 4. `None` for the root.
    pub fn level(&self) -> Option<usize> {
        (self.depth > 0).then_some(self.depth)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }

    /// Child names in sorted order.
    pub fn children_names(&self) -> Vec<&str> {
        self.children.keys().map(|name| name.as_ref()).collect()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Child name for a numeric id returned by this node's classifiers.
    pub fn name_from_id(&self, id: i32) -> Option<&Arc<str>> {
        self.reverse.get(&id)
    }

    /// Display label in `language`, or the node name if none is set.
    pub fn label(&self, language: &str) -> &str {
        self.labels
            .get(language)
            .map(String::as_str)
            .unwrap_or(&self.name)
    }

    pub fn set_label<S: Into<String>>(&mut self, language: &str, label: S) {
        self.labels.insert(language.to_string(), label.into());
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn classifiers(&self, language: &str) -> Option<&NodeClassifiers> {
        self.classifiers.get(language)
    }

    pub fn is_trained(&self, language: &str) -> bool {
        self.classifiers.contains_key(language)
    }

    pub fn trained_languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.classifiers.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_basics() {
        let mut node = CategoryNode::new(Arc::from("Sport"), 3, 1, Some(NodeId(0)));
        assert_eq!(node.name(), "Sport");
        assert_eq!(node.id(), category_id("Sport"));
        assert_eq!(node.level(), Some(1));
        assert!(!node.is_root());
        assert!(!node.has_children());

        assert_eq!(node.label("it"), "Sport");
        node.set_label("it", "Sport (IT)");
        assert_eq!(node.label("it"), "Sport (IT)");
        assert_eq!(node.label("en"), "Sport");
        assert!(!node.is_trained("it"));
    }

    #[test]
    fn test_root_has_no_level() {
        let root = CategoryNode::new(Arc::from(ROOT_NAME), 1, 0, None);
        assert!(root.is_root());
        assert_eq!(root.level(), None);
    }
}
