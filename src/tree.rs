//! Category tree.
//!
//! Nodes live in an arena and refer to each other through [`NodeId`]
//! handles. The root is a sentinel named `root`; its children are the
//! first-level categories and the tree is at most four levels deep. Each
//! node keeps, per language, the classifier pair that decides between its
//! children.

use std::sync::Arc;

use log::{debug, warn};

use crate::analysis::analyzer::analyzer::Analyzer;
use crate::classifier::{KnnClassifier, NaiveBayesClassifier, TextClassifier, TrainingCorpus, TrainingScope};
use crate::error::{Result, TaxisError};
use crate::index::document::{MAX_LEVELS, category_id};
use crate::index::reader::IndexReader;
use crate::intern::InternPool;

pub mod delimited;
pub mod node;
pub mod xml;

pub use node::{CategoryNode, NodeClassifiers, NodeId, ROOT_NAME};

#[derive(Debug, Clone)]
pub struct CategoryTree {
    nodes: Vec<Option<CategoryNode>>,
    free: Vec<usize>,
    k: usize,
    pool: Arc<InternPool>,
}

impl CategoryTree {
    /// An empty tree whose new nodes use `k` neighbours.
    pub fn new(k: usize, pool: Arc<InternPool>) -> Self {
        let root = CategoryNode::new(pool.intern(ROOT_NAME), k.max(1), 0, None);
        CategoryTree {
            nodes: vec![Some(root)],
            free: Vec::new(),
            k: k.max(1),
            pool,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn pool(&self) -> &Arc<InternPool> {
        &self.pool
    }

    pub fn node(&self, id: NodeId) -> Option<&CategoryNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut CategoryNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn root_node(&self) -> &CategoryNode {
        match self.nodes.first().and_then(Option::as_ref) {
            Some(root) => root,
            None => unreachable!("the root node is never removed"),
        }
    }

    /// Nodes in the tree, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.root_node().has_children()
    }

    /// The node reached by walking `path` from the root. An empty path is
    /// the root.
    pub fn get_node<S: AsRef<str>>(&self, path: &[S]) -> Option<NodeId> {
        let mut current = self.root();
        for name in path {
            current = self.node(current)?.child(name.as_ref().trim())?;
        }
        Some(current)
    }

    /// Names from the first level down to `id`.
    pub fn path_of(&self, id: NodeId) -> Vec<Arc<str>> {
        let mut names = Vec::new();
        let mut current = self.node(id);
        while let Some(node) = current {
            if node.is_root() {
                break;
            }
            names.push(Arc::clone(&node.name));
            current = node.parent.and_then(|parent| self.node(parent));
        }
        names.reverse();
        names
    }

    /// Numeric ids from the first level down to `id`.
    pub fn path_ids(&self, id: NodeId) -> Vec<i32> {
        self.path_of(id)
            .iter()
            .map(|name| category_id(name))
            .collect()
    }

    /// Leaf paths in depth-first order with children sorted by name.
    pub fn leaf_paths(&self) -> Vec<Vec<Arc<str>>> {
        let mut paths = Vec::new();
        self.collect_leaves(self.root(), &mut Vec::new(), &mut paths);
        paths
    }

    fn collect_leaves(
        &self,
        id: NodeId,
        prefix: &mut Vec<Arc<str>>,
        paths: &mut Vec<Vec<Arc<str>>>,
    ) {
        let Some(node) = self.node(id) else {
            return;
        };
        if !node.is_root() {
            prefix.push(Arc::clone(&node.name));
        }
        if node.has_children() {
            for child in node.children() {
                self.collect_leaves(child, prefix, paths);
            }
        } else if !prefix.is_empty() {
            paths.push(prefix.clone());
        }
        if !node.is_root() {
            prefix.pop();
        }
    }

    /// Every category name in the tree, sorted and deduplicated.
    pub fn categories(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self
            .nodes
            .iter()
            .flatten()
            .filter(|node| !node.is_root())
            .map(|node| Arc::clone(&node.name))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Create the child `name` of `parent` with neighbour count `k`.
    ///
    /// Fails with [`TaxisError::DuplicateNode`] if the name is taken and with
    /// a tree error if its id collides with a sibling's id.
    pub fn create_child(&mut self, parent: NodeId, name: &str, k: usize) -> Result<NodeId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TaxisError::invalid_argument("empty category name"));
        }
        let parent_node = self
            .node(parent)
            .ok_or_else(|| TaxisError::node_not_found(format!("node #{}", parent.0)))?;
        if parent_node.depth >= MAX_LEVELS {
            return Err(TaxisError::tree(format!(
                "cannot add {name} below level {MAX_LEVELS}"
            )));
        }
        if parent_node.children.contains_key(name) {
            return Err(TaxisError::duplicate_node(name));
        }
        let id = category_id(name);
        if let Some(existing) = parent_node.reverse.get(&id) {
            warn!(
                "Category {name} has the same id ({id}) as its sibling {existing}; not added"
            );
            return Err(TaxisError::tree(format!(
                "id collision between {name} and {existing}"
            )));
        }

        let shared = self.pool.intern(name);
        let node = CategoryNode::new(Arc::clone(&shared), k.max(1), parent_node.depth + 1, Some(parent));
        let child = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };

        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.insert(Arc::clone(&shared), child);
            parent_node.reverse.insert(id, shared);
        }
        Ok(child)
    }

    /// Get the child `name` of `parent`, creating it if needed.
    pub fn get_or_create_child(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        if let Some(child) = self.node(parent).and_then(|node| node.child(name.trim())) {
            return Ok(child);
        }
        self.create_child(parent, name, self.k)
    }

    /// Add the last name of `path` as a new node, walking the names before it
    /// from position `depth` (the names before `depth` locate the start node).
    pub fn add_child<S: AsRef<str>>(&mut self, path: &[S], depth: usize) -> Result<NodeId> {
        if path.is_empty() {
            return Err(TaxisError::invalid_argument("empty category path"));
        }
        if path.len() > MAX_LEVELS {
            return Err(TaxisError::tree(format!(
                "paths are at most {MAX_LEVELS} levels deep"
            )));
        }
        let depth = depth.min(path.len() - 1);
        let start = self
            .get_node(&path[..depth])
            .ok_or_else(|| TaxisError::node_not_found(join(&path[..depth])))?;
        self.add_below(start, path, depth)
    }

    fn add_below<S: AsRef<str>>(&mut self, node: NodeId, path: &[S], depth: usize) -> Result<NodeId> {
        let name = path[depth].as_ref();
        if depth + 1 == path.len() {
            let k = self.k;
            let child = self.create_child(node, name, k)?;
            debug!("Added category {}", join(path));
            return Ok(child);
        }
        let child = self
            .node(node)
            .and_then(|n| n.child(name.trim()))
            .ok_or_else(|| TaxisError::node_not_found(join(&path[..=depth])))?;
        self.add_below(child, path, depth + 1)
    }

    /// Remove the node named by `path` and its subtree, walking from position
    /// `depth`. Missing nodes are ignored. Returns whether a node was removed.
    pub fn remove_child<S: AsRef<str>>(&mut self, path: &[S], depth: usize) -> bool {
        if path.is_empty() || depth >= path.len() {
            return false;
        }
        let Some(start) = self.get_node(&path[..depth]) else {
            return false;
        };
        self.remove_below(start, path, depth)
    }

    fn remove_below<S: AsRef<str>>(&mut self, node: NodeId, path: &[S], depth: usize) -> bool {
        let Some(child) = self.node(node).and_then(|n| n.child(path[depth].as_ref().trim())) else {
            return false;
        };
        if depth + 1 < path.len() {
            return self.remove_below(child, path, depth + 1);
        }

        let name = path[depth].as_ref().trim();
        let removed = self.node_mut(node).and_then(|parent| {
            let removed = parent.children.remove(name)?;
            parent.reverse.remove(&category_id(name));
            Some(removed)
        });
        match removed {
            Some(removed) => {
                self.free_subtree(removed);
                debug!("Removed category {}", join(path));
                true
            }
            None => false,
        }
    }

    fn free_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        for child in node.children.into_values() {
            self.free_subtree(child);
        }
        self.free.push(id.0);
    }

    /// Add the node named by a full path from the root.
    pub fn add_node<S: AsRef<str>>(&mut self, path: &[S]) -> Result<NodeId> {
        self.add_child(path, 0)
    }

    /// Remove the node named by a full path from the root.
    pub fn remove_node<S: AsRef<str>>(&mut self, path: &[S]) -> bool {
        self.remove_child(path, 0)
    }

    /// Training scope of `id`: the documents below it, labeled one level down.
    pub fn scope_of(&self, id: NodeId) -> TrainingScope {
        TrainingScope::for_prefix(self.path_ids(id))
    }

    /// Train the classifier pair of `id` for `language` from `reader`.
    pub fn train(
        &mut self,
        id: NodeId,
        reader: &IndexReader,
        analyzer: &dyn Analyzer,
        language: &str,
    ) -> Result<bool> {
        let corpus = TrainingCorpus::from_reader(reader, analyzer)?;
        self.train_with_corpus(id, &corpus, language)
    }

    /// Train the classifier pair of `id` from an analyzed corpus. Level-4
    /// nodes have no level below them and are left untrained.
    pub fn train_with_corpus(
        &mut self,
        id: NodeId,
        corpus: &TrainingCorpus,
        language: &str,
    ) -> Result<bool> {
        let scope = self.scope_of(id);
        if !scope.is_trainable() {
            return Ok(false);
        }
        let k = self
            .node(id)
            .map(CategoryNode::k)
            .ok_or_else(|| TaxisError::node_not_found(format!("node #{}", id.0)))?;

        let mut bayes = NaiveBayesClassifier::new();
        bayes.train(corpus, &scope)?;
        let mut knn = KnnClassifier::new(k)?;
        knn.train(corpus, &scope)?;
        debug!(
            "Trained node {} for {language}: {} labels",
            join(&self.path_of(id)),
            bayes.label_count()
        );

        if let Some(node) = self.node_mut(id) {
            node.classifiers
                .insert(language.to_string(), NodeClassifiers { bayes, knn });
        }
        Ok(true)
    }

    /// Drop the trained classifiers of every node.
    pub fn clear_classifiers(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            node.classifiers.clear();
        }
    }
}

fn join<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|name| name.as_ref())
        .collect::<Vec<_>>()
        .join(">")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::CorpusDocument;
    use crate::index::document::{CategoryPath, category_id};

    fn tree() -> CategoryTree {
        CategoryTree::new(1, Arc::new(InternPool::new()))
    }

    #[test]
    fn test_add_and_get() {
        let mut tree = tree();
        tree.add_node(&["A"]).unwrap();
        tree.add_node(&["A", "B"]).unwrap();
        let c = tree.add_node(&["A", "B", "C"]).unwrap();

        assert_eq!(tree.node_count(), 4);
        assert_eq!(tree.get_node(&["A", "B", "C"]), Some(c));
        assert_eq!(tree.node(c).unwrap().level(), Some(3));
        let names = tree.path_of(c);
        let path: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        assert_eq!(path, vec!["A", "B", "C"]);

        let a = tree.get_node(&["A"]).unwrap();
        let a_node = tree.node(a).unwrap();
        assert_eq!(a_node.children_names(), vec!["B"]);
        assert_eq!(
            a_node.name_from_id(category_id("B")).map(|n| n.as_ref()),
            Some("B")
        );
    }

    #[test]
    fn test_duplicate_sibling_is_rejected() {
        let mut tree = tree();
        tree.add_node(&["A"]).unwrap();
        let before = tree.node_count();
        assert!(matches!(
            tree.add_node(&["A"]),
            Err(TaxisError::DuplicateNode(_))
        ));
        assert_eq!(tree.node_count(), before);
    }

    #[test]
    fn test_colliding_sibling_is_rejected() {
        let mut tree = tree();
        tree.add_node(&["Aa"]).unwrap();
        assert!(matches!(tree.add_node(&["BB"]), Err(TaxisError::Tree(_))));
        assert!(tree.get_node(&["BB"]).is_none());
        // Different parents do not collide.
        tree.add_node(&["Aa", "BB"]).unwrap();
    }

    #[test]
    fn test_missing_intermediate_node() {
        let mut tree = tree();
        assert!(matches!(
            tree.add_node(&["A", "B"]),
            Err(TaxisError::NodeNotFound(_))
        ));
        assert!(!tree.remove_node(&["A", "B"]));
    }

    #[test]
    fn test_depth_limit() {
        let mut tree = tree();
        for depth in 1..=4 {
            let path: Vec<String> = (0..depth).map(|i| format!("L{i}")).collect();
            tree.add_node(&path).unwrap();
        }
        assert!(tree.add_node(&["L0", "L1", "L2", "L3", "L4"]).is_err());
    }

    #[test]
    fn test_remove_subtree() {
        let mut tree = tree();
        tree.add_node(&["A"]).unwrap();
        tree.add_node(&["A", "B"]).unwrap();
        tree.add_node(&["A", "B", "C"]).unwrap();
        tree.add_node(&["A", "D"]).unwrap();

        assert!(tree.remove_node(&["A", "B"]));
        assert_eq!(tree.node_count(), 3);
        assert!(tree.get_node(&["A", "B", "C"]).is_none());
        let a = tree.node(tree.get_node(&["A"]).unwrap()).unwrap();
        assert!(a.name_from_id(category_id("B")).is_none());

        // Freed slots are reused.
        tree.add_node(&["A", "E"]).unwrap();
        assert_eq!(tree.node_count(), 4);
    }

    #[test]
    fn test_add_child_from_depth() {
        let mut tree = tree();
        tree.add_node(&["A"]).unwrap();
        tree.add_child(&["A", "B"], 1).unwrap();
        assert!(tree.get_node(&["A", "B"]).is_some());
        assert!(tree.remove_child(&["A", "B"], 1));
    }

    #[test]
    fn test_add_then_remove_restores_shape() {
        let mut tree = tree();
        tree.add_node(&["A"]).unwrap();
        tree.add_node(&["A", "X"]).unwrap();
        tree.add_node(&["B"]).unwrap();
        let document = tree.to_document().unwrap();
        let leaves = tree.leaf_paths();
        let count = tree.node_count();

        tree.add_child(&["A", "X", "Y"], 2).unwrap();
        assert!(tree.remove_child(&["A", "X", "Y"], 2));
        assert_eq!(tree.to_document().unwrap(), document);

        // The removed node carries its own subtree.
        tree.add_child(&["A", "C"], 1).unwrap();
        tree.add_child(&["A", "C", "D"], 2).unwrap();
        tree.add_child(&["A", "C", "D", "E"], 3).unwrap();
        assert_eq!(tree.node_count(), count + 3);
        assert!(tree.remove_child(&["A", "C"], 1));

        assert_eq!(tree.node_count(), count);
        assert_eq!(tree.leaf_paths(), leaves);
        assert_eq!(tree.to_document().unwrap(), document);
    }

    #[test]
    fn test_leaf_paths_and_categories() {
        let mut tree = tree();
        tree.add_node(&["B"]).unwrap();
        tree.add_node(&["A"]).unwrap();
        tree.add_node(&["A", "X"]).unwrap();

        let leaves: Vec<String> = tree.leaf_paths().iter().map(|path| join(path)).collect();
        assert_eq!(leaves, vec!["A>X", "B"]);
        let categories = tree.categories();
        let names: Vec<&str> = categories.iter().map(|n| n.as_ref()).collect();
        assert_eq!(names, vec!["A", "B", "X"]);
    }

    #[test]
    fn test_train_with_corpus() {
        let mut tree = tree();
        let a = tree.add_node(&["A"]).unwrap();
        tree.add_node(&["A", "B"]).unwrap();
        tree.add_node(&["A", "B", "C"]).unwrap();
        let d = tree.add_node(&["A", "B", "C", "D"]).unwrap();

        let corpus = TrainingCorpus::new(vec![CorpusDocument {
            path: CategoryPath::from_names(["A", "B", "C", "D"], None),
            terms: vec!["x".to_string()],
        }]);

        assert!(tree.train_with_corpus(tree.root(), &corpus, "en").unwrap());
        assert!(tree.train_with_corpus(a, &corpus, "en").unwrap());
        assert!(!tree.train_with_corpus(d, &corpus, "en").unwrap());

        let root = tree.root_node();
        assert!(root.is_trained("en"));
        let results = root
            .classifiers("en")
            .unwrap()
            .get(true)
            .classify(&["x".to_string()])
            .unwrap();
        assert_eq!(results[0].label, category_id("A"));
        assert!(!tree.node(d).unwrap().is_trained("en"));

        tree.clear_classifiers();
        assert!(!tree.root_node().is_trained("en"));
    }
}
