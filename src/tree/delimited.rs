//! Tab-separated tree export and import.
//!
//! Every leaf becomes one row holding the names from the first level down,
//! separated by tabs and terminated by CRLF.

use std::sync::Arc;

use log::warn;

use crate::index::document::MAX_LEVELS;
use crate::intern::InternPool;
use crate::tree::CategoryTree;

const SEPARATOR: char = '\t';
const ROW_TERMINATOR: &str = "\r\n";

impl CategoryTree {
    /// One tab-separated row per leaf path.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();
        for path in self.leaf_paths() {
            let names: Vec<&str> = path.iter().map(|name| name.as_ref()).collect();
            csv.push_str(&names.join("\t"));
            csv.push_str(ROW_TERMINATOR);
        }
        csv
    }

    /// Build a tree from tab-separated rows. Missing ancestors are created,
    /// existing nodes are reused, and the first empty name ends a row.
    pub fn from_csv_rows<I, S>(rows: I, k: usize, pool: Arc<InternPool>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tree = CategoryTree::new(k, pool);
        for row in rows {
            let row = row.as_ref().trim_end_matches(['\r', '\n']);
            let mut current = tree.root();
            for name in row.split(SEPARATOR).take(MAX_LEVELS) {
                let name = name.trim();
                if name.is_empty() {
                    break;
                }
                match tree.get_or_create_child(current, name) {
                    Ok(child) => current = child,
                    Err(e) => {
                        warn!("Skipping row {row:?}: {e}");
                        break;
                    }
                }
            }
        }
        tree
    }

    /// Parse the output of [`CategoryTree::to_csv`].
    pub fn from_csv(csv: &str, k: usize, pool: Arc<InternPool>) -> Self {
        Self::from_csv_rows(csv.lines(), k, pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_round_trip() {
        let pool = Arc::new(InternPool::new());
        let mut tree = CategoryTree::new(1, Arc::clone(&pool));
        tree.add_node(&["Sport"]).unwrap();
        tree.add_node(&["Sport", "Calcio"]).unwrap();
        tree.add_node(&["Sport", "Calcio", "Serie A"]).unwrap();
        tree.add_node(&["Sport", "Tennis"]).unwrap();
        tree.add_node(&["Politica"]).unwrap();

        let csv = tree.to_csv();
        assert_eq!(
            csv,
            "Politica\r\nSport\tCalcio\tSerie A\r\nSport\tTennis\r\n"
        );

        let rebuilt = CategoryTree::from_csv(&csv, 1, pool);
        assert_eq!(rebuilt.leaf_paths(), tree.leaf_paths());
        assert_eq!(rebuilt.node_count(), tree.node_count());
    }

    #[test]
    fn test_rows_share_ancestors() {
        let rows = ["A\tB", "A\tC", "A\tB\tD", "", "E\t\tF"];
        let tree = CategoryTree::from_csv_rows(rows, 1, Arc::new(InternPool::new()));

        // root, A, B, C, D, E
        assert_eq!(tree.node_count(), 6);
        assert!(tree.get_node(&["A", "B", "D"]).is_some());
        assert!(tree.get_node(&["E", "F"]).is_none());
    }

    #[test]
    fn test_empty_tree_exports_nothing() {
        let tree = CategoryTree::new(1, Arc::new(InternPool::new()));
        assert!(tree.to_csv().is_empty());
    }
}
