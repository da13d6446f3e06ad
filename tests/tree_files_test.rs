#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use taxis::intern::InternPool;
    use taxis::tree::CategoryTree;

    fn sample_tree(pool: &Arc<InternPool>) -> CategoryTree {
        let mut tree = CategoryTree::new(3, Arc::clone(pool));
        for path in [
            vec!["Economia"],
            vec!["Economia", "Borsa"],
            vec!["Economia", "Borsa", "Azioni"],
            vec!["Economia", "Borsa", "Azioni", "Bancari"],
            vec!["Economia", "Lavoro"],
            vec!["Cronaca"],
            vec!["Cronaca", "Nera <locale>"],
        ] {
            tree.add_node(&path).unwrap();
        }
        let borsa = tree.get_node(&["Economia", "Borsa"]).unwrap();
        let node = tree.node_mut(borsa).unwrap();
        node.set_label("en", "Stock market");
        node.set_label("fr", "Bourse & marchés");
        tree
    }

    #[test]
    fn test_structure_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let pool = Arc::new(InternPool::new());
        let tree = sample_tree(&pool);
        let path = dir.path().join("structure.xml");

        tree.store(&path).unwrap();
        let loaded = CategoryTree::load_or_empty(&path, 1, Arc::clone(&pool));

        assert_eq!(loaded.node_count(), tree.node_count());
        assert_eq!(loaded.leaf_paths(), tree.leaf_paths());
        assert_eq!(loaded.to_document().unwrap(), tree.to_document().unwrap());

        let borsa = loaded
            .node(loaded.get_node(&["Economia", "Borsa"]).unwrap())
            .unwrap();
        assert_eq!(borsa.k(), 3);
        assert_eq!(borsa.label("fr"), "Bourse & marchés");
        assert_eq!(borsa.label("de"), "Borsa");
    }

    #[test]
    fn test_csv_round_trip() {
        let pool = Arc::new(InternPool::new());
        let tree = sample_tree(&pool);

        let csv = tree.to_csv();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("Economia\tBorsa\tAzioni\tBancari\r\n"));

        let rebuilt = CategoryTree::from_csv(&csv, 1, pool);
        assert_eq!(rebuilt.leaf_paths(), tree.leaf_paths());
        assert_eq!(rebuilt.to_csv(), csv);
    }

    #[test]
    fn test_missing_structure_file_gives_empty_tree() {
        let dir = TempDir::new().unwrap();
        let tree = CategoryTree::load_or_empty(
            dir.path().join("structure.xml"),
            1,
            Arc::new(InternPool::new()),
        );
        assert!(tree.is_empty());
        assert_eq!(tree.root_node().name(), "root");
    }

    #[test]
    fn test_structural_conflicts_leave_tree_unchanged() {
        let pool = Arc::new(InternPool::new());
        let mut tree = sample_tree(&pool);
        let before = tree.to_document().unwrap();

        assert!(tree.add_node(&["Economia", "Borsa"]).is_err());
        assert!(tree.add_node(&["Sport", "Calcio"]).is_err());
        assert!(tree.add_node(&["Economia", "Borsa", "Azioni", "Bancari", "Extra"]).is_err());
        assert_eq!(tree.to_document().unwrap(), before);

        assert!(tree.remove_node(&["Economia", "Borsa"]));
        assert!(tree.get_node(&["Economia", "Borsa", "Azioni"]).is_none());
        assert!(tree.get_node(&["Economia", "Lavoro"]).is_some());
    }
}
