use std::collections::BTreeSet;
use std::fs;

use tempfile::TempDir;

use taxis::config::EngineConfig;
use taxis::engine::{EngineState, MulticlassEngine, Technology};
use taxis::index::IndexManager;
use taxis::index::table::read_rows_from_path;

fn config() -> EngineConfig {
    EngineConfig::default().with_languages(["en"]).with_k(1)
}

fn news_root() -> TempDir {
    let dir = TempDir::new().unwrap();
    let table = dir.path().join("news.tsv");
    fs::write(
        &table,
        "Sport\tFootball\t\tstriker scores a late goal in the derby\n\
         Sport\tFootball\t\tthe league title race and a penalty goal\n\
         Sport\tFootball\tTransfers\tclub signs striker for a record transfer fee\n\
         Sport\tFootball\tTransfers\ttransfer window fee agreed for the midfielder\n\
         Sport\tTennis\t\tserve and volley wins the final set\n\
         Sport\tTennis\t\tace on match point at the open court\n\
         Politics\tElections\t\tvoters head to the polls for the election\n\
         Politics\tElections\t\tcandidate wins the election by a narrow vote\n\
         Politics\tGovernment\t\tminister presents the budget to parliament\n\
         Politics\tGovernment\t\tparliament approves the government reform\n",
    )
    .unwrap();

    let rows = read_rows_from_path(&table, '\t').unwrap();
    let manager = IndexManager::standalone(dir.path(), &config());
    manager.build_from_table(&rows, None, "en", false).unwrap();
    dir
}

fn ready(dir: &TempDir) -> MulticlassEngine {
    let mut engine = MulticlassEngine::new(config());
    assert!(engine.initialize(dir.path(), 1, false));
    engine
}

#[test]
fn test_replicated_chain_classifies_to_the_leaf() {
    let dir = TempDir::new().unwrap();
    let manager = IndexManager::standalone(dir.path(), &config());
    manager
        .add_document("en", "foo bar", &["A", "B", "C", "D"], 5, true)
        .unwrap();

    let engine = ready(&dir);
    let path = engine.knn_classify("foo bar", 0.5, "en").unwrap();

    assert_eq!(path.technology(), Technology::Knn);
    assert_eq!(path.depth(), 4);
    assert_eq!(path.to_class_string(), "A>B>C>D");
    assert_eq!(path.leaf().map(|step| step.name.as_ref()), Some("D"));
    for level in 0..4 {
        assert!(path.node_score(level).unwrap() >= 0.5);
    }
}

#[test]
fn test_threshold_above_any_score_stops_at_first_level() {
    let dir = news_root();
    let engine = ready(&dir);

    for use_knn in [false, true] {
        let paths = engine
            .classify("striker signs for a transfer fee", 1.1, "en", use_knn)
            .unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].depth(), 1);
        assert_eq!(paths[0].node_name(0), Some("Sport"));
    }
}

#[test]
fn test_cascade_is_monotonic_in_threshold() {
    let dir = news_root();
    let engine = ready(&dir);
    let text = "the club agreed a transfer fee for the striker";

    for use_knn in [false, true] {
        let mut previous: Option<Vec<String>> = None;
        for threshold in [0.0, 0.25, 0.5, 0.75, 1.0, 1.1] {
            let paths = engine.classify(text, threshold, "en", use_knn).unwrap();
            let names: Vec<String> = paths[0].names().into_iter().map(str::to_string).collect();
            assert!(!names.is_empty());
            if let Some(previous) = &previous {
                assert!(names.len() <= previous.len());
                assert_eq!(&previous[..names.len()], names.as_slice());
            }
            previous = Some(names);
        }
    }
}

#[test]
fn test_deep_classification() {
    let dir = news_root();
    let engine = ready(&dir);

    let paths = engine
        .bayes_classify("record transfer fee for the striker", 0.0, "en")
        .unwrap();
    assert_eq!(paths[0].to_class_string(), "Sport>Football>Transfers");

    let knn = engine
        .knn_classify("parliament approves the budget", 0.0, "en")
        .unwrap();
    assert_eq!(knn.to_class_string(), "Politics>Government");
}

#[test]
fn test_second_bayes_path_needs_threshold() {
    let dir = news_root();
    let engine = ready(&dir);

    let paths = engine.bayes_classify("goal", 0.0, "en").unwrap();
    assert_eq!(paths.len(), 2);
    assert_eq!(paths[1].node_name(0), Some("Politics"));

    let paths = engine.bayes_classify("goal", 0.99, "en").unwrap();
    assert_eq!(paths.len(), 1);
}

#[test]
fn test_unknown_language_keeps_engine_ready() {
    let dir = news_root();
    let engine = ready(&dir);

    assert!(engine.classify("goal", 0.5, "de", false).is_none());
    assert!(engine.knn_classify("goal", 0.5, "zz").is_none());
    assert_eq!(engine.state(), EngineState::Ready);
    assert!(engine.bayes_classify("goal", 0.5, "en").is_some());
}

#[test]
fn test_removed_subtree_is_not_rebuilt() {
    let dir = news_root();
    let mut engine = ready(&dir);
    assert!(engine.tree().get_node(&["Sport", "Football", "Transfers"]).is_some());

    let removed = engine.remove_category(&["Sport", "Football"]).unwrap();
    assert_eq!(removed, 4);

    assert!(engine.initialize(dir.path(), 1, false));
    let tree = engine.tree();
    assert!(tree.get_node(&["Sport", "Football"]).is_none());
    let sport = tree.node(tree.get_node(&["Sport"]).unwrap()).unwrap();
    assert_eq!(sport.children_names(), vec!["Tennis"]);

    for path in engine.bayes_classify("striker goal", 0.0, "en").unwrap() {
        assert_ne!(path.node_name(1), Some("Football"));
    }
}

#[test]
fn test_add_then_remove_restores_the_corpus() {
    let dir = news_root();
    let config = config();
    let manager = IndexManager::standalone(dir.path(), &config);
    let ids = |manager: &IndexManager| -> BTreeSet<String> {
        manager
            .open_reader("en")
            .unwrap()
            .unwrap()
            .live_documents()
            .map(|document| document.id.clone())
            .collect()
    };

    let before = ids(&manager);
    manager
        .add_document("en", "a brand new example", &["Sport", "Tennis"], 1, true)
        .unwrap();
    let after_add = ids(&manager);
    assert_eq!(after_add.len(), before.len() + 1);

    let added: Vec<&String> = after_add.difference(&before).collect();
    assert_eq!(added.len(), 1);
    assert_eq!(manager.remove_by_id("en", added[0]).unwrap(), 1);
    assert_eq!(ids(&manager), before);
}

#[test]
fn test_reinitialization_state() {
    let dir = news_root();
    let mut engine = ready(&dir);
    let first: Vec<String> = engine
        .bayes_classify("serve and volley", 0.5, "en")
        .unwrap()
        .iter()
        .map(|path| path.to_string())
        .collect();

    assert!(engine.initialize(dir.path(), 1, false));
    assert!(engine.is_ready());
    let second: Vec<String> = engine
        .bayes_classify("serve and volley", 0.5, "en")
        .unwrap()
        .iter()
        .map(|path| path.to_string())
        .collect();
    assert_eq!(first, second);
}
