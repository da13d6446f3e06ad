//! Command implementations for the taxis CLI.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};

use crate::analysis::token_filter::stop::default_stop_words;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::EngineConfig;
use crate::engine::{BatchClassifier, BatchOptions, CancellationToken, MulticlassEngine};
use crate::error::{Result, TaxisError};
use crate::index::IndexManager;
use crate::index::manager::STRUCTURE_FILE;
use crate::index::table::read_rows_from_path;
use crate::intern::InternPool;
use crate::tree::CategoryTree;

/// Execute a CLI command.
pub fn execute_command(args: TaxisArgs) -> Result<()> {
    let config = load_config(&args)?;
    match &args.command {
        Command::Build(build_args) => build_index(build_args, config, &args),
        Command::Add(add_args) => add_example(add_args, config, &args),
        Command::Remove(remove_args) => remove_examples(remove_args, config, &args),
        Command::Classify(classify_args) => classify_texts(classify_args, config, &args),
        Command::ExportTree(export_args) => export_tree(export_args, &config),
        Command::ImportTree(import_args) => import_tree(import_args, &config, &args),
        Command::Stopwords(stop_args) => stop_words(stop_args, config, &args),
        Command::Unlock(unlock_args) => unlock(unlock_args, config, &args),
    }
}

fn load_config(args: &TaxisArgs) -> Result<EngineConfig> {
    match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            EngineConfig::load(path)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Make sure `language` is handled even if the configuration omits it.
fn with_language(mut config: EngineConfig, language: &str) -> EngineConfig {
    if !config.supports(language) {
        warn!("Language {language} is not configured, adding it");
        config.languages.push(language.to_string());
    }
    config
}

fn ensure_root(root: &Path) -> Result<()> {
    if !root.is_dir() {
        fs::create_dir_all(root)?;
        info!("Created structure root {}", root.display());
    }
    Ok(())
}

fn ready_engine(config: EngineConfig, root: &Path, reindex: bool) -> Result<MulticlassEngine> {
    if !root.is_dir() {
        return Err(TaxisError::invalid_argument(format!(
            "structure root {} is not a directory",
            root.display()
        )));
    }
    let k = config.k;
    let mut engine = MulticlassEngine::new(config);
    if !engine.initialize(root, k, reindex) {
        warn!("Some languages failed to initialize, see the log for details");
    }
    Ok(engine)
}

fn build_index(args: &BuildArgs, config: EngineConfig, cli_args: &TaxisArgs) -> Result<()> {
    let language = args.target.language.as_str();
    let config = with_language(config, language);
    ensure_root(&args.target.root)?;

    let start = Instant::now();
    let delimiter = args.delimiter.unwrap_or(config.table_delimiter);
    let rows = read_rows_from_path(&args.table, delimiter)?;
    let manager = IndexManager::standalone(&args.target.root, &config);
    let documents_indexed = manager.build_from_table(
        &rows,
        args.stop_words.as_deref(),
        language,
        args.index_category_names,
    )?;

    let trained = if args.train {
        let engine = ready_engine(config, &args.target.root, false)?;
        Some(engine.tree().root_node().is_trained(language))
    } else {
        None
    };

    output_result(
        "Index built",
        &BuildResult {
            language: language.to_string(),
            rows: rows.len(),
            documents_indexed,
            duration_ms: start.elapsed().as_millis() as u64,
            trained,
        },
        cli_args,
    )
}

fn add_example(args: &AddArgs, config: EngineConfig, cli_args: &TaxisArgs) -> Result<()> {
    let language = args.target.language.as_str();
    let config = with_language(config, language);
    ensure_root(&args.target.root)?;

    let manager = IndexManager::standalone(&args.target.root, &config);
    let copies = manager.add_document(
        language,
        &args.text,
        &args.categories,
        args.replication,
        !args.no_tokenize,
    )?;

    output_result(
        "Example added",
        &AddResult {
            language: language.to_string(),
            path: args.categories.join(">"),
            copies,
        },
        cli_args,
    )
}

fn remove_examples(args: &RemoveArgs, config: EngineConfig, cli_args: &TaxisArgs) -> Result<()> {
    let language = args.target.language.as_str();
    let config = with_language(config, language);

    let result = if !args.ids.is_empty() {
        let manager = IndexManager::standalone(&args.target.root, &config);
        RemoveResult {
            documents_removed: manager.remove_by_ids(language, &args.ids)?,
            node_removed: false,
        }
    } else if args.categories.is_empty() {
        return Err(TaxisError::invalid_argument(
            "either --id or --category is required",
        ));
    } else if args.prune {
        let mut engine = ready_engine(config, &args.target.root, false)?;
        let present = engine.tree().get_node(&args.categories).is_some();
        RemoveResult {
            documents_removed: engine.remove_category(&args.categories)?,
            node_removed: present,
        }
    } else {
        let manager = IndexManager::standalone(&args.target.root, &config);
        RemoveResult {
            documents_removed: manager.remove_by_path(&args.categories)?,
            node_removed: false,
        }
    };

    output_result("Examples removed", &result, cli_args)
}

fn classify_texts(args: &ClassifyArgs, config: EngineConfig, cli_args: &TaxisArgs) -> Result<()> {
    let language = args.target.language.as_str();
    let mut config = with_language(config, language);
    if let Some(k) = args.k {
        config = config.with_k(k);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    let threshold = args.threshold.unwrap_or(config.threshold);

    let mut texts = args.texts.clone();
    if let Some(input) = &args.input {
        texts.extend(
            fs::read_to_string(input)?
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    if texts.is_empty() {
        return Err(TaxisError::invalid_argument("nothing to classify"));
    }

    let start = Instant::now();
    let batch = BatchClassifier::from_config(&config)?;
    let engine = ready_engine(config, &args.target.root, args.reindex)?;
    let outcome = batch.classify_all(
        &engine,
        &texts,
        &BatchOptions::new(language, threshold).with_knn(args.knn),
        &CancellationToken::new(),
        None,
    );

    let skipped = outcome.total - outcome.completed();
    let results = outcome
        .items
        .into_iter()
        .map(|item| ClassifiedText {
            text: texts[item.index].clone(),
            paths: item.paths,
        })
        .collect();

    output_classification(
        &ClassificationReport {
            language: language.to_string(),
            threshold,
            results,
            skipped,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

fn export_tree(args: &ExportTreeArgs, config: &EngineConfig) -> Result<()> {
    let tree = CategoryTree::load_or_empty(
        args.root.join(STRUCTURE_FILE),
        config.k,
        Arc::new(InternPool::new()),
    );
    let content = match args.tree_format {
        TreeFormat::Xml => tree.to_document()?,
        TreeFormat::Csv => tree.to_csv(),
    };

    match &args.output {
        Some(path) => {
            fs::write(path, content)?;
            info!("Exported {} nodes to {}", tree.node_count(), path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

fn import_tree(args: &ImportTreeArgs, config: &EngineConfig, cli_args: &TaxisArgs) -> Result<()> {
    ensure_root(&args.root)?;
    let csv = fs::read_to_string(&args.file)?;
    let tree = CategoryTree::from_csv(&csv, config.k, Arc::new(InternPool::new()));
    let structure_file = args.root.join(STRUCTURE_FILE);
    tree.store(&structure_file)?;

    output_result(
        "Category tree imported",
        &ImportResult {
            nodes: tree.node_count(),
            leaves: tree.leaf_paths().len(),
            structure_file: structure_file.to_string_lossy().to_string(),
        },
        cli_args,
    )
}

fn unlock(args: &UnlockArgs, config: EngineConfig, cli_args: &TaxisArgs) -> Result<()> {
    let language = args.target.language.as_str();
    let manager = IndexManager::standalone(&args.target.root, &with_language(config, language));
    let lock_removed = manager.break_write_lock(language)?;
    if !lock_removed {
        info!("No write lock on the {language} index");
    }

    output_result(
        "Index unlocked",
        &UnlockResult {
            language: language.to_string(),
            lock_removed,
        },
        cli_args,
    )
}

fn stop_words(args: &StopwordsArgs, config: EngineConfig, cli_args: &TaxisArgs) -> Result<()> {
    let language = args.target.language.as_str();
    let manager = IndexManager::standalone(&args.target.root, &with_language(config, language));

    let words = if args.defaults {
        let mut words: Vec<String> = default_stop_words(language).iter().cloned().collect();
        words.sort();
        words
    } else {
        if let Some(file) = &args.set {
            let words = IndexManager::read_stop_words(file)?;
            manager.store_stop_words(language, &words)?;
        }
        manager.analyzers().get(language)?.stop_words()
    };

    output_result(
        "Stop words",
        &StopWordList {
            language: language.to_string(),
            words,
        },
        cli_args,
    )
}
