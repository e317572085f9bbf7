//! CLI Tooling
//!
//! Command-line interface over a snapshot-backed tree cache: list a projected
//! subtree, summarize tags, or follow the tree as the snapshot changes.

use crate::cache::{Listener, TreeCache};
use crate::config::{ConfigLoader, NoteTreeConfig};
use crate::error::{ApiError, StoreError};
use crate::render::{render_outline, OutlineOptions};
use crate::store::{FileRecordStore, RecordStore};
use crate::tree::{Forest, TreeNode};
use crate::views::{self, ViewPolicy};
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// NoteTree CLI - browse a container/item hierarchy
#[derive(Parser)]
#[command(name = "notetree")]
#[command(about = "Browse and follow a container/item tree built from a record snapshot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Record snapshot file (overrides `snapshot` from config)
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the subtree at PATH
    Ls {
        /// Absolute label path, e.g. /Work/Projects
        path: Option<String>,
        /// Levels to include below PATH
        #[arg(long)]
        depth: Option<u32>,
        /// Keep only items carrying this tag ("" for untagged items)
        #[arg(long)]
        tag: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Item label shown as its container's link
        #[arg(long)]
        index_label: Option<String>,
    },
    /// List tags with the number of items carrying each
    Tags {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Re-print the subtree at PATH after every rebuild until Ctrl-C
    Watch {
        path: Option<String>,
        #[arg(long)]
        depth: Option<u32>,
        #[arg(long)]
        tag: Option<String>,
    },
}

/// CLI context: resolved configuration plus the snapshot it points at
pub struct CliContext {
    config: NoteTreeConfig,
    /// Style outline output (stdout is a terminal and NO_COLOR is unset)
    color: bool,
}

impl CliContext {
    /// Load configuration and fold CLI overrides into it
    pub fn new(cli: &Cli) -> Result<Self, ApiError> {
        let mut config = match &cli.config {
            Some(path) => ConfigLoader::load_with_file(path)?,
            None => ConfigLoader::load()?,
        };

        if let Some(snapshot) = &cli.snapshot {
            config.snapshot = Some(snapshot.clone());
        }
        if let Some(level) = &cli.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &cli.log_format {
            config.logging.format = format.clone();
        }
        if let Some(output) = &cli.log_output {
            config.logging.output = output.clone();
        }
        if let Some(file) = &cli.log_file {
            config.logging.file = Some(file.clone());
        }

        let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Ok(Self { config, color })
    }

    /// Context over an already resolved configuration; output is never styled
    pub fn from_config(config: NoteTreeConfig) -> Self {
        Self {
            config,
            color: false,
        }
    }

    pub fn config(&self) -> &NoteTreeConfig {
        &self.config
    }

    /// Execute a CLI command, returning the text to print
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Ls {
                path,
                depth,
                tag,
                format,
                index_label,
            } => {
                let policy = self.view_policy(path.as_deref(), *depth, tag.as_deref());
                views::split_path(&policy.path)?;
                let (_, cache) = self.open_cache().await?;
                let result = cache.project_view(&policy);
                cache.teardown();
                let forest = result?;

                if format == "json" {
                    return to_json(&forest);
                }
                let mut options = self.outline_options();
                if let Some(label) = index_label {
                    options.index_label = Some(label.clone()).filter(|l| !l.is_empty());
                }
                Ok(format_outline(&forest, &policy, &options))
            }
            Commands::Tags { format } => {
                let (_, cache) = self.open_cache().await?;
                let rows = tag_rows(&cache);
                cache.teardown();
                let rows = rows?;

                if format == "json" {
                    let arr: Vec<serde_json::Value> = rows
                        .iter()
                        .map(|r| {
                            serde_json::json!({
                                "id": r.id,
                                "name": r.name,
                                "items": r.items,
                            })
                        })
                        .collect();
                    return serde_json::to_string_pretty(&arr)
                        .map_err(|e| ApiError::from(StoreError::from(e)));
                }
                Ok(format_tag_table(&rows))
            }
            Commands::Watch { path, depth, tag } => {
                let policy = self.view_policy(path.as_deref(), *depth, tag.as_deref());
                views::split_path(&policy.path)?;
                self.watch(policy).await
            }
        }
    }

    fn view_policy(&self, path: Option<&str>, depth: Option<u32>, tag: Option<&str>) -> ViewPolicy {
        ViewPolicy {
            path: path.unwrap_or(&self.config.view.path).to_string(),
            depth: depth.unwrap_or(self.config.view.depth),
            tag: tag.map(str::to_string),
        }
    }

    fn outline_options(&self) -> OutlineOptions {
        let view = &self.config.view;
        OutlineOptions {
            index_label: Some(view.index_label.clone()).filter(|l| !l.is_empty()),
            show_links: view.show_links,
            color: self.color,
            ..OutlineOptions::default()
        }
    }

    /// Open the configured snapshot and load a cache over it
    async fn open_cache(&self) -> Result<(Arc<FileRecordStore>, TreeCache), ApiError> {
        let path = self.config.snapshot.clone().ok_or_else(|| {
            ApiError::ConfigError(
                "No snapshot configured; pass --snapshot or set `snapshot` in config".to_string(),
            )
        })?;
        let store = Arc::new(FileRecordStore::open(path));
        if !store.is_loaded() {
            return Err(ApiError::StorageError(StoreError::Unavailable(format!(
                "could not load snapshot {}",
                store.path().display()
            ))));
        }
        let cache = TreeCache::new(Arc::clone(&store) as Arc<dyn RecordStore>);
        cache.init().await;
        Ok((store, cache))
    }

    async fn watch(&self, policy: ViewPolicy) -> Result<String, ApiError> {
        let (store, cache) = self.open_cache().await?;
        store.watch(Duration::from_millis(self.config.watch.debounce_ms))?;

        let options = self.outline_options();
        println!("{}", format_outline(&cache.project_view(&policy)?, &policy, &options));

        let listener_policy = policy.clone();
        let listener: Listener = Arc::new(move |cache: &TreeCache| {
            match cache.project_view(&listener_policy) {
                Ok(forest) => {
                    let heading = format!("-- rebuilt ({} nodes) --", cache.node_count());
                    let heading = if options.color {
                        heading.dimmed().to_string()
                    } else {
                        heading
                    };
                    println!("{}\n{}", heading, format_outline(&forest, &listener_policy, &options));
                }
                Err(e) => eprintln!("Error: {}", e),
            }
        });
        cache.subscribe(Arc::clone(&listener));
        info!(path = %policy.path, "Watching snapshot; press Ctrl-C to stop");

        let signal = tokio::signal::ctrl_c().await;

        cache.unsubscribe(&listener);
        cache.teardown();
        store.unwatch();
        signal.map_err(|e| ApiError::StorageError(StoreError::IoError(e)))?;
        Ok("Stopped watching".to_string())
    }
}

/// One row of the tag summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    pub id: String,
    pub name: String,
    pub items: usize,
}

fn tag_rows(cache: &TreeCache) -> Result<Vec<TagRow>, ApiError> {
    let mut tags = cache.tags();
    tags.sort_by(|a, b| a.name.cmp(&b.name));

    let mut rows = Vec::with_capacity(tags.len() + 1);
    for tag in tags {
        let forest = cache.project("/", views::UNLIMITED_DEPTH, Some(tag.name.as_str()))?;
        rows.push(TagRow {
            id: tag.id,
            name: tag.name,
            items: count_items(forest.roots.iter()),
        });
    }
    let untagged = cache.project("/", views::UNLIMITED_DEPTH, Some(""))?;
    rows.push(TagRow {
        id: String::new(),
        name: String::new(),
        items: count_items(untagged.roots.iter()),
    });
    Ok(rows)
}

fn count_items<'a>(nodes: impl Iterator<Item = &'a TreeNode>) -> usize {
    nodes
        .map(|node| match node {
            TreeNode::Item(_) => 1,
            TreeNode::Container(c) => count_items(c.children.iter()),
        })
        .sum()
}

fn format_tag_table(rows: &[TagRow]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Tag", "ID", "Items"]);
    for row in rows {
        let name = if row.name.is_empty() {
            "(untagged)".to_string()
        } else {
            row.name.clone()
        };
        let id = if row.id.is_empty() { "-" } else { row.id.as_str() };
        table.add_row(vec![name, id.to_string(), row.items.to_string()]);
    }
    table.to_string()
}

fn format_outline(forest: &Forest, policy: &ViewPolicy, options: &OutlineOptions) -> String {
    if forest.is_empty() {
        return format!("Nothing at {}", policy.path);
    }
    render_outline(forest, options).trim_end().to_string()
}

fn to_json(forest: &Forest) -> Result<String, ApiError> {
    serde_json::to_string_pretty(forest).map_err(|e| ApiError::from(StoreError::from(e)))
}
