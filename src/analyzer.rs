//! Coordinator for a whole analysis run.
//!
//! Each unit is parsed and walked on its own blocking task into a task-local
//! [`UnitTable`]. Results come back over a bounded channel, are sorted by
//! unit name and merged one at a time, so the final table does not depend on
//! task scheduling. Linking runs once after the last merge.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{should_include_file, AnalyzerConfig};
use crate::errors::{CallScopeError, Result};
use crate::extraction::{GoExtractor, LanguageExtractor};
use crate::graph::DeclarationTable;
use crate::resolution::CallLinker;
use crate::syntax::SourceMap;
use crate::traversal::{walk_unit_with, UnitTable, WalkOptions};
use crate::types::{Diagnostic, LinkStats};

/// A unit that contributed nothing to the table.
#[derive(Debug)]
pub struct UnitFailure {
    pub unit: String,
    pub error: CallScopeError,
}

/// Outcome of an analysis run.
#[derive(Debug)]
pub struct Analysis {
    /// Merged, grouped and linked declaration table.
    pub table: DeclarationTable,
    pub link: LinkStats,
    /// Units that failed to read or parse, sorted by unit name.
    pub failures: Vec<UnitFailure>,
    /// Resolver diagnostics from every unit, in unit order.
    pub diagnostics: Vec<Diagnostic>,
}

type UnitOutcome = (String, Result<UnitTable>);

/// Runs the front end, the per-unit walk, the merge and the linker.
pub struct Analyzer {
    config: AnalyzerConfig,
    extractor: Arc<dyn LanguageExtractor>,
}

impl Analyzer {
    /// Creates an analyzer with the Go front end.
    pub fn new(config: AnalyzerConfig) -> Self {
        Self::with_extractor(config, Arc::new(GoExtractor))
    }

    pub fn with_extractor(config: AnalyzerConfig, extractor: Arc<dyn LanguageExtractor>) -> Self {
        Self { config, extractor }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            capture_source: self.config.capture_source,
        }
    }

    /// Analyzes in-memory units given as `(name, source)` pairs.
    ///
    /// Base offsets are assigned in unit-name order before any task starts.
    /// A unit that fails to parse is reported in [`Analysis::failures`] and
    /// the rest are analyzed normally. Of several units sharing a name only
    /// the first given is analyzed; the others are reported as failures.
    pub async fn analyze_sources(&self, sources: Vec<(String, String)>) -> Analysis {
        let start = Instant::now();
        let mut sources = sources;
        sources.sort_by(|a, b| a.0.cmp(&b.0));

        let mut source_map = SourceMap::new();
        let mut failures = Vec::new();
        let mut units: Vec<(String, String, usize)> = Vec::with_capacity(sources.len());
        for (name, source) in sources {
            if units.last().is_some_and(|(last, _, _)| *last == name) {
                warn!(unit = %name, "duplicate unit name");
                failures.push(UnitFailure {
                    error: CallScopeError::File {
                        message: "duplicate unit name".to_string(),
                        path: name.clone(),
                    },
                    unit: name,
                });
                continue;
            }
            let base = source_map.add_file(&name, &source);
            units.push((name, source, base));
        }
        let unit_count = units.len();

        let (tx, mut rx) = mpsc::channel::<UnitOutcome>(self.config.channel_capacity.max(1));
        let mut handles = Vec::with_capacity(unit_count);
        for (name, source, base) in units {
            let tx = tx.clone();
            let extractor = Arc::clone(&self.extractor);
            let options = self.walk_options();
            let unit = name.clone();
            let handle = tokio::task::spawn_blocking(move || {
                let outcome = analyze_unit(extractor.as_ref(), &name, &source, base, &options);
                if tx.blocking_send((name, outcome)).is_err() {
                    warn!("result channel closed before unit finished");
                }
            });
            handles.push((unit, handle));
        }
        drop(tx);

        let mut outcomes: Vec<UnitOutcome> = Vec::with_capacity(unit_count);
        while let Some(outcome) = rx.recv().await {
            outcomes.push(outcome);
        }

        for (unit, handle) in handles {
            if let Err(e) = handle.await {
                warn!(unit = %unit, error = %e, "unit task did not complete");
                failures.push(UnitFailure {
                    unit,
                    error: CallScopeError::Task {
                        message: e.to_string(),
                    },
                });
            }
        }

        outcomes.sort_by(|a, b| a.0.cmp(&b.0));
        let mut tables = Vec::with_capacity(outcomes.len());
        let mut diagnostics = Vec::new();
        for (unit, outcome) in outcomes {
            match outcome {
                Ok(mut table) => {
                    diagnostics.append(&mut table.diagnostics);
                    tables.push(table);
                }
                Err(error) => {
                    warn!(unit = %unit, error = %error, "unit skipped");
                    failures.push(UnitFailure { unit, error });
                }
            }
        }
        failures.sort_by(|a, b| a.unit.cmp(&b.unit));

        let mut table = merge_units(source_map, tables);
        table.group_by_receiver();
        let link = CallLinker::link_all(&mut table);

        info!(
            units = unit_count,
            failed = failures.len(),
            declarations = table.declaration_count(),
            calls = link.total,
            resolved = link.resolved,
            duration_ms = start.elapsed().as_millis() as u64,
            "analysis complete"
        );

        Analysis {
            table,
            link,
            failures,
            diagnostics,
        }
    }

    /// Analyzes every matching file below `root`.
    ///
    /// Paths are made relative to `root` with `/` separators and become the
    /// unit names. Files that cannot be read are reported as failures.
    pub async fn analyze_dir(&self, root: &Path) -> Result<Analysis> {
        if !root.is_dir() {
            return Err(CallScopeError::File {
                message: "not a directory".to_string(),
                path: root.display().to_string(),
            });
        }

        let files = self.scan_files(root);
        debug!(root = %root.display(), files = files.len(), "scanned project");

        let mut sources = Vec::with_capacity(files.len());
        let mut read_failures = Vec::new();
        for relative in files {
            match tokio::fs::read_to_string(root.join(&relative)).await {
                Ok(source) => sources.push((relative, source)),
                Err(e) => {
                    warn!(unit = %relative, error = %e, "failed to read file");
                    read_failures.push(UnitFailure {
                        error: CallScopeError::File {
                            message: e.to_string(),
                            path: relative.clone(),
                        },
                        unit: relative,
                    });
                }
            }
        }

        let mut analysis = self.analyze_sources(sources).await;
        if !read_failures.is_empty() {
            analysis.failures.append(&mut read_failures);
            analysis.failures.sort_by(|a, b| a.unit.cmp(&b.unit));
        }
        Ok(analysis)
    }

    /// Relative paths of the files to analyze, sorted.
    fn scan_files(&self, root: &Path) -> Vec<String> {
        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| {
                // Skip hidden directories below the root
                e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
            })
        {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let rel_str = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !self.extractor.handles(&rel_str) || !should_include_file(&rel_str, &self.config) {
                continue;
            }
            match entry.metadata() {
                Ok(metadata) if metadata.len() <= self.config.max_file_size => files.push(rel_str),
                Ok(_) => debug!(unit = %rel_str, "skipping oversized file"),
                Err(e) => debug!(unit = %rel_str, error = %e, "skipping file without metadata"),
            }
        }
        files.sort();
        files
    }
}

/// Parses and walks one unit.
pub fn analyze_unit(
    extractor: &dyn LanguageExtractor,
    name: &str,
    source: &str,
    base: usize,
    options: &WalkOptions,
) -> Result<UnitTable> {
    let file = extractor.extract(name, source, base)?;
    Ok(walk_unit_with(&file, options))
}

/// Merges unit tables in unit-name order into a fresh table.
///
/// Does not group or link; callers run [`DeclarationTable::group_by_receiver`]
/// and [`CallLinker::link_all`] afterwards.
pub fn merge_units(source_map: SourceMap, mut units: Vec<UnitTable>) -> DeclarationTable {
    units.sort_by(|a, b| a.name.cmp(&b.name));
    let mut table = DeclarationTable::with_source_map(source_map);
    for unit in units {
        table.merge(unit);
    }
    table
}
