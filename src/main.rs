use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use callscope::analyzer::{Analysis, Analyzer};
use callscope::config::{get_config_path, init_config, load_config};
use callscope::errors::{CallScopeError, Result};
use callscope::graph::GraphQueries;
use callscope::report::*;

/// Call graph explorer for Go codebases.
#[derive(Parser)]
#[command(name = "callscope", about = "Call graph explorer for Go codebases")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default `.callscope/config.json` for a project
    Init {
        /// Project path (default: current directory)
        path: Option<String>,
        /// Run an analysis after init
        #[arg(short, long)]
        analyze: bool,
    },
    /// Build the call graph and print every declaration with its callers
    Analyze {
        /// Project path (default: current directory)
        path: Option<String>,
        /// Output format (markdown or json)
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },
    /// Show declarations that call the given identifier
    Callers {
        /// Identifier, e.g. `main.run` or `p.List.Len`
        identifier: String,
        /// Project path
        #[arg(short, long)]
        path: Option<String>,
        /// Maximum traversal depth
        #[arg(short, long, default_value = "1")]
        depth: usize,
        /// Output format (markdown or json)
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },
    /// Show declarations called by the given identifier
    Callees {
        /// Identifier, e.g. `main.run` or `p.List.Len`
        identifier: String,
        /// Project path
        #[arg(short, long)]
        path: Option<String>,
        /// Maximum traversal depth
        #[arg(short, long, default_value = "1")]
        depth: usize,
        /// Output format (markdown or json)
        #[arg(short, long, default_value = "markdown")]
        format: String,
    },
    /// List declarations nothing calls
    Dead {
        /// Project path
        #[arg(short, long)]
        path: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { path, analyze } => {
            let project_path = resolve_path(path);
            init_config(&project_path)?;
            println!(
                "Initialized callscope at {}",
                get_config_path(&project_path).display()
            );
            if analyze {
                let analysis = self::analyze(&project_path).await?;
                println!(
                    "Analyzed {} declarations: {} of {} calls resolved",
                    analysis.table.declaration_count(),
                    analysis.link.resolved,
                    analysis.link.total
                );
            }
        }
        Commands::Analyze { path, format } => {
            let analysis = analyze(&resolve_path(path)).await?;
            let report = GraphReport::from_analysis(&analysis);
            if format == "json" {
                println!("{}", format_report_as_json(&report));
            } else {
                println!("{}", format_report_as_markdown(&report));
            }
        }
        Commands::Callers {
            identifier,
            path,
            depth,
            format,
        } => {
            let analysis = analyze(&resolve_path(path)).await?;
            let id = find_declaration(&analysis, &identifier)?;
            let queries = GraphQueries::new(&analysis.table);
            let callers = queries.callers(id, depth);
            if format == "json" {
                println!("{}", format_related_as_json(&analysis.table, &callers));
            } else {
                let heading = format!("Callers of {}", identifier);
                println!(
                    "{}",
                    format_related_as_markdown(&analysis.table, &heading, &callers)
                );
            }
        }
        Commands::Callees {
            identifier,
            path,
            depth,
            format,
        } => {
            let analysis = analyze(&resolve_path(path)).await?;
            let id = find_declaration(&analysis, &identifier)?;
            let queries = GraphQueries::new(&analysis.table);
            let callees = queries.callees(id, depth);
            if format == "json" {
                println!("{}", format_related_as_json(&analysis.table, &callees));
            } else {
                let heading = format!("Callees of {}", identifier);
                println!(
                    "{}",
                    format_related_as_markdown(&analysis.table, &heading, &callees)
                );
            }
        }
        Commands::Dead { path } => {
            let analysis = analyze(&resolve_path(path)).await?;
            let queries = GraphQueries::new(&analysis.table);
            let dead = queries.unreferenced();
            println!(
                "{}",
                format_declarations_as_markdown(&analysis.table, "Unreferenced declarations", &dead)
            );
        }
    }
    Ok(())
}

async fn analyze(project_path: &Path) -> Result<Analysis> {
    let config = load_config(project_path)?;
    let analysis = Analyzer::new(config).analyze_dir(project_path).await?;
    for failure in &analysis.failures {
        eprintln!("warning: skipped {}: {}", failure.unit, failure.error);
    }
    Ok(analysis)
}

fn find_declaration(analysis: &Analysis, identifier: &str) -> Result<callscope::types::DeclId> {
    analysis
        .table
        .lookup_id(identifier)
        .ok_or_else(|| CallScopeError::Lookup {
            message: "no such declaration".to_string(),
            identifier: identifier.to_string(),
        })
}

/// Resolves an optional path argument to a `PathBuf`.
///
/// Defaults to the current working directory if no path is provided.
fn resolve_path(path: Option<String>) -> PathBuf {
    match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
