use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use tracing_subscriber::EnvFilter;

use docxref::config::{get_config_path, load_config, save_config, XrefConfig};
use docxref::diagnostics::{CollectingSink, Tee, TracingSink};
use docxref::report::{format_report_as_json, format_report_as_markdown};
use docxref::resolution::{TreeTransform, UsesResolver};
use docxref::tree::DocTree;
use docxref::types::*;

/// Links @uses tags in a documentation tree to the symbols they name.
#[derive(Parser)]
#[command(
    name = "docxref",
    about = "Links @uses tags in a documentation tree to the symbols they name"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Project path (default: current directory)
        path: Option<String>,
    },
    /// Resolve @uses tags and write the annotated tree
    Resolve {
        /// Documentation tree (JSON)
        input: PathBuf,
        /// Where to write the annotated tree (default: overwrite the input)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Project path holding the configuration
        #[arg(short, long)]
        project: Option<String>,
        /// Report format (markdown or json)
        #[arg(short, long, default_value = "markdown")]
        report: String,
    },
    /// Resolve @uses tags without writing anything
    Check {
        /// Documentation tree (JSON)
        input: PathBuf,
        /// Project path holding the configuration
        #[arg(short, long)]
        project: Option<String>,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> docxref::errors::Result<()> {
    match cli.command {
        Commands::Init { path } => {
            let project_path = resolve_path(path);
            save_config(&project_path, &XrefConfig::default())?;
            println!(
                "Wrote default configuration to {}",
                get_config_path(&project_path).display()
            );
        }
        Commands::Resolve {
            input,
            output,
            project,
            report,
        } => {
            let config = load_config(&resolve_path(project))?;
            init_tracing(&config);

            let format = if report == "json" {
                OutputFormat::Json
            } else {
                OutputFormat::Markdown
            };
            let mut tree = DocTree::load(&input)?;
            let out = run_pass(&config, &mut tree, format)?;

            let output_path = output.unwrap_or_else(|| input.clone());
            tree.save(&output_path)?;
            println!("{}", out);
            eprintln!("Wrote annotated tree to {}", output_path.display());
        }
        Commands::Check {
            input,
            project,
            json,
        } => {
            let config = load_config(&resolve_path(project))?;
            init_tracing(&config);

            let format = if json {
                OutputFormat::Json
            } else {
                OutputFormat::Markdown
            };
            let mut tree = DocTree::load(&input)?;
            println!("{}", run_pass(&config, &mut tree, format)?);
        }
    }
    Ok(())
}

/// Runs the resolver over `tree` and renders its report.
fn run_pass(
    config: &XrefConfig,
    tree: &mut DocTree,
    format: OutputFormat,
) -> docxref::errors::Result<String> {
    let resolver = UsesResolver::new(config.resolver_options());
    let mut collected = CollectingSink::new();
    let mut tracing_sink = TracingSink;
    let mut sink = Tee {
        first: &mut tracing_sink,
        second: &mut collected,
    };

    let report = resolver.transform(tree, &mut sink)?;
    Ok(match format {
        OutputFormat::Json => format_report_as_json(&report, &collected.diagnostics),
        OutputFormat::Markdown => format_report_as_markdown(&report, &collected.diagnostics),
    })
}

/// Installs the stderr subscriber; `RUST_LOG` overrides the configured level.
fn init_tracing(config: &XrefConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
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
