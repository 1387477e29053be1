use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use zotl::app::{App, PullOptions};
use zotl::client::ZoteroHttpClient;
use zotl::error::ZotlError;
use zotl::output::JsonOutput;
use zotl::transport::DEFAULT_BASE_URL;

#[derive(Parser)]
#[command(name = "zotl")]
#[command(about = "Local Zotero API client: search items and pull attachments to disk")]
#[command(version, author)]
struct Cli {
    /// Base origin of the local Zotero API (also: ZOTL_BASE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List collections in the library")]
    Collections,
    #[command(about = "Search items with the server-side full-text query")]
    Search(SearchArgs),
    #[command(about = "Copy attachments of a collection or search result to a directory")]
    Pull(PullArgs),
}

#[derive(Args)]
struct SearchArgs {
    query: String,
}

#[derive(Args)]
struct PullArgs {
    /// Pull every item of the collection with this exact name.
    #[arg(long, conflicts_with = "query")]
    collection: Option<String>,

    /// Pull every item matching this search query.
    #[arg(long)]
    query: Option<String>,

    /// Destination directory (default: the user's Downloads directory).
    #[arg(long)]
    dir: Option<Utf8PathBuf>,

    /// Keep original filenames instead of renaming copies by PMID.
    #[arg(long)]
    no_rename: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(zotl) = report.downcast_ref::<ZotlError>() {
            return ExitCode::from(map_exit_code(zotl));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ZotlError) -> u8 {
    match error {
        ZotlError::NotFound(_) | ZotlError::CollectionNotFound(_) => 2,
        ZotlError::Transport(_) | ZotlError::Status { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let base_url = cli
        .base_url
        .or_else(|| std::env::var("ZOTL_BASE_URL").ok())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let client = ZoteroHttpClient::with_base_url(&base_url).into_diagnostic()?;
    let app = App::new(client);

    match cli.command {
        Commands::Collections => {
            let result = app.list_collections().into_diagnostic()?;
            JsonOutput::print_collections(&result).into_diagnostic()?;
        }
        Commands::Search(args) => {
            let result = app.search(&args.query).into_diagnostic()?;
            JsonOutput::print_search(&result).into_diagnostic()?;
        }
        Commands::Pull(args) => {
            let options = PullOptions {
                target_dir: args.dir,
                rename_by_pmid: !args.no_rename,
            };
            let result = match (args.collection, args.query) {
                (Some(name), None) => app.pull_collection(&name, &options).into_diagnostic()?,
                (None, Some(query)) => app.pull_search(&query, &options).into_diagnostic()?,
                _ => {
                    return Err(miette::Report::msg(
                        "pull requires exactly one of --collection or --query",
                    ));
                }
            };
            JsonOutput::print_pull(&result).into_diagnostic()?;
        }
    }

    Ok(())
}
