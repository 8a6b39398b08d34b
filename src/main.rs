use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use docspace::docspace::classify::file_kind;
use docspace::docspace::extract::{DiskUpload, UploadSource};
use docspace::docspace::format::{format_date, format_file_type, format_size};
use docspace::docspace::preview::Preview;
use docspace::{Config, DocSpace, FileRecord, Section};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Personal file manager: favorites, categories, trash and AI documents.
#[derive(Parser, Debug)]
#[command(name = "docspace", version, about)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add files from disk
    Upload { paths: Vec<PathBuf> },
    /// List records in a section, newest first
    List {
        /// all, favorites, trash, images, documents, media or others
        #[arg(long, default_value = "all")]
        section: Section,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Show one record as JSON
    Show { id: String },
    /// Mark a record as favorite
    Favorite {
        id: String,
        /// Clear the flag instead
        #[arg(long)]
        off: bool,
    },
    /// Move a record to the trash
    Trash { id: String },
    /// Restore a record from the trash
    Restore { id: String },
    /// Delete a record permanently
    Purge { id: String },
    /// Delete every record in the trash
    EmptyTrash,
    /// Total size and count of records outside the trash
    Stats,
    /// Generate a markdown document with Gemini
    Create {
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
    /// Ask Gemini for a summary and tags
    Analyze { id: String },
    /// Show what the preview pane would display
    Preview { id: String },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the JSON schema of the config file
    Schema,
    /// Print the effective config (API key masked)
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "docspace", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Config { action: ConfigAction::Schema } => {
            println!("{}", Config::json_schema()?);
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load(cli.config.as_deref())?;
    if let Commands::Config { action: ConfigAction::Show } = cli.command {
        println!("{}", toml::to_string_pretty(&config.masked())?);
        return Ok(());
    }

    let space = DocSpace::open(&config)?;
    let result = run(&space, cli.command).await;
    space.close();
    result
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(space: &DocSpace, command: Commands) -> Result<()> {
    match command {
        Commands::Upload { paths } => {
            let mut sources: Vec<Box<dyn UploadSource>> = Vec::with_capacity(paths.len());
            for path in &paths {
                sources.push(Box::new(DiskUpload::open(path).await?));
            }
            for record in space.upload(&sources).await? {
                print_row(&record);
            }
        }
        Commands::List { section, search } => {
            let store = space.store();
            let view = store.project(section, &search);
            println!("{section}: {} items", view.len());
            for record in view {
                print_row(record);
            }
        }
        Commands::Show { id } => {
            let store = space.store();
            let record = store.get(&id).with_context(|| format!("No file record '{id}'"))?;
            println!("{}", serde_json::to_string_pretty(record)?);
        }
        Commands::Favorite { id, off } => report(&id, space.store().set_favorite(&id, !off)?),
        Commands::Trash { id } => report(&id, space.store().move_to_trash(&id)?),
        Commands::Restore { id } => report(&id, space.store().restore(&id)?),
        Commands::Purge { id } => report(&id, space.store().delete_permanently(&id)?),
        Commands::EmptyTrash => {
            let purged = space.store().empty_trash()?;
            println!("Removed {purged} records from the trash");
        }
        Commands::Stats => {
            let stats = space.store().stats();
            println!("{} files, {}", stats.count, stats.size);
        }
        Commands::Create { prompt } => {
            let record = space.create_with_ai(&prompt.join(" ")).await?;
            print_row(&record);
            if let Some(content) = &record.content {
                println!("\n{content}");
            }
        }
        Commands::Analyze { id } => {
            let summary = space.analyze(&id).await?;
            println!("{}", summary.summary);
            if !summary.tags.is_empty() {
                let tags: Vec<String> = summary.tags.iter().map(|t| format!("#{t}")).collect();
                println!("{}", tags.join(" "));
            }
        }
        Commands::Preview { id } => match space.preview(&id).await? {
            Preview::Code { content } => println!("{content}"),
            Preview::Image { url } | Preview::Pdf { url } => match url {
                Some(url) => println!("{} byte data URI", url.len()),
                None => println!("Preview unavailable: the file is not loaded in this session"),
            },
            Preview::Info { info } | Preview::Error { info } | Preview::Other { info } => {
                println!("{info}");
            }
        },
        Commands::Config { .. } | Commands::Completions { .. } => {}
    }
    Ok(())
}

fn report(id: &str, changed: bool) {
    if !changed {
        println!("No file record '{id}'");
    }
}

fn print_row(record: &FileRecord) {
    let star = if record.is_favorite { "★" } else { " " };
    println!(
        "{} {star} {:<36} {:<40} {:>10} {:<10} {}",
        file_kind(&record.mime_type, &record.name).icon(),
        record.id,
        record.name,
        format_size(record.size),
        format_file_type(&record.mime_type),
        format_date(record.created_at),
    );
}
