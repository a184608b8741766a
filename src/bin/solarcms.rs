use clap::{Parser, Subcommand, ValueEnum};
use solarcms::cli::{self as prog_cli, Command, OutputMode};
use solarcms::{AppConfig, Engine, logger, snapshot};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "solarcms", version, about = "Solar site content store CLI", long_about = None)]
struct Cli {
    #[arg(long, help = "Path to a config file (TOML). If omitted, the usual locations are searched.")]
    config: Option<PathBuf>,
    #[arg(long, help = "Snapshot file holding all collections. Takes precedence over config/env.")]
    data: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Format::Human, help = "Output format")]
    format: Format,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Format {
    Human,
    Plain,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "List collections with document counts")]
    Collections,
    #[command(about = "Shaped list query, e.g. 'price[gt]=10&sort=-createdAt&page=2'")]
    List {
        collection: String,
        #[arg(help = "Raw query string")]
        query: Option<String>,
    },
    #[command(about = "Count documents matching a query string's filter and search")]
    Count {
        collection: String,
        query: Option<String>,
    },
    #[command(about = "Fetch one document by _id")]
    Get { collection: String, id: String },
    #[command(about = "Create a document from a JSON object")]
    Create { collection: String, json: String },
    #[command(about = "Merge a JSON object into a document")]
    Update { collection: String, id: String, json: String },
    #[command(about = "Delete a document by _id")]
    Delete { collection: String, id: String },
    #[command(about = "Import a JSON array or NDJSON file")]
    Import {
        collection: String,
        file: PathBuf,
        #[arg(long, help = "Format override: json|ndjson; defaults to auto-detect")]
        format: Option<String>,
        #[arg(long, help = "Skip invalid documents instead of aborting")]
        skip_errors: bool,
    },
    #[command(about = "Print the effective configuration")]
    Config,
}

impl From<Commands> for Command {
    fn from(c: Commands) -> Self {
        match c {
            Commands::Collections => Command::Collections,
            Commands::List { collection, query } => Command::List { collection, query },
            Commands::Count { collection, query } => Command::Count { collection, query },
            Commands::Get { collection, id } => Command::Get { collection, id },
            Commands::Create { collection, json } => Command::Create { collection, json },
            Commands::Update { collection, id, json } => Command::Update { collection, id, json },
            Commands::Delete { collection, id } => Command::Delete { collection, id },
            Commands::Import { collection, file, format, skip_errors } => {
                Command::Import { collection, file, format, skip_errors }
            }
            Commands::Config => Command::Config,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = real_main(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = AppConfig::load(cli.config.as_deref(), cli.data.as_deref())?;
    logger::configure_logging_with_dev(
        cfg.logging.dir.as_deref(),
        Some(cfg.logging.level.as_str()),
        Some(cfg.logging.retention),
        cfg.logging.dev6,
    )?;

    let engine = Engine::with_schemas(cfg.schemas());
    let data_path = cfg.data_path();
    snapshot::load(&engine, &data_path)?;

    let mode = match cli.format {
        Format::Human => OutputMode::Human,
        Format::Plain => OutputMode::Plain,
        Format::Json => OutputMode::Json,
    };
    let out = match prog_cli::run_with_format(&engine, &cfg, cli.command.into(), mode) {
        Ok(out) => out,
        Err(e) => {
            let body = serde_json::to_string(&solarcms::api::ErrorResponse::from(&e))?;
            eprintln!("{body}");
            std::process::exit(if e.status_code() >= 500 { 2 } else { 1 });
        }
    };
    if out.mutated {
        snapshot::save(&engine, &data_path)?;
    }
    println!("{}", out.text);
    Ok(())
}
