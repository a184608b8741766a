use crate::api;
use crate::config::AppConfig;
use crate::engine::Engine;
use crate::errors::CmsError;
use crate::import::{ImportOptions, import_file};
use crate::query::{QueryString, ShaperConfig};
use serde::Serialize;

use super::command::Command;
use super::util::{parse_import_format, parse_json_arg};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    /// Pretty JSON.
    Human,
    /// `key=value` summaries.
    Plain,
    /// Compact single-line JSON.
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    /// Set when stored data changed.
    pub mutated: bool,
}

/// Runs `cmd` with pretty JSON output.
///
/// # Errors
/// Propagates the command's `CmsError`.
pub fn run(engine: &Engine, cfg: &AppConfig, cmd: Command) -> Result<CommandOutput, CmsError> {
    run_with_format(engine, cfg, cmd, OutputMode::Human)
}

/// # Errors
/// Propagates the command's `CmsError`.
pub fn run_with_format(
    engine: &Engine,
    cfg: &AppConfig,
    cmd: Command,
    mode: OutputMode,
) -> Result<CommandOutput, CmsError> {
    let mutated = cmd.is_mutation();
    let text = match cmd {
        Command::Collections => {
            let rows: Vec<serde_json::Value> = engine
                .list_collection_names()
                .into_iter()
                .filter_map(|n| engine.get_collection(&n).map(|c| serde_json::json!({"name": n, "count": c.len()})))
                .collect();
            match mode {
                OutputMode::Plain => rows
                    .iter()
                    .map(|r| format!("{} count={}", r["name"].as_str().unwrap_or_default(), r["count"]))
                    .collect::<Vec<_>>()
                    .join("\n"),
                _ => render(&rows, mode)?,
            }
        }
        Command::List { collection, query } => {
            let qs = QueryString::parse(query.as_deref().unwrap_or_default());
            let res = api::list(engine, &collection, &qs, &cfg.query)?;
            match mode {
                OutputMode::Plain => format!(
                    "count={} total={} page={} limit={} skip={} total_pages={}",
                    res.count,
                    res.total,
                    res.pagination.page,
                    res.pagination.limit,
                    res.pagination.skip,
                    res.pagination.total_pages
                ),
                _ => render(&res, mode)?,
            }
        }
        Command::Count { collection, query } => {
            let qs = QueryString::parse(query.as_deref().unwrap_or_default());
            let n = count(engine, &collection, &qs, &cfg.query)?;
            match mode {
                OutputMode::Plain => format!("count={n}"),
                _ => render(&serde_json::json!({"success": true, "count": n}), mode)?,
            }
        }
        Command::Get { collection, id } => {
            let res = api::get(engine, &collection, &id)?;
            item_text(&res, mode)?
        }
        Command::Create { collection, json } => {
            let res = api::create(engine, &collection, &parse_json_arg(&json)?)?;
            item_text(&res, mode)?
        }
        Command::Update { collection, id, json } => {
            let res = api::update(engine, &collection, &id, &parse_json_arg(&json)?)?;
            item_text(&res, mode)?
        }
        Command::Delete { collection, id } => {
            let res = api::delete(engine, &collection, &id)?;
            match mode {
                OutputMode::Plain => format!("deleted {collection} {id}"),
                _ => render(&res, mode)?,
            }
        }
        Command::Import { collection, file, format, skip_errors } => {
            let opts = ImportOptions { format: parse_import_format(format.as_deref()), skip_errors, ..ImportOptions::new(collection) };
            let report = import_file(engine, &file, &opts)?;
            match mode {
                OutputMode::Plain => format!("inserted={} skipped={}", report.inserted, report.skipped),
                _ => render(
                    &serde_json::json!({"success": true, "inserted": report.inserted, "skipped": report.skipped}),
                    mode,
                )?,
            }
        }
        Command::Config => cfg.to_toml()?,
    };
    Ok(CommandOutput { text, mutated })
}

fn count(engine: &Engine, collection: &str, qs: &QueryString, cfg: &ShaperConfig) -> Result<u64, CmsError> {
    let col = engine.collection(collection)?;
    cfg.shaper(col.find(), qs).filter().search().into_query().count_documents()
}

fn item_text(res: &api::ItemResponse, mode: OutputMode) -> Result<String, CmsError> {
    match mode {
        OutputMode::Plain => Ok(format!("_id={}", res.data["_id"].as_str().unwrap_or_default())),
        _ => render(res, mode),
    }
}

fn render<T: Serialize>(value: &T, mode: OutputMode) -> Result<String, CmsError> {
    Ok(match mode {
        OutputMode::Json => serde_json::to_string(value)?,
        OutputMode::Human | OutputMode::Plain => serde_json::to_string_pretty(value)?,
    })
}
