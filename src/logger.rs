use crate::errors::CmsError;
use log::LevelFilter;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};

/// Target for query execution logs, routed to `query.log`.
pub const QUERY_TARGET: &str = "solarcms::query";
/// Target of the `dev6!` macro.
pub const DEV6_TARGET: &str = "solarcms::dev6";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_RETENTION: u32 = 7;

/// Configure logging globally for the process.
/// - dir: base directory for logs; if None, current directory.
/// - level: error|warn|info|debug|trace
/// - retention: number of rolled files to keep (default 7)
///
/// # Errors
/// Returns `CmsError::Config` if an appender cannot be built.
pub fn configure_logging(dir: Option<&Path>, level: Option<&str>, retention: Option<u32>) -> Result<(), CmsError> {
    configure_logging_with_dev(dir, level, retention, false)
}

/// Like [`configure_logging`]; with `enable_dev6` the `dev6!` bench lines are also
/// persisted to `dev6.log`.
///
/// # Errors
/// Returns `CmsError::Config` if an appender cannot be built.
pub fn configure_logging_with_dev(
    dir: Option<&Path>,
    level: Option<&str>,
    retention: Option<u32>,
    enable_dev6: bool,
) -> Result<(), CmsError> {
    let base = dir.map_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")), PathBuf::from);
    std::fs::create_dir_all(&base)?;
    let keep = retention.unwrap_or(DEFAULT_RETENTION);
    let lvl = level_filter(level.unwrap_or("info"));

    let mut builder = Config::builder()
        .appender(Appender::builder().build("app", Box::new(rolling(&base, "app", keep)?)))
        .appender(Appender::builder().build("query", Box::new(rolling(&base, "query", keep)?)))
        .logger(Logger::builder().appender("query").additive(false).build(QUERY_TARGET, lvl));

    builder = if enable_dev6 {
        builder
            .appender(Appender::builder().build("dev6", Box::new(rolling(&base, "dev6", keep)?)))
            .logger(Logger::builder().appender("dev6").additive(false).build(DEV6_TARGET, LevelFilter::Trace))
    } else {
        builder.logger(Logger::builder().additive(false).build(DEV6_TARGET, LevelFilter::Off))
    };

    let config = builder
        .build(Root::builder().appender("app").build(lvl))
        .map_err(|e| CmsError::Config(e.to_string()))?;
    install(config);
    Ok(())
}

/// Installs `config` as the process logger. Returns false, keeping the current
/// logger, when one is already installed.
fn install(config: Config) -> bool {
    match log4rs::init_config(config) {
        Ok(_) => true,
        Err(e) => {
            log::debug!("logger already installed, keeping it: {e}");
            false
        }
    }
}

/// Configure logging from environment variables if present:
/// - SOLARCMS_LOG_DIR
/// - SOLARCMS_LOG_LEVEL
/// - SOLARCMS_LOG_RETENTION
/// - SOLARCMS_DEV6
///
/// # Errors
/// Same as [`configure_logging_with_dev`].
pub fn configure_from_env() -> Result<(), CmsError> {
    configure_from_lookup(|k| std::env::var(k).ok())
}

/// [`configure_from_env`] over an arbitrary variable source.
///
/// # Errors
/// Same as [`configure_logging_with_dev`].
pub fn configure_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<(), CmsError> {
    let dir = lookup("SOLARCMS_LOG_DIR").map(PathBuf::from);
    let level = lookup("SOLARCMS_LOG_LEVEL");
    let retention = lookup("SOLARCMS_LOG_RETENTION").and_then(|s| s.parse::<u32>().ok());
    let dev6 = lookup("SOLARCMS_DEV6").is_some_and(|s| is_truthy(&s));
    configure_logging_with_dev(dir.as_deref(), level.as_deref(), retention, dev6)
}

#[must_use]
pub fn level_filter(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

pub(crate) fn is_truthy(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn rolling(base: &Path, stem: &str, keep: u32) -> Result<RollingFileAppender, CmsError> {
    let pattern = base.join(format!("{stem}.{{}}.log"));
    let roller = FixedWindowRoller::builder()
        .build(&pattern.display().to_string(), keep)
        .map_err(|e| CmsError::Config(format!("log roller for {stem}: {e}")))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    Ok(RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(base.join(format!("{stem}.log")), Box::new(policy))?)
}
