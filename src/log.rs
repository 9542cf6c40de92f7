//! Program-wide logging.
//!
//! Messages go to the terminal (warnings and errors on stderr, the rest on stdout) and, for runs
//! with an output folder, to two log files inside it. The level comes from `ENERGYHUB_LOG_LEVEL`,
//! then `settings.toml`, then [`DEFAULT_LOG_LEVEL`].
use anyhow::{Context, Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used when neither the environment nor the settings file give one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The environment variable which overrides the log level
const LOG_LEVEL_ENV_VAR: &str = "ENERGYHUB_LOG_LEVEL";

/// Log file for messages about the ordinary progress of a run
const LOG_INFO_FILE_NAME: &str = "energyhub_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "energyhub_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger.
///
/// Accepted levels are `off`, `error`, `warn`, `info`, `debug` and `trace` (case-insensitive).
/// The logger can only be initialised once per process.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_dir`: Folder in which to create log files, if any
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    let level = choose_log_level(env::var(LOG_LEVEL_ENV_VAR).ok(), log_level_from_settings)?;

    let mut dispatch = Dispatch::new()
        .chain(
            terminal_dispatch(io::stdout().is_terminal())
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .level(level)
                .chain(io::stdout()),
        )
        .chain(
            terminal_dispatch(io::stderr().is_terminal())
                .level(level.min(LevelFilter::Warn))
                .chain(io::stderr()),
        );
    if let Some(log_dir) = log_dir {
        dispatch = dispatch.chain(file_dispatch(log_dir, level)?);
    }

    dispatch.apply().context("Logger already initialised")?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

/// Pick the level from the environment if set, otherwise from the settings file
fn choose_log_level(from_env: Option<String>, from_settings: Option<&str>) -> Result<LevelFilter> {
    let level = from_env
        .as_deref()
        .or(from_settings)
        .unwrap_or(DEFAULT_LOG_LEVEL);

    Ok(match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    })
}

/// A dispatch for terminal output, coloured by level if `colour` is set
fn terminal_dispatch(colour: bool) -> Dispatch {
    let colours = colour.then(|| {
        ColoredLevelConfig::new()
            .error(Color::Red)
            .warn(Color::Yellow)
            .info(Color::Green)
            .debug(Color::Blue)
            .trace(Color::Magenta)
    });

    Dispatch::new().format(move |out, message, record| match &colours {
        Some(colours) => write_record(out, colours.color(record.level()), record, message),
        None => write_record(out, record.level(), record, message),
    })
}

/// A dispatch writing to the two log files in `log_dir`, truncating any from a previous run.
///
/// The info file always records at least `info` messages, whatever the terminal level.
fn file_dispatch(log_dir: &Path, level: LevelFilter) -> Result<Dispatch> {
    let create = |file_name: &str| {
        let path = log_dir.join(file_name);
        File::create(&path)
            .with_context(|| format!("Could not create log file {}", path.display()))
    };

    Ok(Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(write_plain)
                .level(level.max(LevelFilter::Info))
                .chain(create(LOG_INFO_FILE_NAME)?),
        )
        .chain(
            Dispatch::new()
                .format(write_plain)
                .level(LevelFilter::Warn)
                .chain(create(LOG_ERROR_FILE_NAME)?),
        ))
}

fn write_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_record(out, record.level(), record, message);
}

/// Write one line in the form `[hh:mm:ss level target] message`
fn write_record(
    out: FormatCallback,
    level: impl std::fmt::Display,
    record: &Record,
    message: &Arguments,
) {
    let timestamp = Local::now().format("%H:%M:%S");
    out.finish(format_args!(
        "[{timestamp} {level} {}] {message}",
        record.target()
    ));
}
