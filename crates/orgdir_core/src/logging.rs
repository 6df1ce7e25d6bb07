//! Process logging bootstrap.
//!
//! # Responsibility
//! - Start size-rotated file logging named after the service, once per
//!   process, optionally mirrored to stderr.
//! - Capture panics as sanitized log events.
//!
//! # Invariants
//! - Initialization is idempotent for an identical configuration.
//! - Re-initialization with a different level, directory or service name is
//!   rejected.
//! - Initialization never panics.
//!
//! Core modules only use the `log` facade; nothing outside this module
//! depends on logging having been initialized.

use flexi_logger::{
    Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const DEFAULT_SERVICE_NAME: &str = "orgdir";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 4;
const MAX_PANIC_PAYLOAD_CHARS: usize = 160;

static LOGGING_STATE: OnceCell<LoggingState> = OnceCell::new();
static PANIC_HOOK_INSTALLED: OnceCell<()> = OnceCell::new();

/// Logging setup requested by the process edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`, case-insensitive.
    pub level: String,
    /// Absolute directory for rotated log files.
    pub log_dir: PathBuf,
    /// Used as the log file basename.
    pub service_name: String,
    /// Mirror every record to stderr as well.
    pub duplicate_to_stderr: bool,
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            duplicate_to_stderr: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NormalizedConfig {
    level: &'static str,
    log_dir: PathBuf,
    service_name: String,
}

struct LoggingState {
    config: NormalizedConfig,
    _logger: LoggerHandle,
}

/// Initializes process logging.
///
/// # Errors
/// - Unsupported level, empty/relative directory or invalid service name.
/// - Directory cannot be created or the logger backend fails to start.
/// - Logging is already active with a different configuration.
pub fn init_logging(config: &LoggingConfig) -> Result<(), String> {
    let requested = normalize_config(config)?;

    let state = LOGGING_STATE.get_or_try_init(|| start_logger(&requested, config))?;
    ensure_same_config(&state.config, &requested)
}

/// Returns `(level, log_dir)` of the active logger, if any.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    LOGGING_STATE
        .get()
        .map(|state| (state.config.level, state.config.log_dir.clone()))
}

/// Default level for the current build: `debug` or `info`.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_logger(
    requested: &NormalizedConfig,
    config: &LoggingConfig,
) -> Result<LoggingState, String> {
    std::fs::create_dir_all(&requested.log_dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            requested.log_dir.display()
        )
    })?;

    let duplicate = if config.duplicate_to_stderr {
        Duplicate::All
    } else {
        Duplicate::None
    };

    let logger = Logger::try_with_str(requested.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", requested.level))?
        .log_to_file(
            FileSpec::default()
                .directory(requested.log_dir.as_path())
                .basename(requested.service_name.as_str()),
        )
        .rotate(
            Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .duplicate_to_stderr(duplicate)
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    install_panic_hook_once();

    info!(
        "event=app_start module=core status=ok service={} platform={} build_mode={} version={}",
        requested.service_name,
        std::env::consts::OS,
        build_mode(),
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "event=logging_init module=core status=ok level={} log_dir={}",
        requested.level,
        requested.log_dir.display()
    );

    Ok(LoggingState {
        config: requested.clone(),
        _logger: logger,
    })
}

fn ensure_same_config(active: &NormalizedConfig, requested: &NormalizedConfig) -> Result<(), String> {
    if active.log_dir != requested.log_dir {
        return Err(format!(
            "logging already initialized at `{}`; refusing to switch to `{}`",
            active.log_dir.display(),
            requested.log_dir.display()
        ));
    }
    if active.level != requested.level {
        return Err(format!(
            "logging already initialized with level `{}`; refusing to switch to `{}`",
            active.level, requested.level
        ));
    }
    if active.service_name != requested.service_name {
        return Err(format!(
            "logging already initialized for service `{}`; refusing to switch to `{}`",
            active.service_name, requested.service_name
        ));
    }
    Ok(())
}

fn normalize_config(config: &LoggingConfig) -> Result<NormalizedConfig, String> {
    Ok(NormalizedConfig {
        level: normalize_level(&config.level)?,
        log_dir: normalize_log_dir(&config.log_dir)?,
        service_name: normalize_service_name(&config.service_name)?,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        other => Err(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error"
        )),
    }
}

fn normalize_log_dir(log_dir: &Path) -> Result<PathBuf, String> {
    if log_dir.as_os_str().is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    if !log_dir.is_absolute() {
        return Err(format!(
            "log_dir must be an absolute path, got `{}`",
            log_dir.display()
        ));
    }
    Ok(log_dir.to_path_buf())
}

fn normalize_service_name(service_name: &str) -> Result<String, String> {
    let trimmed = service_name.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_SERVICE_NAME.to_string());
    }
    let valid = trimmed
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.');
    if !valid {
        return Err(format!(
            "service name `{trimmed}` may only contain ASCII letters, digits, `-`, `_` and `.`"
        ));
    }
    Ok(trimmed.to_string())
}

fn build_mode() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}

fn install_panic_hook_once() {
    if PANIC_HOOK_INSTALLED.set(()).is_err() {
        return;
    }

    let previous_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location,
            panic_payload_summary(panic_info)
        );
        previous_hook(panic_info);
    }));
}

fn panic_payload_summary(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = if let Some(message) = info.payload().downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = info.payload().downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };

    sanitize_message(&payload, MAX_PANIC_PAYLOAD_CHARS)
}

// Panic payloads may echo request input; keep them on one bounded line.
fn sanitize_message(value: &str, max_chars: usize) -> String {
    let normalized = value.replace(['\n', '\r'], " ");
    let mut truncated = normalized.chars().take(max_chars).collect::<String>();
    if normalized.chars().count() > max_chars {
        truncated.push_str("...");
    }
    truncated
}
