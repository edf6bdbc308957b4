//! Logging Configuration

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

pub const LOG_LEVEL_ENV: &str = "MENTORA_LOG_LEVEL";

pub fn parse_log_level(value: &str) -> Option<log::LevelFilter> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Some(log::LevelFilter::Trace),
        "debug" => Some(log::LevelFilter::Debug),
        "info" => Some(log::LevelFilter::Info),
        "warn" => Some(log::LevelFilter::Warn),
        "error" => Some(log::LevelFilter::Error),
        "off" => Some(log::LevelFilter::Off),
        _ => None,
    }
}

pub fn level_to_str(level: log::LevelFilter) -> &'static str {
    match level {
        log::LevelFilter::Trace => "trace",
        log::LevelFilter::Debug => "debug",
        log::LevelFilter::Info => "info",
        log::LevelFilter::Warn => "warn",
        log::LevelFilter::Error => "error",
        log::LevelFilter::Off => "off",
    }
}

/// `--log-level`, then the environment, then the default for `verbose`
pub fn resolve_log_level(
    cli_level: Option<&str>,
    env_level: Option<&str>,
    verbose: bool,
) -> log::LevelFilter {
    let default_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    if let Some(value) = cli_level {
        match parse_log_level(value) {
            Some(level) => return level,
            None => eprintln!(
                "Warning: Invalid --log-level '{}', falling back to default",
                value
            ),
        }
    }

    match env_level {
        Some(value) => parse_log_level(value).unwrap_or_else(|| {
            eprintln!(
                "Warning: Invalid {} '{}', falling back to default",
                LOG_LEVEL_ENV, value
            );
            default_level
        }),
        None => default_level,
    }
}

/// Install the fmt subscriber on stderr; `log` records from the core are
/// forwarded into it.
pub fn init_logging(level: log::LevelFilter) -> Result<()> {
    let mut filter = EnvFilter::new(level_to_str(level));
    if level >= log::LevelFilter::Debug {
        // Connection-level chatter from the HTTP stack
        for directive in ["hyper=info", "hyper_util=info", "reqwest=info", "rustls=info"] {
            filter = filter.add_directive(
                directive
                    .parse()
                    .map_err(|e| anyhow!("Invalid log directive {}: {}", directive, e))?,
            );
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;
    log::set_max_level(level);

    log::debug!("Logging initialized: level={}", level_to_str(level));
    Ok(())
}
