use std::path::Path;

use anyhow::Result;
use once_cell::sync::OnceCell;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::reload;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::targets::T_HANDSHAKE;

static RELOAD: OnceCell<reload::Handle<EnvFilter, Registry>> = OnceCell::new();

/// Keeps the non-blocking file writers alive; drop it last.
pub struct LoggingGuards {
    _file_guards: Vec<WorkerGuard>,
}

/// Install the global subscriber.
///
/// Stderr always gets a compact layer. When `cfg.file_logging` is set and `log_dir`
/// is given, the component also gets a daily-rolling file plus a separate
/// `handshake.log` carrying only [`T_HANDSHAKE`] events.
pub fn init(component: &str, log_dir: Option<&Path>, cfg: &LoggingConfig) -> Result<LoggingGuards> {
    let (filter_layer, handle) = reload::Layer::new(build_filter(cfg));
    let _ = RELOAD.set(handle);

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .compact();

    let base = tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer);

    let mut guards = Vec::new();

    let log_dir = match log_dir {
        Some(dir) if cfg.file_logging => dir,
        _ => {
            base.try_init().ok();
            return Ok(LoggingGuards { _file_guards: guards });
        }
    };

    if let Err(err) = std::fs::create_dir_all(log_dir) {
        base.try_init().ok();
        tracing::warn!("File logging disabled ({}): {}", log_dir.display(), err);
        return Ok(LoggingGuards { _file_guards: guards });
    }

    let component_appender = tracing_appender::rolling::daily(log_dir, format!("{component}.log"));
    let (component_writer, component_guard) = tracing_appender::non_blocking(component_appender);
    let component_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .with_ansi(false)
        .compact()
        .with_writer(component_writer)
        .with_filter(
            Targets::new()
                .with_default(LevelFilter::TRACE)
                .with_target(T_HANDSHAKE, LevelFilter::OFF),
        );
    guards.push(component_guard);

    let handshake_appender = tracing_appender::rolling::daily(log_dir, "handshake.log");
    let (handshake_writer, handshake_guard) = tracing_appender::non_blocking(handshake_appender);
    let handshake_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .compact()
        .with_writer(handshake_writer)
        .with_filter(Targets::new().with_target(T_HANDSHAKE, LevelFilter::TRACE));
    guards.push(handshake_guard);

    base.with(component_layer)
        .with(handshake_layer)
        .try_init()
        .ok();

    Ok(LoggingGuards { _file_guards: guards })
}

/// Swap the active filter, e.g. after `--verbose` has been parsed.
pub fn set_level(level: &str) -> Result<()> {
    let handle = RELOAD
        .get()
        .ok_or_else(|| anyhow::anyhow!("logging not initialized"))?;
    handle.reload(EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")))?;
    Ok(())
}

fn build_filter(cfg: &LoggingConfig) -> EnvFilter {
    if !cfg.enabled {
        return EnvFilter::new("off");
    }
    EnvFilter::try_new(cfg.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"))
}
