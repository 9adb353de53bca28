//! Logger setup for the binaries

use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` names one
pub const DEFAULT_FILTER: &str = "info";

/// Module that logs one `trace` line per draw call
const DRAW_TRACE_TARGET: &str = "engine_render::renderer";

/// Logger configuration.
///
/// `env_filter` uses `env_logger` filter syntax (e.g. "info",
/// "engine_render=debug"). `trace_draws` adds per-draw tracing from the
/// renderer on top of whatever filter is chosen.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub trace_draws: bool,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            trace_draws: false,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Effective filter: the configured one, else `rust_log`, else
    /// [`DEFAULT_FILTER`].
    pub fn filter(&self, rust_log: Option<&str>) -> String {
        let base = self
            .env_filter
            .as_deref()
            .or(rust_log)
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(DEFAULT_FILTER);

        if self.trace_draws {
            format!("{base},{DRAW_TRACE_TARGET}=trace")
        } else {
            base.to_string()
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Later calls do nothing.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let rust_log = std::env::var("RUST_LOG").ok();
        let filter = config.filter(rust_log.as_deref());

        env_logger::Builder::new()
            .parse_filters(&filter)
            .write_style(config.write_style)
            .init();

        log::debug!("logging initialized with `{filter}`");
    });
}
