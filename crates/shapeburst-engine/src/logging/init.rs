use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "shapeburst_engine=trace,wgpu_core=warn"). When absent, `RUST_LOG` is
/// consulted, then `default_level`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: log::LevelFilter,
    pub write_style: env_logger::WriteStyle,
    /// Quiets the very chatty wgpu/naga internals unless a filter says otherwise.
    pub quiet_gpu_backends: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: log::LevelFilter::Info,
            write_style: env_logger::WriteStyle::Auto,
            quiet_gpu_backends: true,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// Idempotent; later calls are ignored. Call early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if config.quiet_gpu_backends {
            for module in ["wgpu_core", "wgpu_hal", "naga"] {
                builder.filter_module(module, log::LevelFilter::Warn);
            }
        }

        // Explicit filters are parsed last so they override the defaults above.
        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(config.default_level);
        }

        builder.write_style(config.write_style);

        if builder.try_init().is_err() {
            // Another logger was installed by the host; keep it.
            return;
        }

        log::debug!("logging initialized");
    });
}
