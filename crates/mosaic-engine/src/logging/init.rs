use std::sync::Once;

use log::LevelFilter;

/// Logger setup for hosts embedding the compositor.
///
/// `filter` uses `env_logger` directive syntax, e.g.
/// `"mosaic_engine::atlas=debug,wgpu=warn"`. When unset, `RUST_LOG` is read,
/// and failing that `default_level` applies.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub default_level: LevelFilter,
    pub write_style: env_logger::WriteStyle,
    /// Route output through the test harness capture.
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            default_level: LevelFilter::Info,
            write_style: env_logger::WriteStyle::Auto,
            is_test: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Verbose, captured output for unit tests.
    pub fn for_tests() -> Self {
        Self {
            default_level: LevelFilter::Trace,
            write_style: env_logger::WriteStyle::Never,
            is_test: true,
            ..Self::default()
        }
    }

    fn builder(&self) -> env_logger::Builder {
        let mut builder = env_logger::Builder::new();
        match self.filter.clone().or_else(|| std::env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(self.default_level);
            }
        }
        builder.write_style(self.write_style).is_test(self.is_test);
        builder
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call has any effect.
///
/// Returns `false` if another logger was already installed by the host.
pub fn init_logging(config: LoggingConfig) -> bool {
    let mut installed = false;
    INIT.call_once(|| {
        installed = config.builder().try_init().is_ok();
        if installed {
            log::debug!("logging initialized");
        }
    });
    installed
}
