//! Logger bootstrap.
//!
//! The engine logs through the `log` facade only. Binaries (and tests that
//! want output) call [`init_logging`] once to install `env_logger`.

use std::sync::Once;

use env_logger::{Builder, Env, WriteStyle};

/// Logger configuration.
///
/// `filter` uses `env_logger` syntax, e.g. `"info"` or
/// `"galaxyengine=debug,galaxyengine::executor=trace"`. When unset,
/// `RUST_LOG` is honoured, falling back to `info`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub write_style: WriteStyle,
    /// Route output through the test harness capture.
    pub is_test: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            write_style: WriteStyle::Auto,
            is_test: false,
        }
    }
}

static INIT: Once = Once::new();

/// Install the global logger. Later calls are ignored, as is an already
/// installed logger from elsewhere.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = match &config.filter {
            Some(filter) => {
                let mut b = Builder::new();
                b.parse_filters(filter);
                b
            }
            None => Builder::from_env(Env::default().default_filter_or("info")),
        };
        builder.write_style(config.write_style);
        builder.is_test(config.is_test);
        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}
