//! Logger setup for the binary
//!
//! Library code only uses the `log` macros. The binary installs `env_logger`
//! once at startup: `default` applies unless the environment variable
//! [`LOG_ENV_VAR`] holds a filter, and an explicit `--log-level` beats both.

use crate::runtime::constants::LOG_ENV_VAR;
use env_logger::{Builder, Env};
use log::{LevelFilter, SetLoggerError};

/// Builder with the level resolved from `default`, the environment and the
/// command line, in increasing priority
pub fn builder(default: LevelFilter, cli_level: Option<&str>) -> Builder {
    let mut builder = Builder::new();
    builder
        .filter_level(default)
        .format_timestamp(None)
        .parse_env(Env::new().filter(LOG_ENV_VAR));
    if let Some(level) = cli_level {
        builder.parse_filters(level);
    }
    builder
}

/// Install the logger. Fails if another logger is already set.
pub fn init(default: LevelFilter, cli_level: Option<&str>) -> Result<(), SetLoggerError> {
    builder(default, cli_level).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_level_overrides_default() {
        let logger = builder(LevelFilter::Off, Some("debug")).build();
        assert_eq!(logger.filter(), LevelFilter::Debug);

        let logger = builder(LevelFilter::Off, Some("WARN")).build();
        assert_eq!(logger.filter(), LevelFilter::Warn);
    }

    #[test]
    fn default_applies_without_a_level() {
        // Assumes STACKSCOPE_LOG is unset in the test environment
        let logger = builder(LevelFilter::Info, None).build();
        assert_eq!(logger.filter(), LevelFilter::Info);
    }
}
