// Constants for the stack runtime

/// Snapshot history budget used when none is configured (64 MiB)
pub const DEFAULT_SNAPSHOT_LIMIT: usize = 64 * 1024 * 1024;

/// Environment variable read for the log level when `--log-level` is absent
pub const LOG_ENV_VAR: &str = "STACKSCOPE_LOG";
