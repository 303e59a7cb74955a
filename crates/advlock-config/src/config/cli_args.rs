use std::path::PathBuf;

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit config file; disables discovery.
    pub config_path: Option<PathBuf>,
    pub retry_delay_ms: Option<u64>,
    /// Octal permission string such as `"600"`.
    pub permissions: Option<String>,
    pub read_write: Option<bool>,
    pub verbose: Option<bool>,
}
