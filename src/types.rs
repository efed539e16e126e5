#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// What to do with a sync log line that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogParsePolicy {
    /// Treat the whole log as empty and re-download everything.
    #[value(name = "discard-all")]
    DiscardAll,
    /// Drop just the bad line.
    #[default]
    #[value(name = "skip-line")]
    SkipLine,
}
