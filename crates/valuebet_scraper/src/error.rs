use std::path::PathBuf;
use thiserror::Error;

/// Prohlížeč nelze spustit; fatální, retry nemá smysl
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to build Chrome launch options: {0}")]
    LaunchOptions(String),

    #[error("failed to launch Chrome: {0}")]
    Launch(String),

    #[error("failed to create browser tab: {0}")]
    Tab(String),
}

/// Selhání navigace nebo validace stránky; retryable
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("navigation to {url} failed: {reason}")]
    Navigate { url: String, reason: String },

    #[error("filter interaction failed: {0}")]
    Interaction(String),

    #[error("failed to read page content: {0}")]
    Read(String),

    #[error("markup failed plausibility check ({len} bytes, anchor present: {has_anchor})")]
    Implausible { len: usize, has_anchor: bool },

    #[error("markup looks like an anti-bot challenge page")]
    Challenge,

    #[error("no plausible markup after {0} navigation attempts")]
    Exhausted(u32),

    #[error("navigation cancelled by shutdown request")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no opportunity containers found in markup")]
    NoContainers,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
