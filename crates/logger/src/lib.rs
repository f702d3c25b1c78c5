/// ValueBets Live: Logger
/// JSONL event stream, tracing bootstrap, NTFY alerts

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone)]
pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Observability handle ─────────────────────────────────────────────────────

/// Procesní handle pro logování: stdout + denně rotovaný `scraper.log`
/// a JSONL event stream. Drop (nebo `shutdown`) vyflushuje souborový writer.
pub struct Observability {
    events:      EventLogger,
    _file_guard: WorkerGuard,
}

impl Observability {
    /// Nainstaluje globální tracing subscriber. Volat jednou za proces.
    pub fn init(log_dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = log_dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("create log dir {}", dir.display()))?;

        let appender = tracing_appender::rolling::daily(&dir, "scraper.log");
        let (file_writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info"))
            )
            .with(fmt::layer())
            .with(fmt::layer().with_ansi(false).with_writer(file_writer))
            .try_init()
            .map_err(|e| anyhow!("tracing subscriber already set: {e}"))?;

        tracing::info!("Logger configured, log dir {}", dir.display());

        Ok(Self {
            events:      EventLogger::new(dir),
            _file_guard: guard,
        })
    }

    /// Event logger pro injektování do komponent
    pub fn events(&self) -> EventLogger {
        self.events.clone()
    }

    pub fn shutdown(self) {
        tracing::info!("Logger shutting down");
        drop(self);
    }
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct ScrapeAttemptEvent {
    pub ts:           String,
    pub event:        &'static str,   // "SCRAPE_ATTEMPT"
    pub attempt:      u32,
    pub max_attempts: u32,
    pub outcome:      &'static str,   // "success" | "retryable" | "fatal"
    pub reason:       Option<String>,
    pub records:      usize,
}

#[derive(Serialize, Debug)]
pub struct ScrapeResultEvent {
    pub ts:               String,
    pub event:            &'static str,   // "SCRAPE_RESULT"
    pub ok:               bool,
    pub records:          usize,
    pub high_probability: usize,
}

#[derive(Serialize, Debug)]
pub struct ExportEvent {
    pub ts:      String,
    pub event:   &'static str,    // "EXPORT"
    pub path:    String,
    pub rows:    usize,
    pub ok:      bool,
    pub message: String,
}

#[derive(Serialize, Debug)]
pub struct AlertEvent {
    pub ts:    String,
    pub event: &'static str,      // "ALERT"
    pub topic: String,
    pub count: usize,
    pub sent:  bool,
}

/// Text push alertu, jednotné/množné číslo podle počtu
pub fn value_bet_alert_message(count: usize) -> String {
    let noun = if count == 1 { "value bet found!" } else { "value bets found!" };
    format!("🔔 {count} {noun}")
}

/// Pošli čitelný push alert, vrací true pokud ntfy odpověděl 2xx
pub async fn send_ntfy_alert(topic: &str, msg: &str, title: &str) -> bool {
    let client = reqwest::Client::new();
    match client
        .post(format!("https://ntfy.sh/{topic}"))
        .header("Title", title)
        .header("Priority", "high")
        .header("Tags", "moneybag")
        .body(msg.to_string())
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            tracing::info!("NTFY sent: {}", title);
            true
        }
        Ok(resp) => {
            tracing::warn!("NTFY rejected: HTTP {}", resp.status());
            false
        }
        Err(e) => {
            tracing::warn!("NTFY failed: {}", e);
            false
        }
    }
}
