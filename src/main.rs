/// ValueBets Live: OddsPortal value bets scraper
///
/// Co dělá:
///   1. Headless Chrome → https://www.oddsportal.com/value-bets/ (filtr "All sports")
///   2. Extrahuje value bety, normalizuje, seřadí podle pravděpodobnosti
///   3. Export do CSV (default data/data.csv)
///   4. NTFY alert, pokud je něco nad prahem pravděpodobnosti
///
/// Spuštění:
///   cargo run --bin valuebets

use anyhow::{Context, Result};
use dotenv::dotenv;
use logger::{
    now_iso, send_ntfy_alert, value_bet_alert_message, AlertEvent, EventLogger, ExportEvent,
    Observability, ScrapeResultEvent,
};
use std::env;
use std::fs::File;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::task;
use tracing::{error, info, warn};
use valuebet_scraper::{
    export, ChromeSessionManager, Dataset, Orchestrator, ProgressEvent, ScraperConfig,
};

const EXIT_NO_DATA: u8 = 2;
const EXIT_EXPORT_FAILED: u8 = 3;

/// Čas na doběhnutí po timeoutu; pokrývá 60s navigační timeout rozběhnutého kroku
const SHUTDOWN_GRACE: Duration = Duration::from_secs(75);

enum ScrapeRun {
    Finished(Option<Dataset>),
    /// Blokující task nereagoval na shutdown ani po grace periodě
    Stuck,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();

    let cfg = ScraperConfig::from_env().context("invalid configuration")?;
    let obs = Observability::init(&cfg.log_dir)?;

    info!("=== ValueBets Live: value bets scraper ===");
    info!("Target: {}", cfg.target_url);
    info!("Attempts: {} (navigation {} per session)", cfg.max_attempts, cfg.nav_attempts);
    info!("Export: {}", cfg.export_path.display());

    // Single instance lock, dvě session najednou = dvojnásobné riziko detekce
    let lock_file_path = env::temp_dir().join("valuebets_live.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(ExitCode::SUCCESS);
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of valuebets is already running! Exiting.");
            return Ok(ExitCode::SUCCESS);
        }
    };

    let events = obs.events();

    let dataset = match scrape(&cfg, events.clone()).await? {
        ScrapeRun::Finished(dataset) => dataset,
        ScrapeRun::Stuck => {
            error!("Scraper did not stop within {}s of shutdown, exiting", SHUTDOWN_GRACE.as_secs());
            log_result(&events, false, 0, 0);
            obs.shutdown();
            // runtime by na blokující task při shutdownu čekal donekonečna
            std::process::exit(EXIT_NO_DATA.into());
        }
    };

    let Some(dataset) = dataset else {
        error!("Failed to retrieve value bets data after all attempts");
        log_result(&events, false, 0, 0);
        obs.shutdown();
        return Ok(ExitCode::from(EXIT_NO_DATA));
    };

    let high = dataset.count_above(cfg.high_probability);
    log_result(&events, true, dataset.len(), high);
    info!(
        "Data retrieved: {} value bets, {} above {:.0}% probability",
        dataset.len(), high, cfg.high_probability
    );

    if high > 0 {
        notify(&cfg, &events, high).await;
    }

    let exported = export(&dataset, &cfg.export_path);
    let logged = events.log(&ExportEvent {
        ts:      now_iso(),
        event:   "EXPORT",
        path:    cfg.export_path.display().to_string(),
        rows:    dataset.len(),
        ok:      exported.is_ok(),
        message: exported.as_ref().err().map(|e| e.to_string()).unwrap_or_else(|| "ok".to_string()),
    });
    if let Err(e) = logged {
        warn!("Failed to write export event: {}", e);
    }

    let code = match exported {
        Ok(()) => {
            info!("🚀 Operation completed successfully! {} value bets found.", dataset.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            // Data máme, jen nejdou uložit
            error!("Scraped {} value bets but export failed: {}", dataset.len(), e);
            ExitCode::from(EXIT_EXPORT_FAILED)
        }
    };

    obs.shutdown();
    Ok(code)
}

/// Spustí blokující pipeline mimo async runtime, s celkovým timeoutem.
///
/// Po timeoutu nastaví shutdown flag orchestrátoru a počká, až pokus doběhne
/// a session se uvolní (Chrome se ukončí v `Drop`).
async fn scrape(cfg: &ScraperConfig, events: EventLogger) -> Result<ScrapeRun> {
    let orchestrator = Orchestrator::new(ChromeSessionManager::new(cfg), cfg).with_event_log(events);
    let shutdown = orchestrator.shutdown_handle();
    let max_attempts = cfg.max_attempts;
    let mut handle = task::spawn_blocking(move || orchestrator.run(max_attempts, &log_progress));

    match tokio::time::timeout(cfg.run_timeout, &mut handle).await {
        Ok(joined) => return joined.context("scraper task panicked").map(ScrapeRun::Finished),
        Err(_) => {
            error!("Scrape run timed out after {}s, stopping", cfg.run_timeout.as_secs());
            shutdown.store(true, Ordering::SeqCst);
        }
    }

    match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
        Ok(joined) => {
            info!("Scraper stopped after timeout, browser session released");
            joined.context("scraper task panicked").map(ScrapeRun::Finished)
        }
        Err(_) => Ok(ScrapeRun::Stuck),
    }
}

fn log_progress(ev: &ProgressEvent) {
    match &ev.detail {
        Some(detail) => info!("[{}/{}] {}: {}", ev.step, ev.total_steps, ev.stage.label(), detail),
        None => info!("[{}/{}] {}...", ev.step, ev.total_steps, ev.stage.label()),
    }
}

fn log_result(events: &EventLogger, ok: bool, records: usize, high_probability: usize) {
    let logged = events.log(&ScrapeResultEvent {
        ts: now_iso(),
        event: "SCRAPE_RESULT",
        ok,
        records,
        high_probability,
    });
    if let Err(e) = logged {
        warn!("Failed to write result event: {}", e);
    }
}

async fn notify(cfg: &ScraperConfig, events: &EventLogger, count: usize) {
    let Some(topic) = cfg.ntfy_topic.as_deref() else {
        info!("NTFY_TOPIC not set, skipping alert for {} value bets", count);
        return;
    };

    let sent = send_ntfy_alert(topic, &value_bet_alert_message(count), "ValueBets Alert").await;
    let logged = events.log(&AlertEvent {
        ts: now_iso(),
        event: "ALERT",
        topic: topic.to_string(),
        count,
        sent,
    });
    if let Err(e) = logged {
        warn!("Failed to write alert event: {}", e);
    }
}
