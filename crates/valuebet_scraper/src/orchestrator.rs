//! Retry orchestrátor: session → navigace → extrakce → normalizace,
//! v omezeném počtu pokusů s flat jittered backoffem.
//!
//! Každý pokus má vlastní session, která se uvolní dřív, než začne další
//! pokus nebo než smyčka skončí.

use crate::config::ScraperConfig;
use crate::error::NavigationError;
use crate::extractor;
use crate::model::Dataset;
use crate::navigator::Navigator;
use crate::normalizer;
use crate::pacing::{sleep_unless_shutdown, Pacing};
use crate::progress::{emit, ProgressEvent, ProgressSink, Stage};
use crate::session::{SessionManager, SessionScope};
use logger::{now_iso, EventLogger, ScrapeAttemptEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Výsledek jednoho pokusu, řídí retry smyčku
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Dataset),
    Retryable(String),
    Fatal(String),
}

impl AttemptOutcome {
    fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success(_) => "success",
            AttemptOutcome::Retryable(_) => "retryable",
            AttemptOutcome::Fatal(_) => "fatal",
        }
    }
}

/// Stavy jednoho pokusu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    SessionAcquired,
    Navigated,
    Extracted,
    Normalized,
    Success,
    AttemptFailed,
    Failure,
}

pub struct Orchestrator<M: SessionManager> {
    sessions:     M,
    navigator:    Navigator,
    nav_attempts: u32,
    pacing:       Pacing,
    events:       Option<EventLogger>,
    shutdown:     Arc<AtomicBool>,
}

const CANCELLED: &str = "run cancelled by shutdown request";

impl<M: SessionManager> Orchestrator<M> {
    pub fn new(sessions: M, cfg: &ScraperConfig) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        Self {
            sessions,
            navigator: Navigator::new(cfg.target_url.clone(), cfg.pacing)
                .with_shutdown(shutdown.clone()),
            nav_attempts: cfg.nav_attempts,
            pacing: cfg.pacing,
            events: None,
            shutdown,
        }
    }

    /// JSONL event log pro jednotlivé pokusy
    pub fn with_event_log(mut self, events: EventLogger) -> Self {
        self.events = Some(events);
        self
    }

    pub fn sessions(&self) -> &M {
        &self.sessions
    }

    /// Handle pro zastavení běhu z jiného vlákna.
    ///
    /// `store(true, Ordering::SeqCst)` ukončí běh na nejbližší hranici fáze
    /// nebo pauzy; rozpracovaná session se uvolní normálně.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Vrací dataset, nebo None po vyčerpání pokusů / fatální chybě
    pub fn run<P>(&self, max_attempts: u32, progress: &P) -> Option<Dataset>
    where
        P: ProgressSink + ?Sized,
    {
        if max_attempts == 0 || self.nav_attempts == 0 {
            error!(
                max_attempts,
                nav_attempts = self.nav_attempts,
                "Invalid attempt configuration, nothing to run"
            );
            emit(
                progress,
                ProgressEvent::new(
                    Stage::Failed,
                    0,
                    max_attempts,
                    Some("invalid attempt configuration".to_string()),
                ),
            );
            return None;
        }

        for attempt in 1..=max_attempts {
            if self.is_shutdown_requested() {
                return self.cancel(attempt, max_attempts, progress);
            }

            info!("Starting scraping attempt {}/{}", attempt, max_attempts);
            emit(progress, ProgressEvent::new(Stage::AttemptStarted, attempt, max_attempts, None));

            let outcome = self.run_attempt(attempt, max_attempts, progress);
            self.log_attempt(attempt, max_attempts, &outcome);

            match outcome {
                AttemptOutcome::Success(dataset) => {
                    if dataset.is_empty() {
                        warn!("Scrape succeeded but no value bets were listed");
                    }
                    info!("Scraping attempt {} succeeded with {} rows", attempt, dataset.len());
                    emit(
                        progress,
                        ProgressEvent::new(
                            Stage::Completed,
                            attempt,
                            max_attempts,
                            Some(format!("{} value bets", dataset.len())),
                        ),
                    );
                    return Some(dataset);
                }
                AttemptOutcome::Fatal(reason) => {
                    debug!(
                        attempt,
                        "{:?} -> {:?}",
                        AttemptState::AttemptFailed,
                        AttemptState::Failure
                    );
                    error!("Unrecoverable error in attempt {}: {}", attempt, reason);
                    emit(
                        progress,
                        ProgressEvent::new(Stage::Failed, attempt, max_attempts, Some(reason)),
                    );
                    return None;
                }
                AttemptOutcome::Retryable(_) if self.is_shutdown_requested() => {
                    return self.cancel(attempt, max_attempts, progress);
                }
                AttemptOutcome::Retryable(reason) => {
                    warn!("Attempt {} failed to retrieve valid data: {}", attempt, reason);

                    if attempt < max_attempts {
                        let delay = self.pacing.attempt_backoff.sample(&mut rand::thread_rng());
                        let detail = format!("{reason}; retrying in {:.0}s", delay.as_secs_f64());
                        emit(
                            progress,
                            ProgressEvent::new(
                                Stage::AttemptFailed,
                                attempt,
                                max_attempts,
                                Some(detail),
                            ),
                        );
                        info!("Waiting {:.2} seconds before next attempt", delay.as_secs_f64());
                        if !sleep_unless_shutdown(delay, &self.shutdown) {
                            return self.cancel(attempt, max_attempts, progress);
                        }
                    } else {
                        emit(
                            progress,
                            ProgressEvent::new(
                                Stage::AttemptFailed,
                                attempt,
                                max_attempts,
                                Some(reason),
                            ),
                        );
                    }
                }
            }
        }

        error!("All scraping attempts failed");
        emit(
            progress,
            ProgressEvent::new(
                Stage::Failed,
                max_attempts,
                max_attempts,
                Some("all scraping attempts failed".to_string()),
            ),
        );
        None
    }

    fn cancel<P>(&self, attempt: u32, max_attempts: u32, progress: &P) -> Option<Dataset>
    where
        P: ProgressSink + ?Sized,
    {
        warn!("Shutdown requested, stopping before attempt {} completes", attempt);
        emit(
            progress,
            ProgressEvent::new(Stage::Failed, attempt, max_attempts, Some(CANCELLED.to_string())),
        );
        None
    }

    fn run_attempt<P>(&self, attempt: u32, max_attempts: u32, progress: &P) -> AttemptOutcome
    where
        P: ProgressSink + ?Sized,
    {
        let mut state = AttemptState::Idle;

        emit(progress, ProgressEvent::new(Stage::LaunchingBrowser, attempt, max_attempts, None));
        let session = match SessionScope::acquire(&self.sessions) {
            Ok(session) => session,
            Err(e) => {
                fail(state, attempt);
                return AttemptOutcome::Fatal(e.to_string());
            }
        };
        advance(&mut state, AttemptState::SessionAcquired, attempt);
        if self.is_shutdown_requested() {
            fail(state, attempt);
            return AttemptOutcome::Retryable(CANCELLED.to_string());
        }

        emit(progress, ProgressEvent::new(Stage::Navigating, attempt, max_attempts, None));
        let Some(html) = self.navigator.fetch_markup(&*session, 1, self.nav_attempts) else {
            fail(state, attempt);
            let reason = NavigationError::Exhausted(self.nav_attempts).to_string();
            return AttemptOutcome::Retryable(reason);
        };
        advance(&mut state, AttemptState::Navigated, attempt);
        if self.is_shutdown_requested() {
            fail(state, attempt);
            return AttemptOutcome::Retryable(CANCELLED.to_string());
        }

        emit(progress, ProgressEvent::new(Stage::Extracting, attempt, max_attempts, None));
        let records = match extractor::extract(&html) {
            Ok(records) => records,
            Err(e) => {
                fail(state, attempt);
                return AttemptOutcome::Retryable(e.to_string());
            }
        };
        advance(&mut state, AttemptState::Extracted, attempt);

        emit(progress, ProgressEvent::new(Stage::Normalizing, attempt, max_attempts, None));
        let dataset = normalizer::normalize(records);
        advance(&mut state, AttemptState::Normalized, attempt);
        advance(&mut state, AttemptState::Success, attempt);

        AttemptOutcome::Success(dataset)
        // session scope drop → release
    }

    fn log_attempt(&self, attempt: u32, max_attempts: u32, outcome: &AttemptOutcome) {
        let Some(events) = &self.events else { return };

        let (reason, records) = match outcome {
            AttemptOutcome::Success(ds) => (None, ds.len()),
            AttemptOutcome::Retryable(r) | AttemptOutcome::Fatal(r) => (Some(r.clone()), 0),
        };
        let ev = ScrapeAttemptEvent {
            ts: now_iso(),
            event: "SCRAPE_ATTEMPT",
            attempt,
            max_attempts,
            outcome: outcome.label(),
            reason,
            records,
        };
        if let Err(e) = events.log(&ev) {
            warn!("Failed to write attempt event: {}", e);
        }
    }
}

fn advance(state: &mut AttemptState, next: AttemptState, attempt: u32) {
    debug!(attempt, "{:?} -> {:?}", state, next);
    *state = next;
}

fn fail(state: AttemptState, attempt: u32) {
    debug!(attempt, "{:?} -> {:?}", state, AttemptState::AttemptFailed);
}
