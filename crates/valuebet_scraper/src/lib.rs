//! ValueBets scraper: OddsPortal value-bets přes headless Chrome.
//!
//! Pipeline: SessionManager → Navigator → extractor → normalizer → export.
//! Stránka nemá API ani stabilní markup; retry a validace jsou tu kvůli tomu.
//!
//! Struktura value-bets stránky:
//! https://www.oddsportal.com/value-bets/
//! <div class="tabs"> <div class="visible"> header / match / bookmaker </div> </div>

pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod model;
pub mod navigator;
pub mod normalizer;
pub mod orchestrator;
pub mod pacing;
pub mod progress;
pub mod session;

pub use config::ScraperConfig;
pub use error::{ConfigError, ExportError, ExtractionError, NavigationError, SessionError};
pub use export::export;
pub use extractor::extract;
pub use model::{Dataset, NormalizedRecord, RawRecord};
pub use navigator::Navigator;
pub use normalizer::normalize;
pub use orchestrator::{AttemptOutcome, AttemptState, Orchestrator};
pub use pacing::{JitterWindow, Pacing};
pub use progress::{NullProgress, ProgressEvent, ProgressSink, Stage};
pub use session::{
    BrowserPage, BrowsingSession, ChromeSession, ChromeSessionManager, SessionManager, SessionScope,
};
