//! Randomizované pauzy proti fingerprintingu podle pevného časování.

use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Granularita kontroly shutdown flagu během spánku
const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Spí `delay`, ale skončí dřív, jakmile je `shutdown` nastavený.
/// Vrací false, pokud byl spánek přerušen.
pub fn sleep_unless_shutdown(delay: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + delay;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

/// Uniformní okno pro náhodné zpoždění `[min, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterWindow {
    pub min: Duration,
    pub max: Duration,
}

impl JitterWindow {
    pub const ZERO: JitterWindow = JitterWindow::secs(0, 0);

    pub const fn secs(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_secs(min),
            max: Duration::from_secs(max),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        Duration::from_secs_f64(rng.gen_range(self.min.as_secs_f64()..self.max.as_secs_f64()))
    }

    /// Blokující sleep na náhodnou dobu z okna, vrací navzorkovanou délku.
    /// Shutdown spánek zkrátí.
    pub fn pause(&self, what: &str, shutdown: &AtomicBool) -> Duration {
        let delay = self.sample(&mut rand::thread_rng());
        if !delay.is_zero() {
            debug!("Pausing {:.2}s ({})", delay.as_secs_f64(), what);
            sleep_unless_shutdown(delay, shutdown);
        }
        delay
    }
}

/// Všechna pacing okna pipeline na jednom místě
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Před opakováním navigace ve stejné session
    pub nav_retry: JitterWindow,
    /// Mezi načtením stránky a kliknutím na filtr
    pub after_navigation: JitterWindow,
    /// Mezi kliknutím a čtením markupu
    pub after_interaction: JitterWindow,
    /// Flat backoff mezi pokusy orchestrátoru (ne exponenciální)
    pub attempt_backoff: JitterWindow,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            nav_retry:         JitterWindow::secs(3, 7),
            after_navigation:  JitterWindow::secs(1, 3),
            after_interaction: JitterWindow::secs(2, 4),
            attempt_backoff:   JitterWindow::secs(5, 15),
        }
    }
}

impl Pacing {
    /// Bez pauz, pro testy a dry-runy
    pub fn none() -> Self {
        Self {
            nav_retry:         JitterWindow::ZERO,
            after_navigation:  JitterWindow::ZERO,
            after_interaction: JitterWindow::ZERO,
            attempt_backoff:   JitterWindow::ZERO,
        }
    }
}
