//! Debounced auto-save scheduling.
//!
//! The scheduler only decides *when* a save should start; the session
//! starts it through the normal single-flight save path.

use std::time::Duration;
use web_time::Instant;

/// Decides when pending edits should be flushed.
///
/// Two mechanisms keep saves from piling up:
/// 1. **Debounce delay**: wait this long after the last change so a burst
///    of edits goes out as one batch.
/// 2. **Minimum interval**: keep at least this much time between saves,
///    even while edits keep arriving.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    save_interval: Duration,
    debounce_delay: Duration,
    last_save: Option<Instant>,
    last_change: Option<Instant>,
    enabled: bool,
    dirty: bool,
}

impl SaveScheduler {
    pub const DEFAULT_SAVE_INTERVAL: Duration = Duration::from_secs(30);

    pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_secs(5);

    pub fn new() -> Self {
        Self {
            save_interval: Self::DEFAULT_SAVE_INTERVAL,
            debounce_delay: Self::DEFAULT_DEBOUNCE_DELAY,
            last_save: None,
            last_change: None,
            enabled: true,
            dirty: false,
        }
    }

    pub fn disabled() -> Self {
        let mut scheduler = Self::new();
        scheduler.enabled = false;
        scheduler
    }

    pub fn with_save_interval(mut self, interval: Duration) -> Self {
        self.save_interval = interval;
        self
    }

    pub fn with_debounce_delay(mut self, delay: Duration) -> Self {
        self.debounce_delay = delay;
        self
    }

    /// Record an edit that needs saving.
    pub fn mark_dirty(&mut self) {
        self.mark_dirty_at(Instant::now());
    }

    pub fn mark_dirty_at(&mut self, now: Instant) {
        self.dirty = true;
        self.last_change = Some(now);
        log::trace!("Save scheduler: edits pending");
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn should_save(&self) -> bool {
        self.should_save_at(Instant::now())
    }

    /// True when enabled, dirty, past the debounce delay and past the
    /// minimum interval since the last save attempt.
    pub fn should_save_at(&self, now: Instant) -> bool {
        if !self.enabled || !self.dirty {
            return false;
        }
        let Some(last_change) = self.last_change else {
            return false;
        };
        if now.saturating_duration_since(last_change) < self.debounce_delay {
            return false;
        }
        if let Some(last_save) = self.last_save
            && now.saturating_duration_since(last_save) < self.save_interval
        {
            return false;
        }
        true
    }

    pub fn mark_saved(&mut self) {
        self.mark_saved_at(Instant::now());
    }

    pub fn mark_saved_at(&mut self, now: Instant) {
        self.last_save = Some(now);
        self.dirty = false;
        self.last_change = None;
        log::trace!("Save scheduler: flushed");
    }

    /// Keep the dirty flag but wait a full interval before retrying.
    pub fn mark_save_failed(&mut self) {
        self.mark_save_failed_at(Instant::now());
    }

    pub fn mark_save_failed_at(&mut self, now: Instant) {
        self.last_save = Some(now);
        log::trace!("Save scheduler: flush failed, retrying after interval");
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        log::debug!("Save scheduler enabled: {}", enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Forget pending state, as when switching images.
    pub fn reset(&mut self) {
        self.last_save = None;
        self.last_change = None;
        self.dirty = false;
    }
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> SaveScheduler {
        SaveScheduler::new()
            .with_debounce_delay(Duration::from_secs(5))
            .with_save_interval(Duration::from_secs(30))
    }

    #[test]
    fn test_initial_state() {
        let s = SaveScheduler::new();
        assert!(!s.is_dirty());
        assert!(!s.should_save());
        assert!(s.is_enabled());
    }

    #[test]
    fn test_debounce_then_save() {
        let mut s = scheduler();
        let t0 = Instant::now();
        s.mark_dirty_at(t0);
        assert!(!s.should_save_at(t0 + Duration::from_secs(2)));
        assert!(s.should_save_at(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn test_new_change_restarts_debounce() {
        let mut s = scheduler();
        let t0 = Instant::now();
        s.mark_dirty_at(t0);
        s.mark_dirty_at(t0 + Duration::from_secs(4));
        assert!(!s.should_save_at(t0 + Duration::from_secs(6)));
        assert!(s.should_save_at(t0 + Duration::from_secs(9)));
    }

    #[test]
    fn test_minimum_interval_between_saves() {
        let mut s = scheduler();
        let t0 = Instant::now();
        s.mark_saved_at(t0);
        s.mark_dirty_at(t0 + Duration::from_secs(1));
        assert!(!s.should_save_at(t0 + Duration::from_secs(10)));
        assert!(s.should_save_at(t0 + Duration::from_secs(31)));
    }

    #[test]
    fn test_failure_keeps_dirty() {
        let mut s = scheduler();
        let t0 = Instant::now();
        s.mark_dirty_at(t0);
        s.mark_save_failed_at(t0 + Duration::from_secs(6));
        assert!(s.is_dirty());
        assert!(!s.should_save_at(t0 + Duration::from_secs(7)));
        assert!(s.should_save_at(t0 + Duration::from_secs(40)));
    }

    #[test]
    fn test_disabled() {
        let mut s = SaveScheduler::disabled();
        let t0 = Instant::now();
        s.mark_dirty_at(t0);
        assert!(!s.should_save_at(t0 + Duration::from_secs(600)));
    }
}
