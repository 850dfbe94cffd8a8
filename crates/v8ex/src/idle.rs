//! Idle maintenance coordination.
//!
//! The host main loop fires idle notifications whenever it has no
//! higher-priority work. The coordinator forwards those into the bound
//! engine instance as low-priority maintenance signals, throttled to a
//! minimum interval so idle time never turns into a busy loop.
//!
//! The coordinator holds only a `Weak` reference to its session: once
//! the executor tears the instance down, a late notification observes
//! the dead reference and asks the loop to drop the registration. It
//! holds no lock; the loop's designated thread is the sole caller.

use crate::engine::EngineSession;
use crate::mainloop::IdleHandler;
use std::sync::Weak;
use std::time::{Duration, Instant};
use tracing::debug;

/// Minimum interval between forwarded maintenance signals.
pub const IDLE_THROTTLE: Duration = Duration::from_millis(1000);

/// Throttling bridge between one host-loop registration and one engine
/// instance. Lifecycle is 1:1 with the instance; never reused.
pub struct IdleMaintenanceCoordinator {
    session: Weak<dyn EngineSession>,
    throttle: Duration,
    last_forwarded: Option<Instant>,
}

impl IdleMaintenanceCoordinator {
    pub fn new(session: Weak<dyn EngineSession>) -> Self {
        Self::with_throttle(session, IDLE_THROTTLE)
    }

    pub fn with_throttle(session: Weak<dyn EngineSession>, throttle: Duration) -> Self {
        Self {
            session,
            throttle,
            last_forwarded: None,
        }
    }

    /// Handle one idle notification stamped `now`.
    ///
    /// Forwards a maintenance signal when the instance is alive and the
    /// throttle interval has elapsed since the last forward; otherwise
    /// does nothing. Returns whether the registration should be kept.
    pub fn on_idle_at(&mut self, now: Instant) -> bool {
        let Some(session) = self.session.upgrade() else {
            // Race between teardown and an already-dispatched idle
            // notification; swallow it and deregister.
            debug!("idle signal after engine teardown; dropping registration");
            return false;
        };

        let due = match self.last_forwarded {
            None => true,
            Some(prev) => now.duration_since(prev) > self.throttle,
        };
        if due {
            session.notify_idle();
            self.last_forwarded = Some(now);
        }
        true
    }
}

impl IdleHandler for IdleMaintenanceCoordinator {
    fn on_host_idle(&mut self) -> bool {
        self.on_idle_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingSession {
        signals: AtomicUsize,
    }

    impl EngineSession for RecordingSession {
        fn notify_idle(&self) {
            self.signals.fetch_add(1, Ordering::SeqCst);
        }

        fn shutdown(&self) {}
    }

    fn coordinator(session: &Arc<RecordingSession>) -> IdleMaintenanceCoordinator {
        let weak = Arc::downgrade(session) as Weak<dyn EngineSession>;
        IdleMaintenanceCoordinator::new(weak)
    }

    #[test]
    fn test_throttles_to_minimum_interval() {
        let session = Arc::new(RecordingSession::default());
        let mut coordinator = coordinator(&session);

        let t = Instant::now();
        assert!(coordinator.on_idle_at(t));
        assert!(coordinator.on_idle_at(t + Duration::from_millis(200)));
        assert!(coordinator.on_idle_at(t + Duration::from_millis(1100)));

        // Forwards at t and t+1100ms; t+200ms falls inside the window.
        assert_eq!(session.signals.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_interval_must_strictly_exceed_throttle() {
        let session = Arc::new(RecordingSession::default());
        let mut coordinator = coordinator(&session);

        let t = Instant::now();
        coordinator.on_idle_at(t);
        coordinator.on_idle_at(t + Duration::from_millis(1000));
        assert_eq!(session.signals.load(Ordering::SeqCst), 1);

        coordinator.on_idle_at(t + Duration::from_millis(1001));
        assert_eq!(session.signals.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_throttle_window_restarts_from_last_forward() {
        let session = Arc::new(RecordingSession::default());
        let mut coordinator = coordinator(&session);

        let t = Instant::now();
        coordinator.on_idle_at(t);
        coordinator.on_idle_at(t + Duration::from_millis(1100));
        coordinator.on_idle_at(t + Duration::from_millis(1200));
        coordinator.on_idle_at(t + Duration::from_millis(2200));

        assert_eq!(session.signals.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_dead_session_is_swallowed_and_deregistered() {
        let session = Arc::new(RecordingSession::default());
        let mut coordinator = coordinator(&session);

        let t = Instant::now();
        coordinator.on_idle_at(t);
        drop(session);

        assert!(!coordinator.on_idle_at(t + Duration::from_millis(2000)));
    }

    #[test]
    fn test_first_signal_forwards_immediately() {
        let session = Arc::new(RecordingSession::default());
        let mut coordinator = coordinator(&session);

        coordinator.on_idle_at(Instant::now());
        assert_eq!(session.signals.load(Ordering::SeqCst), 1);
    }
}
