//! Network reachability tracking.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// Tracks the last reachability report from the platform.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    online: AtomicBool,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ConnectivityMonitor {
    /// Creates a monitor with an initial state.
    #[must_use]
    pub const fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    /// Last reported state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Records a reachability report. Returns `true` on an offline to
    /// online transition, when queued actions should be replayed.
    pub fn update(&self, online: bool) -> bool {
        let was_online = self.online.swap(online, Ordering::SeqCst);
        if was_online != online {
            info!(online, "Connectivity changed");
        }
        online && !was_online
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_is_reported_once() {
        let monitor = ConnectivityMonitor::default();
        assert!(!monitor.update(true));
        assert!(!monitor.update(false));
        assert!(!monitor.is_online());
        assert!(monitor.update(true));
        assert!(!monitor.update(true));
    }
}
