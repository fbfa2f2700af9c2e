//! Capability seams between the roaming engine and the operating system.
//!
//! The engine only ever talks to the outside world through [`Network`] and
//! [`Sleeper`], which keeps the controller loop testable with scripted fakes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::probe::RttStats;
use crate::scan::Observation;

/// OS networking tools, invoked synchronously.
pub trait Network {
    /// Whether the managed profile exists and is a wireless profile.
    fn is_available(&mut self) -> Result<bool>;

    /// Trigger a rescan and return every parsed access point.
    fn scan(&mut self) -> Result<Vec<Observation>>;

    /// Gateway of the default route, if there is one.
    fn default_gateway(&mut self) -> Result<Option<String>>;

    /// Send `count` echoes to `gateway`, giving up after `deadline`.
    /// `Ok(None)` means the tool ran but produced no usable summary.
    fn probe(&mut self, gateway: &str, count: u32, deadline: Duration)
        -> Result<Option<RttStats>>;

    /// Pin the managed profile to `bssid`, or unpin it with `None`.
    fn pin_bssid(&mut self, bssid: Option<&str>) -> Result<()>;

    /// Restart the network management service.
    fn restart(&mut self) -> Result<()>;
}

/// Blocking pause between loop iterations and after reconfiguration.
pub trait Sleeper {
    fn sleep(&mut self, duration: Duration);
}

/// Thread sleeper that wakes early once `running` is cleared.
pub struct InterruptibleSleeper {
    running: Arc<AtomicBool>,
    slice: Duration,
}

impl InterruptibleSleeper {
    pub fn new(running: Arc<AtomicBool>) -> Self {
        InterruptibleSleeper {
            running,
            slice: Duration::from_millis(250),
        }
    }
}

impl Sleeper for InterruptibleSleeper {
    fn sleep(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while self.running.load(Ordering::Relaxed) {
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            std::thread::sleep(self.slice.min(deadline - now));
        }
    }
}

// ─── Switcher ───────────────────────────────────────────────────────────

/// Applies roaming decisions to the managed profile.
///
/// Both operations restart networking and then wait `settle` so the next
/// scan sees the new association rather than the teardown.
#[derive(Debug, Clone, Copy)]
pub struct Switcher {
    settle: Duration,
}

impl Switcher {
    pub fn new(settle: Duration) -> Self {
        Switcher { settle }
    }

    /// Pin the profile to `bssid` and restart networking.
    pub fn apply<N, S>(&self, network: &mut N, sleeper: &mut S, bssid: &str) -> Result<()>
    where
        N: Network + ?Sized,
        S: Sleeper + ?Sized,
    {
        self.pin(network, bssid)?;
        self.restart(network, sleeper)
    }

    /// First half of [`apply`](Switcher::apply): write the pin only.
    pub fn pin<N>(&self, network: &mut N, bssid: &str) -> Result<()>
    where
        N: Network + ?Sized,
    {
        network.pin_bssid(Some(bssid))
    }

    /// Second half of [`apply`](Switcher::apply): restart and settle.
    pub fn restart<N, S>(&self, network: &mut N, sleeper: &mut S) -> Result<()>
    where
        N: Network + ?Sized,
        S: Sleeper + ?Sized,
    {
        network.restart()?;
        sleeper.sleep(self.settle);
        Ok(())
    }

    /// Drop any BSSID pin left over from a previous run.
    pub fn reset<N, S>(&self, network: &mut N, sleeper: &mut S) -> Result<()>
    where
        N: Network + ?Sized,
        S: Sleeper + ?Sized,
    {
        network.pin_bssid(None)?;
        network.restart()?;
        sleeper.sleep(self.settle);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FakeNetwork, RecordingSleeper};
    use super::*;

    #[test]
    fn apply_pins_restarts_then_settles() {
        let mut net = FakeNetwork::default();
        let mut sleeper = RecordingSleeper::default();
        Switcher::new(Duration::from_secs(10))
            .apply(&mut net, &mut sleeper, "BB")
            .unwrap();
        assert_eq!(net.pins, vec![Some("BB".to_string())]);
        assert_eq!(net.restarts, 1);
        assert_eq!(sleeper.sleeps, vec![Duration::from_secs(10)]);
    }

    #[test]
    fn failed_restart_skips_settle() {
        let mut net = FakeNetwork {
            fail_restart: true,
            ..FakeNetwork::default()
        };
        let mut sleeper = RecordingSleeper::default();
        let switcher = Switcher::new(Duration::from_secs(10));
        assert!(switcher.apply(&mut net, &mut sleeper, "BB").is_err());
        assert_eq!(net.pins, vec![Some("BB".to_string())]);
        assert!(sleeper.sleeps.is_empty());
    }

    #[test]
    fn reset_unpins() {
        let mut net = FakeNetwork::default();
        let mut sleeper = RecordingSleeper::default();
        Switcher::new(Duration::from_secs(3))
            .reset(&mut net, &mut sleeper)
            .unwrap();
        assert_eq!(net.pins, vec![None]);
        assert_eq!(net.restarts, 1);
        assert_eq!(sleeper.sleeps, vec![Duration::from_secs(3)]);
    }

    #[test]
    fn stopped_sleeper_returns_immediately() {
        let running = Arc::new(AtomicBool::new(false));
        let mut sleeper = InterruptibleSleeper::new(running);
        let started = Instant::now();
        sleeper.sleep(Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn running_sleeper_waits_out_the_duration() {
        let running = Arc::new(AtomicBool::new(true));
        let mut sleeper = InterruptibleSleeper::new(running);
        let started = Instant::now();
        sleeper.sleep(Duration::from_millis(30));
        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
