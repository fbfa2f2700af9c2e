//! # Roaming Controller
//!
//! Drives the scan → merge → score → switch cycle. All collaborators are
//! owned by the controller and injected at construction, so a test can run
//! the full loop against a scripted [`Network`] and a recording [`Sleeper`].
//!
//! Cadence is deliberately asymmetric: right after a switch the loop
//! re-checks on the short interval, otherwise it backs off to the long one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::config::{RoamConfig, TimingConfig};
use crate::error::{Result, RoamError};
use crate::network::{Network, Sleeper, Switcher};
use crate::probe::LatencyProber;
use crate::registry::ConnectionRegistry;
use crate::scoring::CandidateScorer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// The managed profile is missing or not wireless. Terminal.
    Unavailable,
    Starting,
    Monitoring,
}

/// Delay class chosen after each monitoring iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Short,
    Long,
}

/// What a single monitoring iteration decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No candidate beat the active link.
    Stayed { active: String },
    /// The profile was repointed to `to`.
    Switched { from: String, to: String, score: i32 },
    /// A winner was found but dry-run mode left the profile alone.
    WouldSwitch { from: String, to: String, score: i32 },
}

impl Outcome {
    pub fn cadence(&self) -> Cadence {
        match self {
            Outcome::Switched { .. } => Cadence::Short,
            Outcome::Stayed { .. } | Outcome::WouldSwitch { .. } => Cadence::Long,
        }
    }
}

pub struct Controller<N, S> {
    network: N,
    sleeper: S,
    registry: ConnectionRegistry,
    prober: LatencyProber,
    scorer: CandidateScorer,
    switcher: Switcher,
    timing: TimingConfig,
    state: ControllerState,
    last_applied: Option<String>,
    report_current: bool,
    dry_run: bool,
}

impl<N: Network, S: Sleeper> Controller<N, S> {
    pub fn new(config: &RoamConfig, network: N, sleeper: S) -> Self {
        Controller {
            network,
            sleeper,
            registry: ConnectionRegistry::new(config.registry),
            prober: LatencyProber::new(config.probe),
            scorer: CandidateScorer::new(config.scoring),
            switcher: Switcher::new(config.timing.settle),
            timing: config.timing,
            state: ControllerState::Starting,
            last_applied: None,
            report_current: true,
            dry_run: false,
        }
    }

    /// Score and log decisions without ever touching the profile.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// BSSID the profile was last pinned to by this controller.
    pub fn last_applied(&self) -> Option<&str> {
        self.last_applied.as_deref()
    }

    pub fn interval(&self, cadence: Cadence) -> Duration {
        match cadence {
            Cadence::Short => self.timing.short_interval,
            Cadence::Long => self.timing.long_interval,
        }
    }

    /// Check the profile and clear any stale BSSID pin.
    ///
    /// Moves to [`ControllerState::Unavailable`] when there is no wireless
    /// profile to manage, otherwise to [`ControllerState::Monitoring`].
    pub fn start(&mut self) -> Result<ControllerState> {
        if !self.network.is_available()? {
            tracing::info!("no managed wireless profile, nothing to do");
            self.state = ControllerState::Unavailable;
            return Ok(self.state);
        }

        if self.dry_run {
            tracing::info!("dry run, leaving existing bssid pin in place");
        } else {
            tracing::info!("clearing bssid pin");
            self.switcher.reset(&mut self.network, &mut self.sleeper)?;
        }
        self.state = ControllerState::Monitoring;
        Ok(self.state)
    }

    /// One monitoring iteration. Errors are returned as-is; see [`step`]
    /// for the policy applied by the loop.
    ///
    /// [`step`]: Controller::step
    pub fn tick(&mut self) -> Result<Outcome> {
        let observations = self.network.scan()?;
        tracing::debug!(observed = observations.len(), "scan complete");

        let network = &mut self.network;
        let prober = &self.prober;
        self.registry
            .refresh(observations, || prober.measure(&mut *network));

        let active = self.registry.active()?;
        if let Some(pinned) = self.last_applied.as_deref() {
            if pinned != active.bssid {
                tracing::warn!(
                    pinned,
                    active = %active.bssid,
                    "associated access point differs from pinned bssid"
                );
            }
        }
        if self.report_current {
            tracing::info!(
                bssid = %active.bssid,
                ssid = %active.ssid,
                quality = active.quality,
                rate = active.rate,
                latency_ms = ?active.latency_ms,
                "current link"
            );
        } else {
            tracing::debug!(
                bssid = %active.bssid,
                quality = active.quality,
                rate = active.rate,
                latency_ms = ?active.latency_ms,
                "current link"
            );
        }

        let from = active.bssid.clone();
        let Some(choice) = self.scorer.best(active, self.registry.candidates()) else {
            self.report_current = false;
            return Ok(Outcome::Stayed { active: from });
        };
        let to = choice.entry.bssid.clone();
        let score = choice.score;
        tracing::info!(
            from = %from,
            to = %to,
            score,
            quality = choice.entry.quality,
            rate = choice.entry.rate,
            dry_run = self.dry_run,
            "switching access point"
        );

        if self.dry_run {
            self.report_current = false;
            return Ok(Outcome::WouldSwitch { from, to, score });
        }

        self.switcher.pin(&mut self.network, &to)?;
        self.last_applied = Some(to.clone());
        self.report_current = true;
        if let Err(e) = self.switcher.restart(&mut self.network, &mut self.sleeper) {
            tracing::error!(
                bssid = %to,
                error = %e,
                "profile pinned but networking restart failed"
            );
            return Err(e);
        }
        Ok(Outcome::Switched { from, to, score })
    }

    /// Run one iteration and pick the next cadence.
    ///
    /// Transient failures (lost association, tool errors) are logged and
    /// answered with the long interval; only non-transient errors escape.
    pub fn step(&mut self) -> Result<Cadence> {
        match self.tick() {
            Ok(outcome) => Ok(outcome.cadence()),
            Err(e @ RoamError::NoActiveConnection { .. }) => {
                tracing::warn!(error = %e, "not associated, retrying later");
                Ok(Cadence::Long)
            }
            Err(e) if e.is_transient() => {
                tracing::error!(error = %e, "iteration failed, retrying later");
                Ok(Cadence::Long)
            }
            Err(e) => Err(e),
        }
    }

    /// Start up and monitor until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        if self.start()? == ControllerState::Unavailable {
            return Ok(());
        }

        while running.load(Ordering::Relaxed) {
            let cadence = self.step()?;
            if !running.load(Ordering::Relaxed) {
                break;
            }
            let interval = self.interval(cadence);
            tracing::debug!(?cadence, interval_secs = interval.as_secs(), "sleeping");
            self.sleeper.sleep(interval);
        }

        tracing::info!("controller stopped");
        Ok(())
    }
}
