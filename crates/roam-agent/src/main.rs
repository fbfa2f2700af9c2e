//! Roaming Agent
//!
//! Long-running daemon on each field device. Keeps the managed Wi-Fi
//! profile pinned to the best access point of its current network:
//!
//! - Rescans periodically and tracks every BSSID of the active SSID
//! - Probes gateway latency over the active link
//! - Pins the profile to a clearly better BSSID and restarts NetworkManager
//!
//! ## Usage
//!
//! ```bash
//! # Defaults (profile `10-kiss-enable-master`, 5 min back-off)
//! roam-agent
//!
//! # Custom profile and tuning
//! roam-agent --profile uplink --config /etc/roam/roam.toml
//!
//! # Score once and report what would happen
//! RUST_LOG=debug roam-agent --once --dry-run
//! ```

mod nmcli;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use roam_core::{Controller, ControllerState, InterruptibleSleeper, RoamConfig};
use tracing_subscriber::EnvFilter;

/// Wi-Fi roaming agent daemon.
#[derive(Parser, Debug)]
#[command(name = "roam-agent", about = "Unattended Wi-Fi roaming agent")]
struct Cli {
    /// TOML config file; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// NetworkManager connection profile to manage (overrides the config).
    #[arg(long)]
    profile: Option<String>,

    /// Run start-up and a single monitoring iteration, then exit.
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Scan, probe and score, but never pin or restart networking.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    // ── Logging ─────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    // ── Config ──────────────────────────────────────────────────
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.profile)?;

    tracing::info!(
        profile = %config.profile,
        quality_penalty = config.scoring.quality_penalty,
        long_interval_s = config.timing.long_interval.as_secs(),
        once = cli.once,
        dry_run = cli.dry_run,
        "roam-agent starting"
    );

    // ── Graceful shutdown ───────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            tracing::info!("shutting down...");
            running.store(false, Ordering::Relaxed);
        })?;
    }

    // ── Controller ──────────────────────────────────────────────
    let network = nmcli::NmcliNetwork::new(config.profile.clone());
    let sleeper = InterruptibleSleeper::new(running.clone());
    let mut controller = Controller::new(&config, network, sleeper).with_dry_run(cli.dry_run);

    if cli.once {
        if controller.start()? == ControllerState::Monitoring {
            let cadence = controller.step()?;
            tracing::info!(?cadence, "single iteration complete");
        }
    } else {
        controller.run(&running)?;
    }

    tracing::info!("roam-agent stopped");
    Ok(())
}

/// Resolve the effective config: file (if any), then CLI overrides.
fn load_config(path: Option<&Path>, profile: Option<String>) -> anyhow::Result<RoamConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            RoamConfig::from_toml_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => RoamConfig::default(),
    };

    if let Some(profile) = profile {
        let profile = profile.trim();
        if profile.is_empty() {
            anyhow::bail!("--profile must not be empty");
        }
        config.profile = profile.to_string();
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::parse_from(["roam-agent", "--profile", "uplink", "--once", "--dry-run"]);
        assert_eq!(cli.profile.as_deref(), Some("uplink"));
        assert!(cli.once);
        assert!(cli.dry_run);
        assert!(cli.config.is_none());
    }

    #[test]
    fn defaults_without_file() {
        let cfg = load_config(None, None).unwrap();
        assert_eq!(cfg, RoamConfig::default());
    }

    #[test]
    fn profile_flag_overrides_file() {
        let path = std::env::temp_dir().join(format!("roam-agent-test-{}.toml", std::process::id()));
        std::fs::write(&path, "profile = \"from-file\"\n[timing]\nlong_interval_secs = 60\n").unwrap();

        let from_file = load_config(Some(&path), None).unwrap();
        assert_eq!(from_file.profile, "from-file");
        assert_eq!(from_file.timing.long_interval.as_secs(), 60);

        let overridden = load_config(Some(&path), Some("cli".into())).unwrap();
        assert_eq!(overridden.profile, "cli");
        assert_eq!(overridden.timing.long_interval.as_secs(), 60);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn bad_inputs_are_rejected() {
        assert!(load_config(None, Some("  ".into())).is_err());
        assert!(load_config(Some(Path::new("/nonexistent/roam.toml")), None).is_err());
    }
}
