//! NetworkManager backend — drives `nmcli`, `ip`, `ping` and `systemctl`.
//!
//! Every call is a blocking child process with captured stdout. Output
//! parsing lives in `roam_core` so it can be tested without the tools.

use std::process::{Command, Output};
use std::time::Duration;

use roam_core::probe::{parse_default_gateway, parse_ping_summary, RttStats};
use roam_core::scan::{parse_scan_output, Observation};
use roam_core::{Network, RoamError};

const WIRELESS_TYPE: &str = "802-11-wireless";
const BSSID_PROPERTY: &str = "802-11-wireless.bssid";

/// Manages a single NetworkManager connection profile.
pub struct NmcliNetwork {
    profile: String,
}

impl NmcliNetwork {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
        }
    }
}

impl Network for NmcliNetwork {
    fn is_available(&mut self) -> roam_core::Result<bool> {
        let args = ["-g", "connection.type", "connection", "show", self.profile.as_str()];
        match run("nmcli", &args) {
            Ok(stdout) => Ok(stdout.trim() == WIRELESS_TYPE),
            // nmcli exits non-zero for an unknown profile.
            Err(RoamError::CommandFailed { stderr, .. }) => {
                tracing::debug!(profile = %self.profile, %stderr, "profile lookup failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    fn scan(&mut self) -> roam_core::Result<Vec<Observation>> {
        let stdout = run("nmcli", &["device", "wifi", "list", "--rescan", "yes"])?;
        Ok(parse_scan_output(&stdout))
    }

    fn default_gateway(&mut self) -> roam_core::Result<Option<String>> {
        let stdout = run("ip", &["route", "show", "default"])?;
        Ok(parse_default_gateway(&stdout))
    }

    fn probe(
        &mut self,
        gateway: &str,
        count: u32,
        deadline: Duration,
    ) -> roam_core::Result<Option<RttStats>> {
        let count = count.to_string();
        let deadline = deadline.as_secs().to_string();
        // ping exits 1 on partial loss but still prints a usable summary.
        let output = spawn("ping", &["-U", "-c", count.as_str(), "-w", deadline.as_str(), gateway])?;
        Ok(parse_ping_summary(&String::from_utf8_lossy(&output.stdout)))
    }

    fn pin_bssid(&mut self, bssid: Option<&str>) -> roam_core::Result<()> {
        let value = bssid.unwrap_or("");
        run(
            "nmcli",
            &["connection", "modify", self.profile.as_str(), BSSID_PROPERTY, value],
        )?;
        Ok(())
    }

    fn restart(&mut self) -> roam_core::Result<()> {
        run("systemctl", &["restart", "NetworkManager"])?;
        Ok(())
    }
}

/// Run a tool to completion and return its stdout, failing on non-zero exit.
fn run(program: &str, args: &[&str]) -> roam_core::Result<String> {
    let output = spawn(program, args)?;
    if !output.status.success() {
        return Err(RoamError::CommandFailed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn spawn(program: &str, args: &[&str]) -> roam_core::Result<Output> {
    tracing::trace!(program, ?args, "running");
    Command::new(program)
        .args(args)
        .output()
        .map_err(|source| RoamError::CommandSpawn {
            program: program.to_string(),
            source,
        })
}
