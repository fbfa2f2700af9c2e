//! Error kinds surfaced by the roaming engine and its shell collaborators.

use std::process::ExitStatus;

use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RoamError {
    /// The latest scan contained no in-use access point for the roaming SSID.
    #[error("no active connection for ssid {ssid:?}")]
    NoActiveConnection { ssid: Option<String> },
    /// A networking tool could not be started at all.
    #[error("failed to run {program}: {source}")]
    CommandSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// A networking tool ran but exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },
    #[error("invalid config: {0}")]
    Config(String),
}

impl RoamError {
    /// Whether the controller loop should keep going after this error.
    ///
    /// Loss of association and tool failures are expected on flaky radios;
    /// a bad config never fixes itself.
    pub fn is_transient(&self) -> bool {
        !matches!(self, RoamError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, RoamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_not_transient() {
        assert!(!RoamError::Config("bad".into()).is_transient());
        assert!(RoamError::NoActiveConnection { ssid: None }.is_transient());
        let spawn = RoamError::CommandSpawn {
            program: "nmcli".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(spawn.is_transient());
    }

    #[test]
    fn no_active_connection_names_ssid() {
        let err = RoamError::NoActiveConnection {
            ssid: Some("home".into()),
        };
        assert_eq!(err.to_string(), "no active connection for ssid Some(\"home\")");
    }
}
