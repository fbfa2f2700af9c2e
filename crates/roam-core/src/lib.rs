//! # roam-core
//!
//! Unattended Wi-Fi roaming engine. Observes access points that share the
//! current SSID, scores them against the active link and repoints the managed
//! profile at a strictly better one.
//!
//! - [`scan`]: parses rescan output into observations
//! - [`registry`]: BSSID-keyed store with merge and eviction
//! - [`probe`]: gateway latency probing and smoothing
//! - [`scoring`]: gated candidate scoring and deterministic selection
//! - [`network`]: OS capability traits and the profile switcher
//! - [`controller`]: the two-speed monitoring loop

pub mod config;
pub mod controller;
pub mod error;
pub mod network;
pub mod probe;
pub mod registry;
pub mod scan;
pub mod scoring;

pub use config::RoamConfig;
pub use controller::{Cadence, Controller, ControllerState, Outcome};
pub use error::{Result, RoamError};
pub use network::{InterruptibleSleeper, Network, Sleeper, Switcher};
pub use registry::{ConnectionEntry, ConnectionRegistry};
pub use scan::Observation;
pub use scoring::{CandidateScorer, Choice, Rejection, Verdict};
