//! # Connection Registry
//!
//! Identity-keyed store of every access point seen since start-up. Scans are
//! merged by BSSID: a new BSSID creates an entry, a known one has its
//! quality, rate and in-use flag overwritten. The SSID being roamed within is
//! learned from the first in-use observation and never changes afterwards.
//!
//! Entries remember the scan in which they were last mentioned. Only entries
//! from the latest scan are eligible as the active link or as candidates, and
//! entries that stay absent long enough are evicted to bound memory.

use std::collections::HashMap;

use crate::config::RegistryConfig;
use crate::error::{Result, RoamError};
use crate::probe::smooth;
use crate::scan::Observation;

/// One access point as tracked across scans.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEntry {
    pub bssid: String,
    pub ssid: String,
    pub quality: i32,
    pub rate: u32,
    pub in_use: bool,
    /// Smoothed gateway latency; only present once the entry has been active.
    pub latency_ms: Option<f64>,
    last_seen: u64,
}

impl From<Observation> for ConnectionEntry {
    fn from(obs: Observation) -> Self {
        ConnectionEntry {
            bssid: obs.bssid,
            ssid: obs.ssid,
            quality: obs.quality,
            rate: obs.rate,
            in_use: obs.in_use,
            latency_ms: None,
            last_seen: 0,
        }
    }
}

pub struct ConnectionRegistry {
    config: RegistryConfig,
    entries: HashMap<String, ConnectionEntry>,
    target_ssid: Option<String>,
    scan_count: u64,
}

impl ConnectionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        ConnectionRegistry {
            config,
            entries: HashMap::new(),
            target_ssid: None,
            scan_count: 0,
        }
    }

    /// Merge one scan. `measure` is called once for every entry that ends up
    /// in use and its result is smoothed into that entry's latency.
    pub fn refresh<F>(&mut self, observations: Vec<Observation>, mut measure: F)
    where
        F: FnMut() -> f64,
    {
        self.scan_count += 1;
        let scan = self.scan_count;

        for obs in observations {
            if self.target_ssid.is_none() && obs.in_use {
                tracing::info!(ssid = %obs.ssid, "learned roaming ssid");
                self.target_ssid = Some(obs.ssid.clone());
            }

            let (quality, rate, in_use) = (obs.quality, obs.rate, obs.in_use);
            let entry = self
                .entries
                .entry(obs.bssid.clone())
                .and_modify(|e| {
                    e.quality = quality;
                    e.rate = rate;
                    e.in_use = in_use;
                })
                .or_insert_with(|| ConnectionEntry::from(obs));
            entry.last_seen = scan;

            if entry.in_use {
                entry.latency_ms = Some(smooth(entry.latency_ms, measure()));
            }
        }

        self.evict();
    }

    /// The access point currently associated within the roaming SSID.
    pub fn active(&self) -> Result<&ConnectionEntry> {
        self.current()
            .filter(|e| e.in_use)
            .min_by(|a, b| a.bssid.cmp(&b.bssid))
            .ok_or_else(|| RoamError::NoActiveConnection {
                ssid: self.target_ssid.clone(),
            })
    }

    /// Idle access points of the roaming SSID from the latest scan, by BSSID.
    pub fn candidates(&self) -> Vec<&ConnectionEntry> {
        let mut out: Vec<_> = self.current().filter(|e| !e.in_use).collect();
        out.sort_by(|a, b| a.bssid.cmp(&b.bssid));
        out
    }

    pub fn get(&self, bssid: &str) -> Option<&ConnectionEntry> {
        self.entries.get(bssid)
    }

    pub fn target_ssid(&self) -> Option<&str> {
        self.target_ssid.as_deref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of the roaming SSID mentioned by the latest scan.
    fn current(&self) -> impl Iterator<Item = &ConnectionEntry> {
        let target = self.target_ssid.as_deref();
        let scan = self.scan_count;
        self.entries
            .values()
            .filter(move |e| e.last_seen == scan && Some(e.ssid.as_str()) == target)
    }

    fn evict(&mut self) {
        let scan = self.scan_count;
        let stale_after = self.config.stale_after_scans;

        let before = self.entries.len();
        self.entries
            .retain(|_, e| scan.saturating_sub(e.last_seen) < stale_after);
        let stale = before - self.entries.len();

        let mut trimmed = 0usize;
        while self.entries.len() > self.config.max_entries {
            // The live association is never dropped to make room.
            let oldest = self
                .entries
                .values()
                .filter(|e| !(e.in_use && e.last_seen == scan))
                .min_by(|a, b| {
                    a.last_seen
                        .cmp(&b.last_seen)
                        .then_with(|| a.bssid.cmp(&b.bssid))
                })
                .map(|e| e.bssid.clone());
            match oldest {
                Some(bssid) => {
                    self.entries.remove(&bssid);
                    trimmed += 1;
                }
                None => break,
            }
        }

        if stale + trimmed > 0 {
            tracing::debug!(
                stale,
                trimmed,
                remaining = self.entries.len(),
                "evicted access points"
            );
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}
