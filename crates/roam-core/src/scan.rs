//! # Scan Record Parser
//!
//! Turns `nmcli device wifi list` output into [`Observation`]s.
//!
//! The column layout is not fixed-width, so a line is tokenised on
//! whitespace after prepending a `*` marker: the in-use row already starts
//! with `*` and becomes `**`, every other row becomes a lone `*`. The next
//! two tokens are the BSSID and SSID. Walking the remaining tokens from the
//! end, the first purely numeric token is the signal quality (`SIGNAL`
//! column) and the next one is the bitrate (`RATE` column, followed by its
//! `Mbit/s` unit). Columns in between are ignored.

use std::fmt;

const MARKER: &str = "*";
const IN_USE_MARKER: &str = "**";

/// One access point as reported by a single scan line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub in_use: bool,
    pub bssid: String,
    pub ssid: String,
    pub quality: i32,
    pub rate: u32,
}

/// Parse one scan line. Returns `None` for headers, blank lines and
/// anything else that lacks a BSSID, SSID, rate and quality.
pub fn parse_line(line: &str) -> Option<Observation> {
    let marked = format!("{MARKER}{line}");
    let tokens: Vec<&str> = marked.split_whitespace().collect();
    if tokens.len() < 5 {
        return None;
    }

    let in_use = tokens[0] == IN_USE_MARKER;
    let bssid = tokens[1];
    let ssid = tokens[2];

    let mut numeric = tokens[3..]
        .iter()
        .rev()
        .filter(|token| is_numeric(token));
    let quality = numeric.next()?.parse().ok()?;
    let rate = numeric.next()?.parse().ok()?;

    Some(Observation {
        in_use,
        bssid: bssid.to_string(),
        ssid: ssid.to_string(),
        quality,
        rate,
    })
}

/// Parse a whole scan dump, silently skipping lines that are not records.
pub fn parse_scan_output(output: &str) -> Vec<Observation> {
    output.lines().filter_map(parse_line).collect()
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Observation {
    /// Renders in scan column order so the line parses back to `self`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.in_use { MARKER } else { " " };
        write!(
            f,
            "{marker}  {}  {}  {} Mbit/s  {}",
            self.bssid, self.ssid, self.rate, self.quality
        )
    }
}
