//! # Latency Prober
//!
//! Measures round-trip latency to the default gateway over the active link.
//! The combined metric is `avg + mdev` from the ping summary, so a jittery
//! link scores worse than a steady one with the same mean. A probe that
//! yields no usable summary records a punitive sentinel instead.

use crate::config::ProbeConfig;
use crate::network::Network;

/// Round-trip statistics from a ping summary line, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttStats {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
    pub mdev_ms: f64,
}

impl RttStats {
    /// Latency metric used for scoring: mean plus mean deviation.
    pub fn combined_ms(&self) -> f64 {
        self.avg_ms + self.mdev_ms
    }
}

/// Extract `min/avg/max/mdev` from iputils `ping` output.
///
/// Only the last non-empty line is inspected, and it must carry exactly four
/// slash-separated values (busybox's three-value summary is rejected).
pub fn parse_ping_summary(output: &str) -> Option<RttStats> {
    let last = output.lines().rev().find(|l| !l.trim().is_empty())?;
    let values = last.split_whitespace().nth(3)?;
    let parsed: Vec<f64> = values
        .split('/')
        .map(|v| v.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match parsed[..] {
        [min_ms, avg_ms, max_ms, mdev_ms] => Some(RttStats {
            min_ms,
            avg_ms,
            max_ms,
            mdev_ms,
        }),
        _ => None,
    }
}

/// Gateway address from `ip route show default` output.
pub fn parse_default_gateway(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        if tokens.next()? != "default" {
            return None;
        }
        tokens
            .skip_while(|t| *t != "via")
            .nth(1)
            .map(str::to_string)
    })
}

/// Single-step smoothing: arithmetic mean of the stored and new value.
///
/// This is not an exponential moving average with a tunable weight; the
/// previous value always counts for exactly half.
pub fn smooth(previous: Option<f64>, sample: f64) -> f64 {
    match previous {
        Some(prev) => (prev + sample) / 2.0,
        None => sample,
    }
}

pub struct LatencyProber {
    config: ProbeConfig,
}

impl LatencyProber {
    pub fn new(config: ProbeConfig) -> Self {
        LatencyProber { config }
    }

    /// Probe the current default gateway. Never fails: anything short of a
    /// parsed summary falls back to [`ProbeConfig::sentinel_ms`].
    pub fn measure<N: Network + ?Sized>(&self, network: &mut N) -> f64 {
        let sentinel = self.config.sentinel_ms();

        let gateway = match network.default_gateway() {
            Ok(Some(gateway)) => gateway,
            Ok(None) => {
                tracing::warn!(sentinel_ms = sentinel, "no default route, using sentinel latency");
                return sentinel;
            }
            Err(e) => {
                tracing::error!(error = %e, "gateway lookup failed, using sentinel latency");
                return sentinel;
            }
        };

        match network.probe(&gateway, self.config.ping_count, self.config.deadline()) {
            Ok(Some(stats)) => {
                let latency = stats.combined_ms();
                tracing::debug!(
                    %gateway,
                    avg_ms = stats.avg_ms,
                    mdev_ms = stats.mdev_ms,
                    latency_ms = latency,
                    "gateway probe"
                );
                latency
            }
            Ok(None) => {
                tracing::warn!(%gateway, sentinel_ms = sentinel, "gateway unreachable, using sentinel latency");
                sentinel
            }
            Err(e) => {
                tracing::error!(%gateway, error = %e, "gateway probe failed, using sentinel latency");
                sentinel
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::testing::FakeNetwork;

    const PING_OK: &str = "\
PING 192.168.1.1 (192.168.1.1) 56(84) bytes of data.
64 bytes from 192.168.1.1: icmp_seq=1 ttl=64 time=2.10 ms

--- 192.168.1.1 ping statistics ---
4 packets transmitted, 4 received, 0% packet loss, time 3004ms
rtt min/avg/max/mdev = 1.812/2.304/3.011/0.450 ms
";

    const PING_LOST: &str = "\
PING 192.168.1.1 (192.168.1.1) 56(84) bytes of data.

--- 192.168.1.1 ping statistics ---
4 packets transmitted, 0 received, 100% packet loss, time 3060ms
";

    // ─── Parsing ────────────────────────────────────────────────────────

    #[test]
    fn parses_iputils_summary() {
        let stats = parse_ping_summary(PING_OK).unwrap();
        assert_eq!(stats.min_ms, 1.812);
        assert_eq!(stats.avg_ms, 2.304);
        assert_eq!(stats.mdev_ms, 0.450);
        assert!((stats.combined_ms() - 2.754).abs() < 1e-9);
    }

    #[test]
    fn total_loss_has_no_summary() {
        assert!(parse_ping_summary(PING_LOST).is_none());
        assert!(parse_ping_summary("").is_none());
    }

    #[test]
    fn busybox_summary_is_rejected() {
        let busybox = "round-trip min/avg/max = 0.1/0.2/0.3 ms";
        assert!(parse_ping_summary(busybox).is_none());
    }

    #[test]
    fn gateway_from_route_table() {
        let routes = "default via 192.168.1.1 dev wlan0 proto dhcp metric 600\n\
                      192.168.1.0/24 dev wlan0 proto kernel scope link src 192.168.1.20\n";
        assert_eq!(parse_default_gateway(routes).as_deref(), Some("192.168.1.1"));
        assert!(parse_default_gateway("192.168.1.0/24 dev wlan0\n").is_none());
        assert!(parse_default_gateway("default dev wg0 scope link\n").is_none());
    }

    // ─── Smoothing ──────────────────────────────────────────────────────

    #[test]
    fn first_sample_is_stored_directly() {
        assert_eq!(smooth(None, 12.0), 12.0);
    }

    #[test]
    fn later_samples_average_with_previous() {
        assert_eq!(smooth(Some(10.0), 20.0), 15.0);
        assert_eq!(smooth(Some(15.0), 20.0), 17.5);
    }

    #[test]
    fn repeated_samples_converge() {
        let mut value = Some(8000.0);
        for _ in 0..40 {
            value = Some(smooth(value, 5.0));
        }
        assert!((value.unwrap() - 5.0).abs() < 1e-6);
    }

    // ─── Measurement ────────────────────────────────────────────────────

    #[test]
    fn measure_uses_avg_plus_mdev() {
        let mut net = FakeNetwork {
            probe_result: Some(RttStats {
                min_ms: 1.0,
                avg_ms: 20.0,
                max_ms: 30.0,
                mdev_ms: 4.0,
            }),
            ..FakeNetwork::default()
        };
        let prober = LatencyProber::new(ProbeConfig::default());
        assert_eq!(prober.measure(&mut net), 24.0);
        assert_eq!(net.probed_gateways, vec!["192.168.1.1".to_string()]);
    }

    #[test]
    fn measure_falls_back_to_sentinel() {
        let prober = LatencyProber::new(ProbeConfig { ping_count: 4 });

        let mut unreachable = FakeNetwork {
            probe_result: None,
            ..FakeNetwork::default()
        };
        assert_eq!(prober.measure(&mut unreachable), 8000.0);

        let mut no_route = FakeNetwork {
            gateway: None,
            ..FakeNetwork::default()
        };
        assert_eq!(prober.measure(&mut no_route), 8000.0);
        assert!(no_route.probed_gateways.is_empty());
    }
}
